//! Stub embedding and generation backends.

use crate::config::ServiceConfig;
use crate::embeddings::EmbeddingProvider;
use crate::service::QaService;
use grounded_core::{AppError, AppResult};
use grounded_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DIMENSIONS: usize = 3;

pub const REFUND_QUERY: &str = "What is the refund policy?";
pub const REFUND_TEXT: &str =
    "Refunds are processed within 30 days of purchase for all eligible orders.";
pub const SHIPPING_TEXT: &str =
    "Standard shipping takes five business days; express delivery ships overnight.";

/// Unit vector sharing the refund axis.
pub fn refund_axis() -> Vec<f32> {
    vec![1.0, 0.0, 0.0]
}

/// Unit vector whose cosine with `base` is `score`; `base` must lie in the
/// first two dimensions.
pub fn at_score(base: &[f32], score: f32) -> Vec<f32> {
    let rest = (1.0 - score * score).max(0.0).sqrt();
    vec![base[0] * score, base[1] * score, rest]
}

/// Refund chunk vector: cosine 0.82 with the refund query.
pub fn refund_chunk_vector() -> Vec<f32> {
    let y = (1.0f32 - 0.82 * 0.82).sqrt();
    vec![0.82, y, 0.0]
}

/// Embeds by exact (trimmed) text lookup; unknown text maps to the third axis.
#[derive(Debug, Default)]
pub struct StubEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    failing: HashSet<String>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.trim().to_string(), vector);
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.trim().to_string());
        self
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn provider_name(&self) -> &str {
        "stub"
    }

    fn model_name(&self) -> &str {
        "lookup-v1"
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| {
                let key = text.trim();
                if self.failing.contains(key) {
                    return Err(AppError::Embedding(format!("stub refuses '{}'", key)));
                }
                Ok(self
                    .vectors
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| vec![0.0, 0.0, 1.0]))
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum LlmBehavior {
    Reply(String),
    Fail,
    Hang(Duration),
}

/// Records every request and answers according to its behavior.
pub struct StubLlm {
    behavior: LlmBehavior,
    healthy: bool,
    requests: Mutex<Vec<LlmRequest>>,
}

impl StubLlm {
    pub fn new(behavior: LlmBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            healthy: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            behavior: LlmBehavior::Fail,
            healthy: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(LlmBehavior::Reply(text.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait::async_trait]
impl LlmClient for StubLlm {
    fn provider_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().push(request.clone());

        match &self.behavior {
            LlmBehavior::Reply(text) => Ok(LlmResponse {
                content: text.clone(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            }),
            LlmBehavior::Fail => Err(AppError::Generation("stub backend down".to_string())),
            LlmBehavior::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Err(AppError::Generation("stub woke up too late".to_string()))
            }
        }
    }

    async fn health_check(&self) -> AppResult<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(AppError::Generation("stub is unreachable".to_string()))
        }
    }
}

/// Embedder knowing the refund and shipping documents and the refund query.
pub fn standard_embedder() -> StubEmbedder {
    StubEmbedder::new()
        .with(REFUND_TEXT, refund_chunk_vector())
        .with(SHIPPING_TEXT, vec![0.0, 0.0, 1.0])
        .with(REFUND_QUERY, refund_axis())
}

pub fn service(workspace: &Path, embedder: StubEmbedder, llm: Arc<StubLlm>) -> QaService {
    service_with(ServiceConfig::for_workspace(workspace), embedder, llm)
}

pub fn service_with(config: ServiceConfig, embedder: StubEmbedder, llm: Arc<StubLlm>) -> QaService {
    QaService::new(config, Arc::new(embedder), llm).unwrap()
}
