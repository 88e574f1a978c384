//! The question answering service: ingestion, querying and index upkeep.
//!
//! A query runs as a linear pipeline:
//! retrieve → filter → route → generate → format.
//! Only retrieval failures and invalid overrides surface as errors; any
//! generation problem is answered with a fallback.

use crate::chunk::ChunkPipeline;
use crate::config::ServiceConfig;
use crate::embeddings::{create_provider, Embedder, EmbeddingProvider};
use crate::index::IndexManager;
use crate::rag::{
    filter, route, FormattedResponse, QueryFeatures, ResponseFormatter, RoutingDecision, Strategy,
};
use crate::retriever::Retriever;
use crate::types::{
    ChunkFailure, Document, EmbeddedChunk, HealthStatus, IngestionReport, RetrievedChunk,
    ServiceStatus, SourceInfo,
};
use grounded_core::{AppConfig, AppError, AppResult};
use grounded_llm::{create_client_from_config, LlmClient, LlmRequest};
use grounded_prompt::{
    build_prompt, resolve_prompt, PromptDefinition, BASE_PROMPT_ID, GROUNDED_PROMPT_ID,
    HYBRID_PROMPT_ID,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;

const GENERATION_MAX_TOKENS: u32 = 1000;

/// One prompt definition per answering strategy.
#[derive(Debug, Clone)]
struct StrategyPrompts {
    grounded: PromptDefinition,
    hybrid: PromptDefinition,
    base: PromptDefinition,
}

impl StrategyPrompts {
    fn resolve(config: &ServiceConfig) -> AppResult<Self> {
        let workspace = Some(config.workspace.as_path());
        Ok(Self {
            grounded: resolve_prompt(workspace, GROUNDED_PROMPT_ID)?,
            hybrid: resolve_prompt(workspace, HYBRID_PROMPT_ID)?,
            base: resolve_prompt(workspace, BASE_PROMPT_ID)?,
        })
    }

    fn for_strategy(&self, strategy: Strategy) -> &PromptDefinition {
        match strategy {
            Strategy::RagOnly => &self.grounded,
            Strategy::Hybrid => &self.hybrid,
            Strategy::BaseModelOnly => &self.base,
        }
    }
}

/// Grounded question answering over an in-memory vector index.
///
/// `Send + Sync`; share it through an `Arc` to serve concurrent queries.
pub struct QaService {
    config: ServiceConfig,
    index: Arc<IndexManager>,
    retriever: Retriever,
    chunker: ChunkPipeline,
    embedder: Embedder,
    llm: Arc<dyn LlmClient>,
    prompts: StrategyPrompts,
    formatter: ResponseFormatter,
}

impl QaService {
    /// Assemble the service from explicit backends.
    pub fn new(
        config: ServiceConfig,
        embedding: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
    ) -> AppResult<Self> {
        let chunker = ChunkPipeline::new(config.chunk.clone())?;
        let formatter = ResponseFormatter::from_settings(&config.rag)?;
        let prompts = StrategyPrompts::resolve(&config)?;

        let embedder = Embedder::new(embedding, config.embed_timeout);
        let index = Arc::new(IndexManager::new(embedder.identity()));
        let retriever = Retriever::new(embedder.clone(), index.clone(), config.top_k);

        tracing::debug!(
            "QaService ready (embedder: {}, llm: {}, top_k: {})",
            embedder.identity(),
            llm.provider_name(),
            config.top_k
        );

        Ok(Self {
            config,
            index,
            retriever,
            chunker,
            embedder,
            llm,
            prompts,
            formatter,
        })
    }

    /// Build the service with the backends named in `app`.
    pub fn from_app_config(app: &AppConfig) -> AppResult<Self> {
        let config = ServiceConfig::from_app_config(app)?;
        let embedding = create_provider(&config.embedding)?;
        let llm = create_client_from_config(app)?;
        Self::new(config, embedding, llm)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<IndexManager> {
        &self.index
    }

    /// Chunk, embed and index `document`.
    ///
    /// Every chunk is embedded before anything is committed; the surviving
    /// chunks then replace the previous version of the source in a single
    /// snapshot swap.
    pub async fn ingest(&self, document: Document) -> AppResult<IngestionReport> {
        let source_id = document.source_id.trim().to_string();
        if source_id.is_empty() {
            return Err(AppError::InvalidInput(
                "Document source_id must not be empty".to_string(),
            ));
        }

        let output = self
            .chunker
            .chunk_with_metadata(&document.text, &source_id, document.metadata);

        let mut report = IngestionReport {
            source_id: source_id.clone(),
            chunks_created: output.chunks.len(),
            dropped_short: output.dropped_short,
            ..IngestionReport::default()
        };

        if output.chunks.is_empty() {
            tracing::warn!("Document '{}' produced no chunks; index unchanged", source_id);
            return Ok(report);
        }

        let mut embedded = Vec::with_capacity(output.chunks.len());
        for chunk in output.chunks {
            match self.embedder.embed(&chunk.text).await {
                Ok(embedding) => embedded.push(EmbeddedChunk { chunk, embedding }),
                Err(e) => {
                    tracing::warn!(
                        "Failed to embed chunk {} of '{}': {}",
                        chunk.position,
                        source_id,
                        e
                    );
                    report.failures.push(ChunkFailure {
                        chunk_id: chunk.id,
                        position: chunk.position,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if embedded.is_empty() {
            tracing::warn!(
                "No chunk of '{}' could be embedded; keeping the previous version",
                source_id
            );
            return Ok(report);
        }

        let (outcome, replaced) = self.index.replace_source(&source_id, embedded);
        report.committed = outcome.committed;
        report.replaced = replaced;
        report.failures.extend(outcome.failures);

        tracing::info!(
            "Ingested '{}': {} chunks committed, {} dropped as too short, {} failed",
            source_id,
            report.committed,
            report.dropped_short,
            report.failures.len()
        );

        Ok(report)
    }

    /// Answer `text`, optionally overriding `top_k` and the score threshold.
    pub async fn query(
        &self,
        text: &str,
        top_k: Option<usize>,
        score_threshold: Option<f32>,
    ) -> AppResult<FormattedResponse> {
        let span = tracing::info_span!(
            "query",
            query_id = %uuid::Uuid::new_v4(),
            verdict = tracing::field::Empty,
            strategy = tracing::field::Empty,
            best_score = tracing::field::Empty
        );

        self.run_query(text, top_k, score_threshold, &span)
            .instrument(span.clone())
            .await
    }

    async fn run_query(
        &self,
        text: &str,
        top_k: Option<usize>,
        score_threshold: Option<f32>,
        span: &tracing::Span,
    ) -> AppResult<FormattedResponse> {
        if text.trim().is_empty() {
            tracing::debug!("Empty query; answering with suggestions");
            return Ok(self.formatter.empty_query_response());
        }

        let relevance = match score_threshold {
            Some(threshold) => self.config.relevance.with_score_threshold(threshold)?,
            None => self.config.relevance,
        };
        if top_k == Some(0) {
            return Err(AppError::InvalidInput("top_k must be at least 1".to_string()));
        }

        let retrieval = self.retriever.retrieve(text, top_k).await?;
        let verdict = filter(&retrieval, text, &relevance);
        let features = QueryFeatures::detect(text);
        let decision = route(text, &verdict, &features);

        span.record("verdict", tracing::field::debug(decision.verdict.kind));
        span.record("strategy", tracing::field::debug(decision.strategy));
        span.record(
            "best_score",
            decision.verdict.best_candidate_score().unwrap_or(0.0) as f64,
        );

        let generated = if decision.requires_fallback() {
            None
        } else {
            match self.generate(&decision).await {
                Ok(content) => Some(content),
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Generation failed, answering with a fallback: {}", e);
                    None
                }
                Err(e) => return Err(e),
            }
        };

        let response = self.formatter.format(&decision, generated.as_deref());

        tracing::info!(
            "Answered with {:?} ({:?}), grounded: {}, sources: {}",
            response.strategy,
            response.verdict,
            response.grounded,
            response.sources.len()
        );

        Ok(response)
    }

    async fn generate(&self, decision: &RoutingDecision) -> AppResult<String> {
        let definition = self.prompts.for_strategy(decision.strategy);

        let mut variables = HashMap::new();
        variables.insert("query".to_string(), decision.query.clone());
        variables.insert("context".to_string(), build_context(&decision.context));
        let built = build_prompt(definition, variables)?;

        let temperature = match decision.strategy {
            Strategy::RagOnly | Strategy::Hybrid => 0.3,
            Strategy::BaseModelOnly => 0.7,
        };
        let mut request = LlmRequest::new(built.user, self.config.llm_model.clone())
            .with_temperature(temperature)
            .with_max_tokens(GENERATION_MAX_TOKENS);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        tracing::debug!(
            "Generating with prompt '{}' via {}",
            definition.id,
            self.llm.provider_name()
        );

        let timeout = self.config.generate_timeout;
        let response = tokio::time::timeout(timeout, self.llm.complete(&request))
            .await
            .map_err(|_| AppError::timeout("generation", timeout.as_secs()))??;

        Ok(response.content)
    }

    /// Remove a source; returns the number of chunks removed.
    pub fn delete(&self, source_id: &str) -> usize {
        self.index.remove(source_id)
    }

    pub fn sources(&self) -> Vec<SourceInfo> {
        self.index.sources()
    }

    pub async fn health(&self) -> HealthStatus {
        let stats = self.index.stats();
        let identity = self.embedder.identity();

        let llm_error = self.llm.health_check().await.err();
        let detail = match (&llm_error, stats.chunks) {
            (Some(e), _) => Some(format!("LLM backend unavailable: {}", e)),
            (None, 0) => Some("index is empty".to_string()),
            (None, _) => None,
        };

        HealthStatus {
            status: if detail.is_none() {
                ServiceStatus::Ok
            } else {
                ServiceStatus::Degraded
            },
            chunks: stats.chunks,
            sources: stats.sources,
            dimensions: stats.dimensions,
            embedding_provider: identity.provider,
            embedding_model: identity.model,
            llm_provider: self.llm.provider_name().to_string(),
            llm_reachable: llm_error.is_none(),
            detail,
        }
    }

    /// Write the index snapshot to the configured path.
    pub fn persist(&self) -> AppResult<()> {
        self.index.persist(&self.config.index_path)
    }

    /// Load the snapshot at the configured path; `false` if none exists.
    pub fn load(&self) -> AppResult<bool> {
        if !self.config.index_path.exists() {
            tracing::debug!("No snapshot at {:?}", self.config.index_path);
            return Ok(false);
        }
        self.index.load(&self.config.index_path)?;
        Ok(true)
    }
}

/// Numbered document blocks for the prompt `context` variable.
fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, candidate)| format!("[Document {}]\n{}", i + 1, candidate.chunk.content()))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
