//! Query scenarios: grounded, rejected, lexical gate, deletion, failures.

use super::support::*;
use crate::config::ServiceConfig;
use crate::rag::{Strategy, VerdictKind};
use crate::service::QaService;
use crate::types::{Document, ServiceStatus};
use grounded_core::AppError;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const WEATHER_QUERY: &str = "How's the weather?";
const PROCESSING_QUERY: &str = "When are refunds processed?";
const LOGISTICS_QUERY: &str =
    "Which warehouse shipping carrier tracking customs invoice pallet freight delivery refund?";

async fn with_refund_doc(temp: &TempDir, embedder: StubEmbedder, llm: Arc<StubLlm>) -> QaService {
    let service = service(temp.path(), embedder, llm);
    let report = service
        .ingest(Document::new("refund_policy.pdf", REFUND_TEXT))
        .await
        .unwrap();
    assert_eq!(report.committed, 1);
    service
}

#[tokio::test]
async fn test_refund_question_is_grounded() {
    let temp = TempDir::new().unwrap();
    let llm = StubLlm::replying("Refunds are processed within 30 days of purchase.");
    let service = with_refund_doc(&temp, standard_embedder(), llm.clone()).await;

    let response = service.query(REFUND_QUERY, None, None).await.unwrap();

    assert_eq!(response.verdict, VerdictKind::Grounded);
    assert_eq!(response.strategy, Strategy::RagOnly);
    assert!(response.grounded);
    assert_eq!(response.answer, "Refunds are processed within 30 days of purchase.");
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].source, "refund_policy.pdf");
    assert_eq!(response.sources[0].title, "Refund Policy");
    assert!((response.max_score - 0.82).abs() < 1e-3);

    let request = llm.last_request().unwrap();
    assert!(request.prompt.contains("[Document 1]"));
    assert!(request.prompt.contains(REFUND_TEXT));
}

#[tokio::test]
async fn test_middling_score_gets_hedged_answer() {
    let temp = TempDir::new().unwrap();
    let llm = StubLlm::replying("The documents suggest refunds are processed within 30 days.");
    let embedder =
        standard_embedder().with(PROCESSING_QUERY, at_score(&refund_chunk_vector(), 0.55));
    let service = with_refund_doc(&temp, embedder, llm.clone()).await;

    let response = service.query(PROCESSING_QUERY, None, None).await.unwrap();

    assert_eq!(response.verdict, VerdictKind::Partial);
    assert_eq!(response.strategy, Strategy::Hybrid);
    assert!(response.grounded);
    assert_eq!(
        response.answer,
        "The documents suggest refunds are processed within 30 days."
    );
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].source, "refund_policy.pdf");
    assert!((response.max_score - 0.55).abs() < 1e-3);

    let request = llm.last_request().unwrap();
    let system = request.system.unwrap();
    assert!(system.contains("may not directly answer this question"));
    assert!(request.prompt.contains("Possibly relevant context"));
    assert!(request.prompt.contains(REFUND_TEXT));
}

#[tokio::test]
async fn test_unrelated_question_gets_fallback() {
    let temp = TempDir::new().unwrap();
    let llm = StubLlm::replying("It is sunny today.");
    let embedder = standard_embedder().with(WEATHER_QUERY, at_score(&refund_chunk_vector(), 0.12));
    let service = with_refund_doc(&temp, embedder, llm.clone()).await;

    let response = service.query(WEATHER_QUERY, None, None).await.unwrap();

    assert_eq!(response.verdict, VerdictKind::Rejected);
    assert_eq!(response.strategy, Strategy::BaseModelOnly);
    assert!(!response.grounded);
    assert!(response.sources.is_empty());
    assert_ne!(response.answer, "It is sunny today.");
    assert!(response.answer.contains("How's the weather"));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_high_score_without_shared_terms_is_rejected() {
    let temp = TempDir::new().unwrap();
    let llm = StubLlm::replying("unused");
    let embedder =
        standard_embedder().with(LOGISTICS_QUERY, at_score(&refund_chunk_vector(), 0.5));
    let service = with_refund_doc(&temp, embedder, llm.clone()).await;

    let response = service.query(LOGISTICS_QUERY, None, None).await.unwrap();

    assert_eq!(response.verdict, VerdictKind::Rejected);
    assert!(!response.grounded);
    assert!((response.max_score - 0.5).abs() < 1e-3);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_deletion_keeps_earlier_snapshots_intact() {
    let temp = TempDir::new().unwrap();
    let llm = StubLlm::replying("Refunds take 30 days.");
    let service = with_refund_doc(&temp, standard_embedder(), llm).await;
    service
        .ingest(Document::new("shipping.md", SHIPPING_TEXT))
        .await
        .unwrap();

    let before = service.index().snapshot();
    assert_eq!(service.delete("refund_policy.pdf"), 1);
    assert_eq!(service.delete("refund_policy.pdf"), 0);

    let old = before.search(&refund_axis(), 3).unwrap();
    assert_eq!(old.len(), 2);
    assert_eq!(old.candidates[0].chunk.source, "refund_policy.pdf");

    let response = service.query(REFUND_QUERY, None, None).await.unwrap();
    assert_eq!(response.verdict, VerdictKind::Rejected);
    assert!(response.sources.is_empty());
    assert_eq!(service.sources().len(), 1);
}

#[tokio::test]
async fn test_generation_failure_falls_back() {
    let temp = TempDir::new().unwrap();
    let llm = StubLlm::new(LlmBehavior::Fail);
    let service = with_refund_doc(&temp, standard_embedder(), llm.clone()).await;

    let response = service.query(REFUND_QUERY, None, None).await.unwrap();

    assert_eq!(llm.calls(), 1);
    assert_eq!(response.verdict, VerdictKind::Grounded);
    assert!(!response.grounded);
    assert!(response.sources.is_empty());
    assert!(response.answer.contains("the refund policy"));
}

#[tokio::test]
async fn test_generation_timeout_falls_back() {
    let temp = TempDir::new().unwrap();
    let mut config = ServiceConfig::for_workspace(temp.path());
    config.generate_timeout = Duration::from_millis(50);

    let llm = StubLlm::new(LlmBehavior::Hang(Duration::from_secs(5)));
    let service = service_with(config, standard_embedder(), llm);
    service
        .ingest(Document::new("refund_policy.pdf", REFUND_TEXT))
        .await
        .unwrap();

    let response = service.query(REFUND_QUERY, None, None).await.unwrap();
    assert!(!response.grounded);
    assert!(response.answer.contains("the refund policy"));
}

#[tokio::test]
async fn test_greeting_bypasses_documents() {
    let temp = TempDir::new().unwrap();
    let llm = StubLlm::replying("Hello! What would you like to know?");
    let embedder = standard_embedder().with("Hello!", refund_chunk_vector());
    let service = with_refund_doc(&temp, embedder, llm.clone()).await;

    let response = service.query("Hello!", None, None).await.unwrap();

    assert_eq!(response.strategy, Strategy::BaseModelOnly);
    assert_eq!(response.answer, "Hello! What would you like to know?");
    assert!(!response.grounded);
    assert!(response.sources.is_empty());

    let request = llm.last_request().unwrap();
    assert!(!request.prompt.contains(REFUND_TEXT));
}

#[tokio::test]
async fn test_empty_query_skips_pipeline() {
    let temp = TempDir::new().unwrap();
    let llm = StubLlm::replying("unused");
    let service = with_refund_doc(&temp, standard_embedder(), llm.clone()).await;

    let response = service.query("   ", None, None).await.unwrap();

    assert!(!response.grounded);
    assert!(response.answer.contains("pricing information"));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_threshold_override() {
    let temp = TempDir::new().unwrap();
    let llm = StubLlm::replying("Refunds take 30 days.");
    let service = with_refund_doc(&temp, standard_embedder(), llm).await;

    let strict = service.query(REFUND_QUERY, None, Some(0.9)).await.unwrap();
    assert_eq!(strict.verdict, VerdictKind::Rejected);

    let err = service.query(REFUND_QUERY, None, Some(1.5)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = service.query(REFUND_QUERY, Some(0), None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_empty_index_rejects() {
    let temp = TempDir::new().unwrap();
    let service = service(temp.path(), standard_embedder(), StubLlm::replying("unused"));

    let response = service.query(REFUND_QUERY, None, None).await.unwrap();
    assert_eq!(response.verdict, VerdictKind::Rejected);
    assert!(!response.grounded);
}

#[tokio::test]
async fn test_health_reports_degraded_backends() {
    let temp = TempDir::new().unwrap();

    let healthy = with_refund_doc(&temp, standard_embedder(), StubLlm::replying("ok")).await;
    let status = healthy.health().await;
    assert_eq!(status.status, ServiceStatus::Ok);
    assert_eq!(status.chunks, 1);
    assert_eq!(status.embedding_provider, "stub");
    assert!(status.llm_reachable);

    let down = service(temp.path(), standard_embedder(), StubLlm::unreachable());
    let status = down.health().await;
    assert_eq!(status.status, ServiceStatus::Degraded);
    assert!(!status.llm_reachable);
    assert!(status.detail.unwrap().contains("LLM backend unavailable"));
}

#[tokio::test]
async fn test_concurrent_queries_share_service() {
    let temp = TempDir::new().unwrap();
    let llm = StubLlm::replying("Refunds take 30 days.");
    let service = Arc::new(with_refund_doc(&temp, standard_embedder(), llm).await);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.query(REFUND_QUERY, None, None).await
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.verdict, VerdictKind::Grounded);
        assert!(response.grounded);
    }
}
