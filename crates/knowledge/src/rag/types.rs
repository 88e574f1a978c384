//! RAG decision and response types.

use crate::types::RetrievedChunk;
use serde::{Deserialize, Serialize};

/// How trustworthy the retrieved context is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictKind {
    /// Confident match; answer from the documents
    Grounded,
    /// Usable but weak; answer with explicit hedging
    Partial,
    /// Nothing usable; do not cite documents
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictReason {
    ConfidentMatch,
    BelowConfidentCutoff,
    NoCandidates,
    BelowThreshold,
}

/// Both relevance signals for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAssessment {
    pub chunk_id: String,
    pub score: f32,
    pub term_overlap_ratio: f32,
    pub passed: bool,
}

/// Outcome of the relevance filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    pub kind: VerdictKind,

    /// Candidates that passed both checks, in retrieval order
    pub passing: Vec<RetrievedChunk>,

    pub reason: VerdictReason,

    /// One entry per retrieved candidate
    pub assessments: Vec<CandidateAssessment>,

    /// Full retrieval set; diagnostics only, never used as context
    #[serde(skip_serializing, default)]
    pub candidates: Vec<RetrievedChunk>,
}

impl RelevanceVerdict {
    pub fn best_passing_score(&self) -> Option<f32> {
        self.passing.iter().map(|c| c.score).reduce(f32::max)
    }

    pub fn best_candidate_score(&self) -> Option<f32> {
        self.candidates.iter().map(|c| c.score).reduce(f32::max)
    }
}

/// Answering strategy picked by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    RagOnly,
    Hybrid,
    BaseModelOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    /// Strategy follows directly from the verdict
    Verdict,
    /// Small talk or a question about the assistant
    Conversational,
    /// Verdict allowed context but none survived filtering
    EmptyContext,
}

/// Output of the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub query: String,
    pub strategy: Strategy,

    /// Chunks to hand to the generator; empty for `BaseModelOnly`
    pub context: Vec<RetrievedChunk>,

    pub verdict: RelevanceVerdict,
    pub reason: RouteReason,
}

impl RoutingDecision {
    /// Whether the formatter must replace any model output with a fallback.
    pub fn requires_fallback(&self) -> bool {
        self.strategy == Strategy::BaseModelOnly
            && self.verdict.kind == VerdictKind::Rejected
            && self.reason != RouteReason::Conversational
    }
}

/// A single source reference used to answer a query.
///
/// Internal details like chunk ids, scores and byte offsets are hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Short excerpt of the supporting text
    pub excerpt: String,

    /// Source identifier as ingested
    pub source: String,

    /// Display title derived from the file name
    pub title: String,

    /// "page 2", "lines 12-34" or "chunk 3"
    pub locator: String,
}

/// Final answer returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub grounded: bool,
    pub strategy: Strategy,
    pub verdict: VerdictKind,

    /// Internal: highest retrieval score, for logging
    #[serde(skip_serializing, default)]
    pub max_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_value(VerdictKind::Grounded).unwrap(), "GROUNDED");
        assert_eq!(serde_json::to_value(Strategy::BaseModelOnly).unwrap(), "BASE_MODEL_ONLY");
        assert_eq!(serde_json::to_value(VerdictReason::NoCandidates).unwrap(), "NO_CANDIDATES");
    }

    #[test]
    fn test_response_hides_max_score() {
        let response = FormattedResponse {
            answer: "Refunds are processed within 30 days.".to_string(),
            sources: Vec::new(),
            grounded: true,
            strategy: Strategy::RagOnly,
            verdict: VerdictKind::Grounded,
            max_score: 0.82,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("max_score").is_none());
        assert_eq!(json["strategy"], "RAG_ONLY");
    }
}
