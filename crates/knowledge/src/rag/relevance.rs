//! Relevance filter: decides whether retrieved context can be trusted.
//!
//! A candidate passes only when both its vector similarity and its lexical
//! overlap with the query clear their thresholds. Vector similarity alone
//! can drift to chunks that share no vocabulary with the question.

use super::types::{CandidateAssessment, RelevanceVerdict, VerdictKind, VerdictReason};
use crate::text::{term_overlap_ratio, term_set};
use crate::types::RetrievalResult;
use grounded_core::{AppError, AppResult, RagSettings};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceConfig {
    pub score_threshold: f32,
    pub term_ratio_threshold: f32,

    /// Best passing score must be strictly above this for `Grounded`
    pub confident_score_cutoff: f32,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.45,
            term_ratio_threshold: 0.35,
            confident_score_cutoff: 0.65,
        }
    }
}

impl RelevanceConfig {
    pub fn from_settings(settings: &RagSettings) -> Self {
        Self {
            score_threshold: settings.score_threshold,
            term_ratio_threshold: settings.term_ratio_threshold,
            confident_score_cutoff: settings.confident_score_cutoff,
        }
    }

    /// Copy with a per-query score threshold.
    pub fn with_score_threshold(mut self, threshold: f32) -> AppResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AppError::InvalidInput(format!(
                "score_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        self.score_threshold = threshold;
        Ok(self)
    }
}

/// Classify `retrieval` for `query`.
///
/// Always resolves to one of the three verdicts. The passing subset keeps
/// the retrieval order.
pub fn filter(retrieval: &RetrievalResult, query: &str, config: &RelevanceConfig) -> RelevanceVerdict {
    if retrieval.is_empty() {
        return RelevanceVerdict {
            kind: VerdictKind::Rejected,
            passing: Vec::new(),
            reason: VerdictReason::NoCandidates,
            assessments: Vec::new(),
            candidates: Vec::new(),
        };
    }

    let query_terms = term_set(query);
    let mut passing = Vec::new();
    let mut assessments = Vec::with_capacity(retrieval.len());

    for candidate in &retrieval.candidates {
        let ratio = term_overlap_ratio(&query_terms, &term_set(&candidate.chunk.text));
        let passed =
            candidate.score >= config.score_threshold && ratio >= config.term_ratio_threshold;

        tracing::debug!(
            "Candidate {} from '{}': score {:.3}, term overlap {:.2}, passed: {}",
            candidate.rank,
            candidate.chunk.source,
            candidate.score,
            ratio,
            passed
        );

        assessments.push(CandidateAssessment {
            chunk_id: candidate.chunk.id.clone(),
            score: candidate.score,
            term_overlap_ratio: ratio,
            passed,
        });

        if passed {
            passing.push(candidate.clone());
        }
    }

    let best_passing = passing.iter().map(|c| c.score).reduce(f32::max);

    let (kind, reason) = match best_passing {
        None => (VerdictKind::Rejected, VerdictReason::BelowThreshold),
        Some(best) if best > config.confident_score_cutoff => {
            (VerdictKind::Grounded, VerdictReason::ConfidentMatch)
        }
        Some(_) => (VerdictKind::Partial, VerdictReason::BelowConfidentCutoff),
    };

    RelevanceVerdict {
        kind,
        passing,
        reason,
        assessments,
        candidates: retrieval.candidates.clone(),
    }
}
