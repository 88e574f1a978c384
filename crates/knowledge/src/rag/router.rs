//! Query router: maps a relevance verdict to an answering strategy.

use super::features::QueryFeatures;
use super::types::{RelevanceVerdict, RouteReason, RoutingDecision, Strategy, VerdictKind};

/// Pick the strategy for `query`.
///
/// Pure: identical inputs always produce identical decisions.
pub fn route(query: &str, verdict: &RelevanceVerdict, features: &QueryFeatures) -> RoutingDecision {
    let decision = |strategy: Strategy, reason: RouteReason| {
        let context = match strategy {
            Strategy::BaseModelOnly => Vec::new(),
            Strategy::RagOnly | Strategy::Hybrid => verdict.passing.clone(),
        };
        RoutingDecision {
            query: query.to_string(),
            strategy,
            context,
            verdict: verdict.clone(),
            reason,
        }
    };

    if features.is_conversational() {
        return decision(Strategy::BaseModelOnly, RouteReason::Conversational);
    }

    match verdict.kind {
        VerdictKind::Rejected => decision(Strategy::BaseModelOnly, RouteReason::Verdict),
        _ if verdict.passing.is_empty() => {
            decision(Strategy::BaseModelOnly, RouteReason::EmptyContext)
        }
        VerdictKind::Grounded => decision(Strategy::RagOnly, RouteReason::Verdict),
        VerdictKind::Partial => decision(Strategy::Hybrid, RouteReason::Verdict),
    }
}
