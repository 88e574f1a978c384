//! Grounded answering: relevance gating, routing and response formatting.
//!
//! The filter and router are pure functions over retrieval results; the
//! formatter owns the only mutable state (the round-robin fallback cursor).

pub mod fallback;
pub mod features;
pub mod formatter;
pub mod relevance;
pub mod router;
pub mod types;

pub use fallback::{extract_topic, FallbackPicker};
pub use features::{ConversationalKind, QueryFeatures};
pub use formatter::ResponseFormatter;
pub use relevance::{filter, RelevanceConfig};
pub use router::route;
pub use types::{
    CandidateAssessment, FormattedResponse, RelevanceVerdict, RouteReason, RoutingDecision,
    SourceRef, Strategy, VerdictKind, VerdictReason,
};
