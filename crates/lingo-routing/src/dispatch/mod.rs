//! Per-request dispatch: taught replies, handler execution, quality gating and
//! escalation to answering providers.

/// Provider ordering, timeouts and trigger stripping.
pub mod escalation;
/// The request pipeline.
pub mod pipeline;
/// Low-information answer detection.
pub mod quality;
/// Literal taught replies.
pub mod taught;

pub use escalation::{ProviderSet, strip_trigger};
pub use pipeline::{
    DispatchPipeline, DispatchTask, ERROR_PREFIX, GENERIC_UNMATCHED, SUGGESTION_HEADER,
};
pub use quality::QualityGate;
pub use taught::TaughtPatterns;
