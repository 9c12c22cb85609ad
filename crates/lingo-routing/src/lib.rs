//! Natural-language command dispatch for the Lingo assistant.
//!
//! Input text is matched against a registry of handlers that keeps growing while a
//! background thread loads them tier by tier. Each request runs on a fixed worker
//! pool, and answers that carry no information can be escalated to an external
//! answering provider.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

/// The per-request pipeline and escalation.
pub mod dispatch;
/// The public dispatcher.
pub mod engine;
/// Input classification.
pub mod matcher;
/// Handler registry, intrinsic handlers and the loader.
pub mod registry;
/// Similarity scores.
pub mod similarity;
/// Tokenization and normalization.
pub mod text;

pub use dispatch::{
    DispatchPipeline, DispatchTask, ERROR_PREFIX, GENERIC_UNMATCHED, ProviderSet, QualityGate,
    SUGGESTION_HEADER, TaughtPatterns, strip_trigger,
};
pub use engine::{DispatchEngine, EngineBuilder, TIMEOUT_REPLY};
pub use matcher::{MatchCache, MatchOutcome, MatchTarget, MatchTier, Matcher};
pub use registry::{
    APPLICATION_HANDLER, AppLauncher, HELP_HANDLER, HandlerDescriptor, HandlerLoader,
    LoadReport, LoadState, LoadTier, Registry, RegistrySnapshot, SystemLauncher, TIME_HANDLER,
    TierTable,
};
