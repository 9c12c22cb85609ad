//! Core types and traits for the Lingo assistant.
//!
//! This crate provides the error type, the collaborator traits the dispatcher is built
//! against (handlers, answering providers, conversation memory, preferences), and the
//! configuration shared by every other crate.
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

/// Configuration loading and defaults.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// In-process conversation memory.
pub mod memory;
/// Persisted preferred-provider setting.
pub mod preferences;
/// Poison-tolerant lock helpers.
pub mod sync;
/// Trait definitions for handlers and collaborators.
pub mod traits;
/// Conversation and invocation data types.
pub mod types;

pub use config::{
    ApiKeys, AssistantConfig, DispatchConfig, DomainRule, EscalationConfig, LoaderConfig,
    MatchingConfig, PhraseRule, TaughtPattern,
};
pub use error::{Error, Result};
pub use memory::InMemoryConversation;
pub use preferences::{FilePreferences, StaticPreference};
pub use sync::{IgnoreLock, IgnoreRwLock};
pub use traits::{AnswerProvider, ConversationMemory, Handler, HandlerFactory, PreferenceStore};
pub use types::{HistoryMessage, Invocation, Role, Turn};
