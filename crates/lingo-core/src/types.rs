use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the person using the assistant
    User,
    /// Text produced by a handler or provider
    Assistant,
}

impl Role {
    /// Wire name used by chat-completion style APIs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A single remembered conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke
    pub role: Role,
    /// What was said
    pub content: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Local>,
}

impl Turn {
    /// Creates a turn stamped with the current local time.
    pub fn new<T: Into<String>>(role: Role, content: T) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    /// Drops the timestamp, keeping the provider-facing shape.
    #[must_use]
    pub fn to_message(&self) -> HistoryMessage {
        HistoryMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Role/content pair handed to providers and context-aware handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Who spoke
    pub role: Role,
    /// What was said
    pub content: String,
}

impl HistoryMessage {
    /// Message with the given role and content.
    pub fn new<T: Into<String>>(role: Role, content: T) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Everything a handler receives for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Parameter extracted by the matcher (often the raw input)
    pub parameter: String,
    /// Recent conversation, only populated for context-aware handlers
    pub history: Vec<HistoryMessage>,
}

impl Invocation {
    /// Invocation without history.
    pub fn new<T: Into<String>>(parameter: T) -> Self {
        Self {
            parameter: parameter.into(),
            history: Vec::new(),
        }
    }

    /// Attaches recent conversation.
    #[must_use]
    pub fn with_history(mut self, history: Vec<HistoryMessage>) -> Self {
        self.history = history;
        self
    }
}
