use async_trait::async_trait;

use crate::{HistoryMessage, Invocation, Result, Role};

/// A registered unit that answers one class of input.
///
/// Handlers are plain blocking code; the dispatcher runs them on its worker pool.
pub trait Handler: Send + Sync {
    /// Answers one request.
    ///
    /// # Errors
    ///
    /// Returns an error when the handler cannot produce an answer; the dispatcher turns
    /// it into a user-visible message.
    fn handle(&self, invocation: &Invocation) -> Result<String>;

    /// Words that select this handler when they appear verbatim in the input.
    fn keywords(&self) -> Vec<String> {
        Vec::new()
    }

    /// Example phrases used for similarity scoring and suggestions.
    fn patterns(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Constructs a handler on the loader thread.
pub trait HandlerFactory: Send + Sync {
    /// Unique identifier, also the registry key and the tier classification key.
    fn name(&self) -> &str;

    /// Initializes the handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot be initialized; the loader logs it and
    /// carries on without that handler.
    fn load(&self) -> Result<Box<dyn Handler>>;
}

/// External answering service used for escalation.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Stable identifier ("chatgpt", "gemini", ...), matched against the preferred provider.
    fn name(&self) -> &str;

    /// Lower-case words that explicitly address this provider in user input.
    fn triggers(&self) -> Vec<String> {
        vec![self.name().to_owned()]
    }

    /// Whether credentials are present so that `ask` can be attempted.
    fn is_configured(&self) -> bool;

    /// Answers free-form text given recent conversation history.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    async fn ask(&self, text: &str, history: &[HistoryMessage]) -> Result<String>;
}

/// Advisory conversation log shared by all concurrent requests.
pub trait ConversationMemory: Send + Sync {
    /// Appends a turn; implementations may silently drop it.
    fn add_turn(&self, role: Role, content: &str);

    /// The `count` most recent turns, oldest first.
    fn recent_history(&self, count: usize) -> Vec<HistoryMessage>;
}

/// Source of the persisted "preferred provider" setting.
pub trait PreferenceStore: Send + Sync {
    /// Name of the provider to try first, if one has been chosen.
    fn preferred(&self) -> Option<String>;
}
