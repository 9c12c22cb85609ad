//! Mock provider for testing escalation.
//!
//! Allows defining canned answers for specific questions, enabling end-to-end
//! dispatch tests without real API calls.

use async_trait::async_trait;
use lingo_core::{AnswerProvider, Error, HistoryMessage, IgnoreLock as _, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Response storage type, checked in insertion order
type ResponseList = Arc<Mutex<Vec<(String, String)>>>;

/// A recorded call to [`MockProvider::ask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Question text
    pub text: String,
    /// Number of history messages supplied
    pub history_len: usize,
}

/// Mock provider that returns pre-defined answers based on question patterns.
#[derive(Clone)]
pub struct MockProvider {
    /// Name of this mock provider
    name: String,
    /// Words that address this provider explicitly
    triggers: Vec<String>,
    /// Whether the provider reports itself as configured
    configured: Arc<AtomicBool>,
    /// Predefined answers keyed by question substring
    responses: ResponseList,
    /// Default answer if no pattern matches
    default_response: Arc<Mutex<Option<String>>>,
    /// Error message returned instead of answering
    failure: Arc<Mutex<Option<String>>>,
    /// Artificial latency before answering
    latency: Option<Duration>,
    /// Call history for verification
    call_history: Arc<Mutex<Vec<MockCall>>>,
}

impl MockProvider {
    /// Create a configured mock provider with a given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            triggers: vec![name.to_lowercase()],
            name,
            configured: Arc::new(AtomicBool::new(true)),
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: Arc::new(Mutex::new(None)),
            failure: Arc::new(Mutex::new(None)),
            latency: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a pattern-based answer.
    #[must_use]
    pub fn with_response(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .lock_ignore_poison()
            .push((pattern.into(), response.into()));
        self
    }

    /// Set a default answer for questions that don't match any pattern.
    #[must_use]
    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        *self.default_response.lock_ignore_poison() = Some(response.into());
        self
    }

    /// Replace the trigger words.
    #[must_use]
    pub fn with_triggers(mut self, triggers: &[&str]) -> Self {
        self.triggers = triggers.iter().map(|word| word.to_lowercase()).collect();
        self
    }

    /// Fail every call with a provider error.
    #[must_use]
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        *self.failure.lock_ignore_poison() = Some(message.into());
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Toggle whether the provider reports credentials.
    pub fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::SeqCst);
    }

    /// Get the call history.
    #[must_use]
    pub fn get_call_history(&self) -> Vec<MockCall> {
        self.call_history.lock_ignore_poison().clone()
    }

    /// Get the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_history.lock_ignore_poison().len()
    }

    /// Find a matching answer: exact match first, then substring.
    fn find_response(&self, text: &str) -> Option<String> {
        let responses = self.responses.lock_ignore_poison();
        responses
            .iter()
            .find(|(pattern, _)| pattern == text)
            .or_else(|| responses.iter().find(|(pattern, _)| text.contains(pattern.as_str())))
            .map(|(_, response)| response.clone())
    }
}

#[async_trait]
impl AnswerProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn triggers(&self) -> Vec<String> {
        self.triggers.clone()
    }

    fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    async fn ask(&self, text: &str, history: &[HistoryMessage]) -> Result<String> {
        self.call_history.lock_ignore_poison().push(MockCall {
            text: text.to_owned(),
            history_len: history.len(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self.failure.lock_ignore_poison().clone();
        if let Some(message) = failure {
            return Err(Error::Provider(message));
        }

        if let Some(response) = self.find_response(text) {
            return Ok(response);
        }

        let default = self.default_response.lock_ignore_poison().clone();
        default.ok_or_else(|| Error::Provider(format!("No mock response for: {text}")))
    }
}
