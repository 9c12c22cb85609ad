use lingo_core::{AnswerProvider, Error, HistoryMessage, PreferenceStore, Result};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Answering providers in preference order.
pub struct ProviderSet {
    providers: Vec<Arc<dyn AnswerProvider>>,
    preferences: Arc<dyn PreferenceStore>,
    timeout: Duration,
}

impl ProviderSet {
    /// Provider set consulted in `preferences` order, each call bounded by `timeout`.
    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn AnswerProvider>>,
        preferences: Arc<dyn PreferenceStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            providers,
            preferences,
            timeout,
        }
    }

    /// Configured providers, the preferred one first.
    #[must_use]
    pub fn configured(&self) -> Vec<Arc<dyn AnswerProvider>> {
        let preferred = self.preferences.preferred();
        let mut configured: Vec<Arc<dyn AnswerProvider>> = self
            .providers
            .iter()
            .filter(|provider| provider.is_configured())
            .cloned()
            .collect();
        if let Some(preferred) = preferred {
            if let Some(index) = configured
                .iter()
                .position(|provider| provider.name().eq_ignore_ascii_case(&preferred))
            {
                let provider = configured.remove(index);
                configured.insert(0, provider);
            }
        }
        configured
    }

    /// Whether at least one provider has credentials.
    #[must_use]
    pub fn any_configured(&self) -> bool {
        self.providers.iter().any(|provider| provider.is_configured())
    }

    /// Asks one provider, bounded by the provider timeout.
    ///
    /// # Errors
    /// Returns the provider's error, or a timeout error.
    pub async fn ask(
        &self,
        provider: &dyn AnswerProvider,
        text: &str,
        history: &[HistoryMessage],
    ) -> Result<String> {
        match timeout(self.timeout, provider.ask(text, history)).await {
            Ok(answer) => answer.map(|answer| answer.trim().to_owned()),
            Err(_) => Err(Error::Timeout(
                u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    /// Tries every configured provider in preference order and returns the first
    /// non-empty answer. Failures are skipped; transient ones log as warnings, the
    /// rest (bad credentials, unreadable responses) as errors.
    pub async fn escalate(&self, text: &str, history: &[HistoryMessage]) -> Option<String> {
        for provider in self.configured() {
            match self.ask(provider.as_ref(), text, history).await {
                Ok(answer) if !answer.is_empty() => {
                    tracing::info!("Escalated to '{}'", provider.name());
                    return Some(answer);
                }
                Ok(_) => tracing::debug!("Provider '{}' returned an empty answer", provider.name()),
                Err(error) if error.is_retryable() => {
                    tracing::warn!("Provider '{}' unavailable: {error}", provider.name());
                }
                Err(error) => tracing::error!("Provider '{}' failed: {error}", provider.name()),
            }
        }
        None
    }
}

/// Removes the words addressing a provider ("hỏi chatgpt", "chatgpt ơi") from `text`.
#[must_use]
pub fn strip_trigger(text: &str, triggers: &[String]) -> String {
    let mut remaining = text.to_owned();
    for trigger in triggers {
        let pattern = format!(
            r"(?i)(?:\b(?:hỏi|ask)\s+)?\b{}\b(?:\s+ơi\b)?[\s,:;]*",
            regex::escape(trigger)
        );
        match Regex::new(&pattern) {
            Ok(expression) => remaining = expression.replace_all(&remaining, " ").into_owned(),
            Err(error) => tracing::debug!("Skipping trigger '{trigger}': {error}"),
        }
    }
    remaining.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lingo_core::StaticPreference;
    use lingo_providers::MockProvider;
    use std::time::Instant;

    fn triggers(words: &[&str]) -> Vec<String> {
        words.iter().map(|word| (*word).to_owned()).collect()
    }

    fn provider_set(providers: Vec<Arc<dyn AnswerProvider>>, preferred: Option<&str>) -> ProviderSet {
        ProviderSet::new(
            providers,
            Arc::new(StaticPreference(preferred.map(str::to_owned))),
            Duration::from_millis(200),
        )
    }

    #[test]
    fn test_strip_trigger() {
        let words = triggers(&["chatgpt", "gpt"]);
        assert_eq!(strip_trigger("hỏi chatgpt thủ đô của Pháp", &words), "thủ đô của Pháp");
        assert_eq!(strip_trigger("ChatGPT ơi, thời tiết thế nào?", &words), "thời tiết thế nào?");
        assert_eq!(strip_trigger("chatgpt", &words), "");
    }

    #[test]
    fn test_preferred_provider_first() {
        let chatgpt = MockProvider::new("chatgpt");
        let gemini = MockProvider::new("gemini");
        let set = provider_set(vec![Arc::new(chatgpt), Arc::new(gemini.clone())], Some("gemini"));

        let names: Vec<String> = set.configured().iter().map(|provider| provider.name().to_owned()).collect();
        assert_eq!(names, vec!["gemini", "chatgpt"]);

        gemini.set_configured(false);
        let names: Vec<String> = set.configured().iter().map(|provider| provider.name().to_owned()).collect();
        assert_eq!(names, vec!["chatgpt"]);
    }

    #[tokio::test]
    async fn test_escalate_falls_back_after_failure() {
        let failing = MockProvider::new("chatgpt").with_failure("quota exceeded");
        let working = MockProvider::new("gemini").with_default_response("  Hà Nội  ");
        let set = provider_set(vec![Arc::new(failing.clone()), Arc::new(working.clone())], None);

        let answer = set.escalate("thủ đô Việt Nam", &[]).await;

        assert_eq!(answer.as_deref(), Some("Hà Nội"));
        assert_eq!(failing.call_count(), 1);
        assert_eq!(working.call_count(), 1);
    }

    struct MisconfiguredProvider;

    #[async_trait]
    impl AnswerProvider for MisconfiguredProvider {
        fn name(&self) -> &str {
            "chatgpt"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn ask(&self, _text: &str, _history: &[HistoryMessage]) -> Result<String> {
            Err(Error::MissingApiKey("OPENAI_API_KEY".to_owned()))
        }
    }

    #[tokio::test]
    async fn test_escalate_skips_non_retryable_failure() {
        let working = MockProvider::new("gemini").with_default_response("Paris");
        let set = provider_set(
            vec![Arc::new(MisconfiguredProvider), Arc::new(working.clone())],
            None,
        );

        let error = set
            .ask(&MisconfiguredProvider, "thủ đô của Pháp", &[])
            .await
            .expect_err("missing key");
        assert!(!error.is_retryable());

        assert_eq!(set.escalate("thủ đô của Pháp", &[]).await.as_deref(), Some("Paris"));
        assert_eq!(working.call_count(), 1);
    }

    #[tokio::test]
    async fn test_ask_timeout_is_retryable() {
        let slow = MockProvider::new("chatgpt")
            .with_default_response("late")
            .with_latency(Duration::from_secs(5));
        let set = provider_set(vec![Arc::new(slow.clone())], None);

        let error = set.ask(&slow, "hello", &[]).await.expect_err("times out");

        assert!(matches!(error, Error::Timeout(200)));
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_escalate_times_out_slow_providers() {
        let slow = MockProvider::new("chatgpt")
            .with_default_response("late")
            .with_latency(Duration::from_secs(5));
        let set = provider_set(vec![Arc::new(slow)], None);

        let started = Instant::now();
        assert_eq!(set.escalate("hello", &[]).await, None);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_no_configured_provider() {
        let provider = MockProvider::new("chatgpt").with_default_response("never");
        provider.set_configured(false);
        let set = provider_set(vec![Arc::new(provider.clone())], Some("chatgpt"));

        assert!(!set.any_configured());
        assert_eq!(set.escalate("hello", &[]).await, None);
        assert_eq!(provider.call_count(), 0);
    }
}
