use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use lingo_core::{AnswerProvider, AssistantConfig, Error, HistoryMessage, Result};

use crate::SYSTEM_PROMPT;

/// Default API base URL.
const DEFAULT_BASE: &str = "https://api.openai.com";
/// Default model.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Env var key for the API key.
const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// History turns forwarded with each question.
const MAX_HISTORY: usize = 8;

/// Provider implementation for `OpenAI`-compatible chat completion APIs ("chatgpt").
pub struct OpenAiProvider {
    /// HTTP client for API requests.
    client: Client,
    /// API key, absent when the provider is not configured.
    api_key: Option<String>,
    /// Base URL without trailing slash.
    base: String,
    /// Model name to use.
    model: String,
}

impl OpenAiProvider {
    /// Creates a configured provider with the given API key.
    ///
    /// # Errors
    /// Returns an error if the provided API key is empty.
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::MissingApiKey(ENV_OPENAI_API_KEY.to_owned()));
        }

        Ok(Self {
            client: Client::default(),
            api_key: Some(api_key.trim().to_owned()),
            base: DEFAULT_BASE.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
        })
    }

    /// Creates a provider without credentials; it never gets asked.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            client: Client::default(),
            api_key: None,
            base: DEFAULT_BASE.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
        }
    }

    /// Creates a provider from config, falling back to the environment for the key.
    pub fn from_config(config: &AssistantConfig) -> Self {
        let provider = config
            .get_api_key("chatgpt")
            .and_then(|key| Self::new(key).ok())
            .unwrap_or_else(Self::unconfigured);

        let provider = match &config.api_keys.openai_model {
            Some(model) if !model.trim().is_empty() => provider.with_model(model.trim().to_owned()),
            _ => provider,
        };
        match &config.api_keys.openai_base {
            Some(base) if !base.trim().is_empty() => provider.with_base(base),
            _ => provider,
        }
    }

    /// Sets the model to use for generation.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Points the provider at a compatible endpoint.
    #[must_use]
    pub fn with_base(mut self, base: &str) -> Self {
        self.base = base.trim().trim_end_matches('/').to_owned();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base)
    }

    /// Builds chat messages: system prompt, trimmed history, then the question.
    fn build_messages(text: &str, history: &[HistoryMessage]) -> Vec<Value> {
        let mut messages = vec![json!({
            "role": "system",
            "content": SYSTEM_PROMPT
        })];

        let skip = history.len().saturating_sub(MAX_HISTORY);
        messages.extend(history.iter().skip(skip).map(|message| {
            json!({
                "role": message.role.as_str(),
                "content": message.content
            })
        }));

        messages.push(json!({
            "role": "user",
            "content": text
        }));

        messages
    }
}

/// Response payload returned by the chat completions API.
#[derive(Deserialize)]
struct ChatResponse {
    /// List of generated choices.
    choices: Vec<Choice>,
}

/// Individual completion choice.
#[derive(Deserialize)]
struct Choice {
    /// Message payload representing the completion text.
    message: Message,
}

/// Message structure containing generated content.
#[derive(Deserialize)]
struct Message {
    /// Text content produced by the model.
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl AnswerProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "chatgpt"
    }

    fn triggers(&self) -> Vec<String> {
        vec!["chatgpt".to_owned(), "gpt".to_owned()]
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn ask(&self, text: &str, history: &[HistoryMessage]) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::MissingApiKey(ENV_OPENAI_API_KEY.to_owned()))?;

        let request_body = json!({
            "model": self.model,
            "messages": Self::build_messages(text, history),
            "temperature": 0.6,
            "max_tokens": 600,
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|err| Error::Provider(format!("Request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "ChatGPT API request failed with status {status}: {error_text}"
            )));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|err| Error::InvalidResponse(format!("Failed to parse response: {err}")))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .ok_or_else(|| Error::InvalidResponse("No response from ChatGPT".to_owned()))
    }
}
