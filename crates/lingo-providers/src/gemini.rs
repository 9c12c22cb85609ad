use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use lingo_core::{AnswerProvider, AssistantConfig, Error, HistoryMessage, Result, Role};

use crate::SYSTEM_PROMPT;

/// Gemini REST endpoint prefix.
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Default model for Gemini.
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
/// Env var key for the Gemini API key.
const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Provider implementation for the Google Gemini `generateContent` API.
pub struct GeminiProvider {
    /// HTTP client for API requests.
    client: Client,
    /// API key, absent when the provider is not configured.
    api_key: Option<String>,
    /// Model name to use.
    model: String,
}

impl GeminiProvider {
    /// Creates a configured provider with the given API key.
    ///
    /// # Errors
    /// Returns an error if the provided API key is empty.
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::MissingApiKey(ENV_GEMINI_API_KEY.to_owned()));
        }

        Ok(Self {
            client: Client::default(),
            api_key: Some(api_key.trim().to_owned()),
            model: DEFAULT_MODEL.to_owned(),
        })
    }

    /// Creates a provider without credentials.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            client: Client::default(),
            api_key: None,
            model: DEFAULT_MODEL.to_owned(),
        }
    }

    /// Creates a provider from config, falling back to the environment for the key.
    pub fn from_config(config: &AssistantConfig) -> Self {
        let provider = config
            .get_api_key("gemini")
            .and_then(|key| Self::new(key).ok())
            .unwrap_or_else(Self::unconfigured);

        match &config.api_keys.gemini_model {
            Some(model) if !model.trim().is_empty() => provider.with_model(model.trim().to_owned()),
            _ => provider,
        }
    }

    /// Sets the model to use for generation.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Builds the request body. Gemini calls the assistant role "model".
    fn build_payload(text: &str, history: &[HistoryMessage]) -> Value {
        let mut contents: Vec<Value> = history
            .iter()
            .map(|message| {
                let role = match message.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                json!({ "role": role, "parts": [{ "text": message.content }] })
            })
            .collect();
        contents.push(json!({ "role": "user", "parts": [{ "text": text }] }));

        json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": contents,
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": 1000,
            },
        })
    }
}

/// Response payload returned by `generateContent`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String> {
        if self.candidates.is_empty() {
            if let Some(reason) = self.prompt_feedback.and_then(|feedback| feedback.block_reason) {
                return Err(Error::Provider(format!("Request blocked by Gemini: {reason}")));
            }
            return Err(Error::InvalidResponse("No response from Gemini".to_owned()));
        }

        Ok(self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
            .map(|text| text.trim().to_owned())
            .unwrap_or_default())
    }
}

#[async_trait]
impl AnswerProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn ask(&self, text: &str, history: &[HistoryMessage]) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::MissingApiKey(ENV_GEMINI_API_KEY.to_owned()))?;

        let url = format!("{GEMINI_API_URL}/{}:generateContent", self.model);
        let response = self
            .client
            .post(url)
            .query(&[("key", api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&Self::build_payload(text, history))
            .send()
            .await
            .map_err(|err| Error::Provider(format!("Request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Gemini API request failed with status {status}: {error_text}"
            )));
        }

        let api_response: GenerateResponse = response
            .json()
            .await
            .map_err(|err| Error::InvalidResponse(format!("Failed to parse response: {err}")))?;

        api_response.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::from_value;

    #[test]
    fn test_new_with_empty_api_key() {
        assert!(matches!(
            GeminiProvider::new(String::new()),
            Err(Error::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_with_model() {
        let provider = GeminiProvider::new("key".to_owned())
            .expect("valid key")
            .with_model("gemini-2.0-flash".to_owned());
        assert_eq!(provider.model, "gemini-2.0-flash");
        assert!(provider.is_configured());
        assert_eq!(provider.triggers(), vec!["gemini".to_owned()]);
    }

    #[test]
    fn test_payload_maps_assistant_to_model_role() {
        let history = vec![
            HistoryMessage::new(Role::User, "xin chào"),
            HistoryMessage::new(Role::Assistant, "Chào bạn"),
        ];
        let payload = GeminiProvider::build_payload("bạn khỏe không", &history);
        let contents = payload["contents"].as_array().expect("contents array");

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"].as_str(), Some("model"));
        assert_eq!(contents[2]["parts"][0]["text"].as_str(), Some("bạn khỏe không"));
    }

    #[test]
    fn test_response_text_extraction() {
        let response: GenerateResponse = from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "  Hà Nội  " }] } }]
        }))
        .expect("parse response");
        assert_eq!(response.into_text().expect("text"), "Hà Nội");
    }

    #[test]
    fn test_blocked_response_is_error() {
        let response: GenerateResponse = from_value(json!({
            "candidates": [],
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .expect("parse response");
        assert!(matches!(response.into_text(), Err(Error::Provider(_))));
    }
}
