//! Escalation providers for questions no local handler answers well.
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

/// Google Gemini provider implementation.
pub mod gemini;
/// Scriptable provider for tests.
pub mod mock;
/// `OpenAI`-compatible chat completions provider.
pub mod openai;

pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;

use lingo_core::{AnswerProvider, AssistantConfig};
use std::sync::Arc;

/// System prompt shared by the remote providers.
pub(crate) const SYSTEM_PROMPT: &str = "Bạn là trợ lý AI thân thiện. Trả lời ngắn gọn, đúng trọng tâm, \
     ưu tiên tiếng Việt. Nếu người dùng dùng ngôn ngữ khác, hãy trả lời bằng ngôn ngữ đó.";

/// Every remote provider known to the assistant, configured from `config` or the
/// environment. Providers without credentials are included and report
/// `is_configured() == false`.
pub fn providers_from_config(config: &AssistantConfig) -> Vec<Arc<dyn AnswerProvider>> {
    vec![
        Arc::new(OpenAiProvider::from_config(config)),
        Arc::new(GeminiProvider::from_config(config)),
    ]
}
