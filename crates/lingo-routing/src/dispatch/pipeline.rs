use lingo_core::{
    AnswerProvider, ConversationMemory, Error, HistoryMessage, Invocation, Result, Role,
};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::task::{JoinError, spawn_blocking};
use uuid::Uuid;

use super::{ProviderSet, QualityGate, TaughtPatterns};
use crate::matcher::{MatchOutcome, MatchTarget, Matcher};
use crate::registry::loader::panic_message;
use crate::registry::{HandlerDescriptor, Registry};
use crate::similarity::partial_ratio;

/// Reply when nothing matched and there is nothing to suggest.
pub const GENERIC_UNMATCHED: &str =
    "Xin lỗi, tôi không hiểu yêu cầu của bạn. Hãy thử diễn đạt theo cách khác.";
/// First line of a reply listing suggested phrasings.
pub const SUGGESTION_HEADER: &str = "Xin lỗi, tôi không hiểu. Có phải bạn muốn nói:";
/// Prefix of replies reporting a handler failure.
pub const ERROR_PREFIX: &str = "Có lỗi xảy ra: ";

/// One request travelling through the pipeline.
#[derive(Debug, Clone)]
pub struct DispatchTask {
    /// Identifier used in log spans
    pub id: Uuid,
    /// Trimmed request text
    pub input: String,
}

impl DispatchTask {
    /// Task for `input` with a fresh id.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            input: input.into(),
        }
    }
}

/// Turns one input into one reply: taught patterns, matching, handler execution,
/// escalation and the unmatched fallback.
pub struct DispatchPipeline {
    matcher: Matcher,
    registry: Arc<Registry>,
    providers: Arc<ProviderSet>,
    taught: Arc<TaughtPatterns>,
    memory: Arc<dyn ConversationMemory>,
    gate: QualityGate,
    history_turns: usize,
}

impl DispatchPipeline {
    /// Pipeline over shared engine state.
    #[must_use]
    pub fn new(
        matcher: Matcher,
        registry: Arc<Registry>,
        providers: Arc<ProviderSet>,
        taught: Arc<TaughtPatterns>,
        memory: Arc<dyn ConversationMemory>,
        gate: QualityGate,
        history_turns: usize,
    ) -> Self {
        Self {
            matcher,
            registry,
            providers,
            taught,
            memory,
            gate,
            history_turns,
        }
    }

    /// Matcher used by this pipeline.
    #[must_use]
    pub const fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Produces the reply for `task`. Never fails: every error becomes reply text.
    pub async fn run(&self, task: &DispatchTask) -> String {
        let input = task.input.as_str();
        tracing::debug!("Dispatching '{input}'");
        self.remember(Role::User, input);

        if let Some(reply) = self.taught.lookup(input) {
            tracing::debug!("Answered from a taught pattern");
            return reply;
        }

        let reply = match self.matcher.resolve(input).await {
            Some(outcome) => self.answer(input, outcome).await,
            None => self.answer_unmatched(input).await,
        };

        self.remember(Role::Assistant, &reply);
        reply
    }

    async fn answer(&self, input: &str, outcome: MatchOutcome) -> String {
        let MatchOutcome {
            target, parameter, ..
        } = outcome;
        match target {
            MatchTarget::Provider(provider) => {
                self.ask_provider(input, provider.as_ref(), &parameter).await
            }
            MatchTarget::Handler(descriptor) => {
                self.run_handler(input, descriptor, parameter).await
            }
        }
    }

    async fn ask_provider(
        &self,
        input: &str,
        provider: &dyn AnswerProvider,
        question: &str,
    ) -> String {
        if question.is_empty() {
            return format!("Bạn muốn hỏi {} điều gì?", provider.name());
        }
        let history = self.prior_history(input);
        match self.providers.ask(provider, question, &history).await {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => format!("Xin lỗi, {} không có câu trả lời.", provider.name()),
            Err(error) => {
                tracing::warn!("Provider '{}' failed: {error}", provider.name());
                format!("Lỗi khi gọi {}: {error}", provider.name())
            }
        }
    }

    async fn run_handler(
        &self,
        input: &str,
        descriptor: Arc<HandlerDescriptor>,
        parameter: String,
    ) -> String {
        let name = descriptor.name().to_owned();
        let context_aware = name == self.matcher.config().language_handler;
        let history = if context_aware {
            self.recent_history(self.history_turns)
        } else {
            Vec::new()
        };
        let invocation = Invocation::new(parameter).with_history(history);

        let output = match invoke(descriptor, invocation).await {
            Ok(output) => output,
            Err(error) => {
                tracing::warn!("Handler '{name}' failed: {error}");
                return format!("{ERROR_PREFIX}{error}");
            }
        };

        if context_aware && self.gate.is_low_information(&output) {
            tracing::debug!("Answer from '{name}' carries no information, escalating");
            let history = self.prior_history(input);
            if let Some(answer) = self.providers.escalate(input, &history).await {
                return answer;
            }
        }
        output
    }

    async fn answer_unmatched(&self, input: &str) -> String {
        if self.providers.any_configured() {
            let history = self.prior_history(input);
            if let Some(answer) = self.providers.escalate(input, &history).await {
                return answer;
            }
        }

        let suggestions = self.suggestions(input);
        if suggestions.is_empty() {
            return GENERIC_UNMATCHED.to_owned();
        }
        let lines: Vec<String> = suggestions
            .iter()
            .map(|suggestion| format!("- {suggestion}"))
            .collect();
        format!("{SUGGESTION_HEADER}\n{}", lines.join("\n"))
    }

    /// Up to the configured number of example phrases resembling `input`, at most
    /// one per handler.
    #[must_use]
    pub fn suggestions(&self, input: &str) -> Vec<String> {
        let config = self.matcher.config();
        self.registry
            .snapshot()
            .sorted()
            .into_iter()
            .filter_map(|descriptor| {
                descriptor
                    .patterns()
                    .iter()
                    .find(|pattern| partial_ratio(input, pattern) > config.suggestion_threshold)
                    .cloned()
            })
            .take(config.max_suggestions)
            .collect()
    }

    /// Recent turns, without the turn for the current input when it is the newest one.
    fn prior_history(&self, input: &str) -> Vec<HistoryMessage> {
        let mut history = self.recent_history(self.history_turns + 1);
        if history
            .last()
            .is_some_and(|message| message.role == Role::User && message.content == input)
        {
            history.pop();
        }
        let excess = history.len().saturating_sub(self.history_turns);
        history.drain(..excess);
        history
    }

    fn recent_history(&self, count: usize) -> Vec<HistoryMessage> {
        catch_unwind(AssertUnwindSafe(|| self.memory.recent_history(count))).unwrap_or_else(|_| {
            tracing::warn!("Conversation memory failed to return history");
            Vec::new()
        })
    }

    fn remember(&self, role: Role, content: &str) {
        if catch_unwind(AssertUnwindSafe(|| self.memory.add_turn(role, content))).is_err() {
            tracing::warn!("Conversation memory failed to record a {role} turn");
        }
    }
}

/// Runs a blocking handler on the worker pool, turning a panic into an error.
async fn invoke(descriptor: Arc<HandlerDescriptor>, invocation: Invocation) -> Result<String> {
    spawn_blocking(move || descriptor.invoke(&invocation))
        .await
        .map_err(|error| Error::HandlerExecution(join_error_message(error)))?
}

/// Describes why a task did not produce a value.
pub(crate) fn join_error_message(error: JoinError) -> String {
    if error.is_panic() {
        panic_message(error.into_panic().as_ref())
    } else {
        "task was cancelled".to_owned()
    }
}
