use lingo_core::{Error, EscalationConfig, Result};
use regex::Regex;
use std::collections::HashSet;

use crate::text::normalize;

/// Matches answers that only name an intent, such as `intent: question` or `ask_weather`.
const LABEL_PATTERN: &str = r"^(?:(?:intent|y dinh)\s*[:=\-]\s*[a-z_]+|\[?[a-z]+(?:_[a-z]+)+\]?)$";

/// Words allowed before an "I don't understand" phrase, such as `xin lỗi, tôi`.
const MAX_APOLOGY_WORDS: usize = 4;

/// Decides whether a language-analysis answer carries too little information to show.
#[derive(Debug, Clone)]
pub struct QualityGate {
    not_understood: Vec<String>,
    intent_labels: HashSet<String>,
    label_pattern: Regex,
}

impl QualityGate {
    /// # Errors
    /// Returns a configuration error if the label pattern fails to compile.
    pub fn new(config: &EscalationConfig) -> Result<Self> {
        let label_pattern = Regex::new(LABEL_PATTERN)
            .map_err(|error| Error::Config(format!("Invalid intent label pattern: {error}")))?;
        Ok(Self {
            not_understood: config
                .not_understood
                .iter()
                .map(|phrase| normalize(phrase))
                .filter(|phrase| !phrase.is_empty())
                .collect(),
            intent_labels: config.intent_labels.iter().map(|label| normalize(label)).collect(),
            label_pattern,
        })
    }

    /// Whether `output` is empty, an "I don't understand" answer, or a bare intent label.
    #[must_use]
    pub fn is_low_information(&self, output: &str) -> bool {
        let normalized = normalize(output);
        let normalized = normalized.trim_end_matches(['.', '!']).trim();
        if normalized.is_empty() {
            return true;
        }
        if self.opens_with_not_understood(normalized) {
            return true;
        }
        self.intent_labels.contains(normalized) || self.label_pattern.is_match(normalized)
    }

    /// Whether `normalized` begins with a not-understood phrase, after at most a short
    /// apology. The same phrase later in an answer is ordinary text.
    fn opens_with_not_understood(&self, normalized: &str) -> bool {
        self.not_understood.iter().any(|phrase| {
            normalized.find(phrase.as_str()).is_some_and(|start| {
                normalized[..start].split_whitespace().count() <= MAX_APOLOGY_WORDS
            })
        })
    }
}
