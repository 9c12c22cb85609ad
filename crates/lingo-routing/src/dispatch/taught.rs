use lingo_core::{IgnoreRwLock as _, TaughtPattern};
use std::sync::RwLock;

use crate::text::{contains_phrase, normalize};

/// Literal replies learned from configuration or at runtime.
///
/// Checked before any matching; the first pattern found in the input wins.
#[derive(Debug, Default)]
pub struct TaughtPatterns {
    entries: RwLock<Vec<TaughtPattern>>,
}

impl TaughtPatterns {
    /// Patterns seeded from configuration.
    #[must_use]
    pub fn new(seed: &[TaughtPattern]) -> Self {
        let patterns = Self::default();
        for entry in seed {
            patterns.teach(&entry.pattern, &entry.reply);
        }
        patterns
    }

    /// Adds or replaces the reply for `pattern`. Blank patterns are ignored.
    pub fn teach(&self, pattern: &str, reply: &str) {
        let pattern = normalize(pattern);
        if pattern.is_empty() {
            return;
        }
        let mut entries = self.entries.write_ignore_poison();
        match entries.iter_mut().find(|entry| entry.pattern == pattern) {
            Some(existing) => reply.clone_into(&mut existing.reply),
            None => entries.push(TaughtPattern {
                pattern,
                reply: reply.to_owned(),
            }),
        }
    }

    /// Reply of the first taught pattern occurring in `text`.
    #[must_use]
    pub fn lookup(&self, text: &str) -> Option<String> {
        self.entries
            .read_ignore_poison()
            .iter()
            .find(|entry| contains_phrase(text, &entry.pattern))
            .map(|entry| entry.reply.clone())
    }

    /// Number of taught patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read_ignore_poison().len()
    }

    /// Whether nothing has been taught.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read_ignore_poison().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_accent_insensitive() {
        let patterns = TaughtPatterns::new(&[TaughtPattern {
            pattern: "bạn tên gì".to_owned(),
            reply: "Tôi là Lingo.".to_owned(),
        }]);
        assert_eq!(patterns.lookup("Ban ten gi vay?"), Some("Tôi là Lingo.".to_owned()));
        assert_eq!(patterns.lookup("tên bạn"), None);
    }

    #[test]
    fn test_teach_replaces_existing_reply() {
        let patterns = TaughtPatterns::default();
        patterns.teach("xin chào", "Chào bạn!");
        patterns.teach("Xin Chao", "Chào bạn nhé!");
        patterns.teach("   ", "ignored");
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns.lookup("xin chào Lingo"), Some("Chào bạn nhé!".to_owned()));
    }
}
