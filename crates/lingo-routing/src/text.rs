//! Tokenization and accent-free normalization of user input.

use std::collections::HashSet;
use std::mem;
use unicode_normalization::UnicodeNormalization as _;
use unicode_normalization::char::is_combining_mark;

/// Arithmetic operators kept as standalone tokens.
const OPERATORS: [char; 4] = ['+', '-', '*', '/'];

/// Lower-cased words of an input, with set lookup for single words and
/// contiguous-sequence lookup for multi-word phrases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    words: Vec<String>,
    unique: HashSet<String>,
}

impl Tokens {
    /// Tokenizes `text`: lower-cases, trims surrounding punctuation and splits
    /// numeric expressions such as `5+3` around their operators.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut words = Vec::new();
        for raw in text.to_lowercase().split_whitespace() {
            let word =
                raw.trim_matches(|ch: char| !ch.is_alphanumeric() && !OPERATORS.contains(&ch));
            if word.is_empty() {
                continue;
            }
            if has_digit(word) && word.contains(OPERATORS) {
                split_expression(word, &mut words);
            } else {
                words.push(word.to_owned());
            }
        }
        let unique = words.iter().cloned().collect();
        Self { words, unique }
    }

    /// Words in input order.
    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Whether the input had no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whether `term` occurs as a word, or as a contiguous run of words when it
    /// contains spaces.
    #[must_use]
    pub fn contains(&self, term: &str) -> bool {
        self.find(term).is_some()
    }

    /// Whether any of `terms` occurs.
    #[must_use]
    pub fn contains_any<S: AsRef<str>>(&self, terms: &[S]) -> bool {
        terms.iter().any(|term| self.contains(term.as_ref()))
    }

    /// Index one past the first occurrence of `term`.
    #[must_use]
    pub fn find(&self, term: &str) -> Option<usize> {
        let needle: Vec<String> = term
            .to_lowercase()
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        match needle.as_slice() {
            [] => None,
            [single] => {
                if !self.unique.contains(single) {
                    return None;
                }
                self.words.iter().position(|word| word == single).map(|index| index + 1)
            }
            phrase => self
                .words
                .windows(phrase.len())
                .position(|window| window == phrase)
                .map(|index| index + phrase.len()),
        }
    }

    /// Words following the first occurrence of any of `terms`, joined by spaces.
    ///
    /// Terms are tried in order; the first one present decides the split point.
    #[must_use]
    pub fn after_first<S: AsRef<str>>(&self, terms: &[S]) -> Option<String> {
        terms
            .iter()
            .find_map(|term| self.find(term.as_ref()))
            .map(|end| self.words[end..].join(" "))
    }
}

fn split_expression(word: &str, words: &mut Vec<String>) {
    let mut current = String::new();
    for ch in word.chars() {
        if OPERATORS.contains(&ch) {
            if !current.is_empty() {
                words.push(mem::take(&mut current));
            }
            words.push(ch.to_string());
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
}

/// Lower-cases `text`, strips diacritics (`đ` becomes `d`) and collapses whitespace.
///
/// Used for matching input whose accents were lost or mangled on the way in.
#[must_use]
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .map(|ch| if ch == 'đ' { 'd' } else { ch })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `phrase` occurs in `haystack` on word boundaries, comparing accent-free
/// forms with punctuation ignored.
#[must_use]
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let phrase = words_only(phrase);
    if phrase.is_empty() {
        return false;
    }
    format!(" {} ", words_only(haystack)).contains(&format!(" {phrase} "))
}

fn words_only(text: &str) -> String {
    let spaced: String = normalize(text)
        .chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '\'' { ch } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether the text contains an ASCII digit.
#[must_use]
pub fn has_digit(text: &str) -> bool {
    text.chars().any(|ch| ch.is_ascii_digit())
}
