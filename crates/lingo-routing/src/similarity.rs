//! String similarity scores in `0.0..=1.0`, built on normalized Levenshtein distance.

use std::collections::BTreeSet;
use strsim::normalized_levenshtein;

/// Plain edit-distance similarity.
#[must_use]
pub fn ratio(left: &str, right: &str) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(left, right)
}

/// Order-insensitive similarity over the word sets of both strings.
///
/// The shared words are compared against each side's full word set, so an
/// input whose words all appear in `right` scores 1.0 regardless of how much
/// extra vocabulary `right` carries.
#[must_use]
pub fn token_set_ratio(left: &str, right: &str) -> f64 {
    let left_words = word_set(left);
    let right_words = word_set(right);
    if left_words.is_empty() || right_words.is_empty() {
        return 0.0;
    }

    let shared = join(left_words.intersection(&right_words));
    let left_only = join(left_words.difference(&right_words));
    let right_only = join(right_words.difference(&left_words));

    let left_combined = combine(&shared, &left_only);
    let right_combined = combine(&shared, &right_only);

    [
        ratio(&shared, &left_combined),
        ratio(&shared, &right_combined),
        ratio(&left_combined, &right_combined),
    ]
    .into_iter()
    .fold(0.0, f64::max)
}

/// Best similarity of the shorter string against every same-length window of
/// the longer one.
#[must_use]
pub fn partial_ratio(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.to_lowercase().chars().collect();
    let right: Vec<char> = right.to_lowercase().chars().collect();
    let (short, long) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    if short.is_empty() {
        return 0.0;
    }

    let needle: String = short.iter().collect();
    let mut best = 0.0_f64;
    for window in long.windows(short.len()) {
        let candidate: String = window.iter().collect();
        best = best.max(ratio(&needle, &candidate));
        if best >= 1.0 {
            break;
        }
    }
    best
}

fn word_set(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_owned)
        .collect()
}

fn join<'words>(words: impl Iterator<Item = &'words String>) -> String {
    words.map(String::as_str).collect::<Vec<_>>().join(" ")
}

fn combine(shared: &str, rest: &str) -> String {
    format!("{shared} {rest}").trim().to_owned()
}
