//! "Did you mean" suggestions.
//!
//! Similarity is `1 - distance / max_len` over normalized names, where
//! distance is the Levenshtein edit distance counted in characters.

use crate::names::normalize;

/// Cutoff and result size for suggestions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestionConfig {
    /// Minimum similarity, inclusive, in `0.0..=1.0`.
    pub threshold: f64,
    /// Maximum number of suggestions returned.
    pub limit: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            limit: 3,
        }
    }
}

/// Levenshtein distance between two strings.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            let insertion = current[j] + 1;
            let deletion = previous[j + 1] + 1;
            current[j + 1] = substitution.min(insertion).min(deletion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Similarity of two names after normalization.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// Best matches for `target` among `candidates`, most similar first.
///
/// Ties are broken alphabetically so the result is deterministic.
pub fn suggest<'a, I>(target: &str, candidates: I, config: &SuggestionConfig) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scored: Vec<(f64, &str)> = candidates
        .into_iter()
        .map(|candidate| (similarity(target, candidate), candidate))
        .filter(|(score, _)| *score >= config.threshold)
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    let mut suggestions: Vec<String> = Vec::new();
    for (_, candidate) in scored {
        if suggestions.len() == config.limit {
            break;
        }
        if !suggestions.iter().any(|s| s == candidate) {
            suggestions.push(candidate.to_string());
        }
    }
    suggestions
}
