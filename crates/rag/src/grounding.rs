//! Lexical check that an answer actually draws on the supplied context.

use std::collections::HashSet;

/// Keywords needed for an answer to count as grounded, at most.
const KEYWORD_THRESHOLD: usize = 10;

/// Whether `response` mentions enough distinctive words of `context`.
///
/// Keywords are the context's whitespace tokens longer than five
/// characters, deduplicated. The answer must contain (case-insensitively)
/// `min(10, keywords)` of them. Without any keyword this is `false`.
pub fn contains_context_info(response: &str, context: &str) -> bool {
    let mut seen = HashSet::new();
    let keywords: Vec<&str> = context
        .split_whitespace()
        .filter(|word| word.chars().count() > 5)
        .filter(|word| seen.insert(*word))
        .collect();

    let threshold = KEYWORD_THRESHOLD.min(keywords.len());
    let response = response.to_lowercase();

    let mut matches = 0;
    for keyword in keywords {
        if response.contains(&keyword.to_lowercase()) {
            matches += 1;
            if matches >= threshold {
                return true;
            }
        }
    }

    false
}
