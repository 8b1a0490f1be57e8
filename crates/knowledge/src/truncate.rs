//! Sentence-boundary truncation.

use crate::sentences::{char_len, split_sentences};

/// Keep leading whole sentences, space-separated, while the result stays
/// within `max_chars`.
///
/// Stops at the first sentence that does not fit, even if a later, shorter
/// one would. Never cuts a sentence.
pub fn truncate_to_sentences(text: &str, max_chars: usize) -> String {
    let mut summary = String::new();
    let mut length = 0;

    for sentence in split_sentences(text) {
        let separator = usize::from(!summary.is_empty());
        let next = char_len(&sentence);
        if length + separator + next > max_chars {
            break;
        }

        if separator == 1 {
            summary.push(' ');
        }
        summary.push_str(&sentence);
        length += separator + next;
    }

    summary
}
