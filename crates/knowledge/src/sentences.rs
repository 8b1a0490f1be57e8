//! Sentence segmentation.
//!
//! Boundaries follow Unicode UAX #29 rather than punctuation splitting, so
//! abbreviations, decimals and non-Latin scripts behave.

use text_splitter::TextSplitter;
use unicode_segmentation::UnicodeSegmentation;

/// Split `text` into trimmed, non-empty sentences in document order.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Length in characters.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Break any sentence longer than `max_chars` into pieces that fit,
/// preferring word boundaries.
pub fn split_oversized(sentences: Vec<String>, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return sentences;
    }

    let splitter = TextSplitter::new(max_chars);
    let mut result = Vec::with_capacity(sentences.len());

    for sentence in sentences {
        if char_len(&sentence) <= max_chars {
            result.push(sentence);
            continue;
        }
        result.extend(
            splitter
                .chunks(&sentence)
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .map(str::to_string),
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("Rust is fast. Is it safe?  Yes!\n\nIt is.");
        assert_eq!(sentences, vec!["Rust is fast.", "Is it safe?", "Yes!", "It is."]);
    }

    #[test]
    fn test_decimal_is_not_a_boundary() {
        let sentences = split_sentences("Pi is about 3.14 in value. Next one.");
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn test_empty_text() {
        assert!(split_sentences("   \n ").is_empty());
    }

    #[test]
    fn test_split_oversized() {
        let long = "word ".repeat(60).trim().to_string();
        let pieces = split_oversized(vec!["short.".to_string(), long], 50);

        assert_eq!(pieces[0], "short.");
        assert!(pieces.len() > 2);
        assert!(pieces.iter().all(|p| char_len(p) <= 50));
    }

    #[test]
    fn test_char_len_counts_chars() {
        assert_eq!(char_len("caf\u{e9}"), 4);
    }
}
