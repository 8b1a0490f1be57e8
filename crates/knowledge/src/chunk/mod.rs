//! Similarity-driven sentence grouping.
//!
//! Consecutive sentences stay in one chunk while each is similar enough to
//! what follows it. "Similar enough" adapts to the document: the cut-off is
//! derived from the spread of the similarities themselves.

mod merging;

pub use merging::merge_similar_chunks;

use crate::sentences::char_len;
use crate::similarity::cosine_similarity;
use std::ops::Range;

/// A run of sentences selected as one unit of context.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Indices into the sentence list this chunk was built from
    pub sentences: Range<usize>,

    /// The sentences joined by single spaces
    pub text: String,
}

impl Chunk {
    /// Build a chunk from a sentence range.
    pub fn from_range(sentences: &[String], range: Range<usize>) -> Self {
        let text = sentences[range.clone()].join(" ");
        Self {
            sentences: range,
            text,
        }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        char_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Parameters for [`group_sentences`].
#[derive(Debug, Clone, Copy)]
pub struct GroupingParams {
    pub threshold: f32,
    pub max_chunk_size: usize,
    pub overlap_sentences: usize,
}

/// For each sentence but the last, the best cosine similarity against the
/// next `lookahead` sentences.
pub fn lookahead_similarities(embeddings: &[Vec<f32>], lookahead: usize) -> Vec<f32> {
    let n = embeddings.len();
    let lookahead = lookahead.max(1);

    (0..n.saturating_sub(1))
        .map(|i| {
            let end = (i + lookahead).min(n - 1);
            (i + 1..=end)
                .map(|j| cosine_similarity(&embeddings[i], &embeddings[j]))
                .fold(f32::MIN, f32::max)
        })
        .collect()
}

/// Group sentences into chunks.
///
/// Sentence `i + 1` joins the current chunk when `similarities[i]` is at
/// least the threshold and the chunk stays within `max_chunk_size`
/// characters. A new chunk starts with up to `overlap_sentences` trailing
/// sentences of the previous one, as far as they fit.
pub fn group_sentences(
    sentences: &[String],
    similarities: &[f32],
    params: GroupingParams,
) -> Vec<Chunk> {
    if sentences.is_empty() {
        return Vec::new();
    }

    let range_len = |range: &Range<usize>| -> usize {
        sentences[range.clone()].iter().map(|s| char_len(s)).sum::<usize>()
            + range.len().saturating_sub(1)
    };

    let mut chunks = Vec::new();
    let mut current = 0..1;

    for i in 1..sentences.len() {
        let similar = similarities.get(i - 1).copied().unwrap_or(f32::MIN) >= params.threshold;
        let extended = current.start..i + 1;

        if similar && range_len(&extended) <= params.max_chunk_size {
            current = extended;
            continue;
        }

        chunks.push(Chunk::from_range(sentences, current.clone()));

        // Never carry the whole previous chunk over
        let mut carry = params
            .overlap_sentences
            .min(current.len().saturating_sub(1));
        while carry > 0 && range_len(&(i - carry..i + 1)) > params.max_chunk_size {
            carry -= 1;
        }
        current = i - carry..i + 1;
    }

    chunks.push(Chunk::from_range(sentences, current));
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn params(threshold: f32, max_chunk_size: usize, overlap_sentences: usize) -> GroupingParams {
        GroupingParams {
            threshold,
            max_chunk_size,
            overlap_sentences,
        }
    }

    #[test]
    fn test_lookahead_takes_best_of_window() {
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
        ];

        assert_eq!(lookahead_similarities(&embeddings, 1), vec![0.0, 0.0, 0.0]);

        let sims = lookahead_similarities(&embeddings, 2);
        assert_eq!(sims.len(), 3);
        assert!((sims[0] - 1.0).abs() < 1e-6);
        assert!((sims[1] - 1.0).abs() < 1e-6);
        assert!(sims[2].abs() < 1e-6);
    }

    #[test]
    fn test_lookahead_short_inputs() {
        assert!(lookahead_similarities(&[], 3).is_empty());
        assert!(lookahead_similarities(&[vec![1.0]], 3).is_empty());
    }

    #[test]
    fn test_groups_split_on_dissimilarity() {
        let s = sentences(&["A1.", "A2.", "B1.", "B2."]);
        let chunks = group_sentences(&s, &[0.9, 0.1, 0.9], params(0.5, 100, 0));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "A1. A2.");
        assert_eq!(chunks[1].text, "B1. B2.");
    }

    #[test]
    fn test_groups_respect_max_size() {
        let s = sentences(&["aaaa.", "bbbb.", "cccc."]);
        let chunks = group_sentences(&s, &[1.0, 1.0], params(0.5, 11, 0));

        assert_eq!(chunks[0].text, "aaaa. bbbb.");
        assert_eq!(chunks[1].text, "cccc.");
        assert!(chunks.iter().all(|c| c.len() <= 11));
    }

    #[test]
    fn test_overlap_carries_trailing_sentence() {
        let s = sentences(&["A1.", "A2.", "B1.", "B2."]);
        let chunks = group_sentences(&s, &[0.9, 0.1, 0.9], params(0.5, 100, 1));

        assert_eq!(chunks[0].sentences, 0..2);
        assert_eq!(chunks[1].sentences, 1..4);
        assert_eq!(chunks[1].text, "A2. B1. B2.");
    }

    #[test]
    fn test_overlap_never_copies_single_sentence_chunk() {
        let s = sentences(&["A.", "B.", "C."]);
        let chunks = group_sentences(&s, &[0.0, 0.0], params(0.5, 100, 2));

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A.", "B.", "C."]);
    }

    #[test]
    fn test_overlap_dropped_when_it_does_not_fit() {
        let s = sentences(&["aa.", "bbbbbbb.", "cccc."]);
        let chunks = group_sentences(&s, &[1.0, 1.0], params(0.5, 12, 1));

        assert_eq!(chunks[0].text, "aa. bbbbbbb.");
        assert_eq!(chunks[1].text, "cccc.");
    }
}
