//! Merging of adjacent chunks that talk about the same thing.

use super::Chunk;
use crate::sentences::char_len;
use crate::similarity::cosine_similarity;

/// Merge neighbouring chunks whose embeddings are at least `threshold`
/// similar, as long as the merged text stays within `max_size` characters.
///
/// `embeddings[i]` belongs to `chunks[i]`. Overlapping sentence ranges are
/// unioned, so shared sentences are not repeated.
pub fn merge_similar_chunks(
    chunks: Vec<Chunk>,
    embeddings: &[Vec<f32>],
    sentences: &[String],
    threshold: f32,
    max_size: usize,
) -> Vec<Chunk> {
    if chunks.len() < 2 || embeddings.len() != chunks.len() {
        return chunks;
    }

    let mut merged = Vec::with_capacity(chunks.len());
    let mut iter = chunks.into_iter().enumerate();
    let Some((_, mut current)) = iter.next() else {
        return merged;
    };

    for (i, next) in iter {
        let similarity = cosine_similarity(&embeddings[i - 1], &embeddings[i]);
        match merge_two_chunks(&current, &next, sentences) {
            Some(candidate) if should_merge(similarity, threshold, &candidate, max_size) => {
                current = candidate;
            }
            _ => {
                merged.push(current);
                current = next;
            }
        }
    }
    merged.push(current);

    merged
}

fn should_merge(similarity: f32, threshold: f32, candidate: &Chunk, max_size: usize) -> bool {
    similarity >= threshold && char_len(&candidate.text) <= max_size
}

/// Union of two sentence ranges, if `second` does not start before `first`.
fn merge_two_chunks(first: &Chunk, second: &Chunk, sentences: &[String]) -> Option<Chunk> {
    if second.sentences.start < first.sentences.start {
        return None;
    }
    let end = first.sentences.end.max(second.sentences.end);
    Some(Chunk::from_range(sentences, first.sentences.start..end))
}
