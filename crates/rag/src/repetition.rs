//! Detection of a model repeating itself while streaming.

use std::collections::HashSet;

/// Jaccard similarity of the lower-cased whitespace word sets of `a` and
/// `b`. Two texts without words score 0.
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    let a = word_set(a);
    let b = word_set(b);

    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f32 / union as f32
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Compares each new increment with the equally long tail of what was
/// already generated.
#[derive(Debug, Clone, Copy)]
pub struct RepetitionGuard {
    threshold: f32,
}

impl RepetitionGuard {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Whether appending `increment` to `generated` would repeat recent text.
    pub fn is_repetitive(&self, generated: &str, increment: &str) -> bool {
        if generated.is_empty() || increment.is_empty() {
            return false;
        }
        jaccard_similarity(tail_chars(generated, increment.chars().count()), increment)
            > self.threshold
    }
}

/// The last `n` characters of `text` (all of it when shorter).
fn tail_chars(text: &str, n: usize) -> &str {
    let total = text.chars().count();
    if n >= total {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((start, _)) => &text[start..],
        None => text,
    }
}
