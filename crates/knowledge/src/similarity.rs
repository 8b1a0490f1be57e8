//! Vector similarity helpers.

/// Cosine similarity of two vectors; 0.0 for mismatched lengths or zero
/// vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Population mean and standard deviation. `None` for an empty slice.
pub fn mean_stddev(values: &[f32]) -> Option<(f32, f32)> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    Some((mean, variance.sqrt()))
}

/// `mean - stddev` clamped to `[lower, upper]`; `fallback` when the values
/// have no spread (or there are none).
pub fn dynamic_threshold(values: &[f32], lower: f32, upper: f32, fallback: f32) -> f32 {
    match mean_stddev(values) {
        Some((mean, stddev)) if stddev > f32::EPSILON => (mean - stddev).clamp(lower, upper),
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_dynamic_threshold() {
        // mean 0.5, stddev 0.3
        let t = dynamic_threshold(&[0.2, 0.8], 0.1, 0.9, 0.5);
        assert!((t - 0.2).abs() < 1e-6);

        // clamped to the lower bound
        let t = dynamic_threshold(&[0.0, 0.6], 0.25, 0.8, 0.5);
        assert!((t - 0.25).abs() < 1e-6);

        // no spread
        assert_eq!(dynamic_threshold(&[0.7, 0.7], 0.2, 0.8, 0.5), 0.5);
        assert_eq!(dynamic_threshold(&[], 0.2, 0.8, 0.5), 0.5);
    }
}
