//! Reduced-precision embeddings.
//!
//! Vectors are stored and compared as `f32`, but their values can be
//! snapped to what half precision or symmetric 8-bit quantisation would
//! preserve. Similarity is then computed on the snapped values.

use crate::embeddings::provider::EmbeddingProvider;
use std::sync::Arc;
use webrag_core::{AppResult, EmbeddingPrecision};

const F16_MANTISSA_SHIFT: u32 = 13;
const F16_MAX: f32 = 65504.0;

/// Apply `precision` to a vector in place.
pub fn apply_precision(vector: &mut [f32], precision: EmbeddingPrecision) {
    match precision {
        EmbeddingPrecision::Fp32 => {}
        EmbeddingPrecision::Fp16 => {
            for v in vector.iter_mut() {
                *v = round_to_f16(*v);
            }
        }
        EmbeddingPrecision::Q8 => quantize_q8(vector),
    }
}

/// Round the mantissa to 10 bits (round half to even) and clamp to the
/// half-precision range.
fn round_to_f16(value: f32) -> f32 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }

    let bits = value.to_bits();
    let lsb = (bits >> F16_MANTISSA_SHIFT) & 1;
    let rounding = (1u32 << (F16_MANTISSA_SHIFT - 1)) - 1 + lsb;
    let rounded = bits.wrapping_add(rounding) & !((1u32 << F16_MANTISSA_SHIFT) - 1);

    f32::from_bits(rounded).clamp(-F16_MAX, F16_MAX)
}

/// Symmetric per-vector int8 quantisation followed by dequantisation.
fn quantize_q8(vector: &mut [f32]) {
    let max_abs = vector.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
    if max_abs == 0.0 || !max_abs.is_finite() {
        return;
    }

    let scale = max_abs / 127.0;
    for v in vector.iter_mut() {
        let q = (*v / scale).round().clamp(-127.0, 127.0);
        *v = q * scale;
    }
}

/// Wraps a provider and applies a precision mode to everything it returns.
#[derive(Debug)]
pub struct QuantizedProvider {
    inner: Arc<dyn EmbeddingProvider>,
    precision: EmbeddingPrecision,
}

impl QuantizedProvider {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, precision: EmbeddingPrecision) -> Self {
        Self { inner, precision }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for QuantizedProvider {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut vectors = self.inner.embed_batch(texts).await?;
        for vector in &mut vectors {
            apply_precision(vector, self.precision);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fp32_is_identity() {
        let mut v = vec![0.123_456_79, -1.5];
        apply_precision(&mut v, EmbeddingPrecision::Fp32);
        assert_eq!(v, vec![0.123_456_79, -1.5]);
    }

    #[test]
    fn test_fp16_rounding() {
        let mut v = vec![1.0, 0.1, -3.141_592_7, 100_000.0];
        apply_precision(&mut v, EmbeddingPrecision::Fp16);

        assert_eq!(v[0], 1.0);
        // f16 keeps about three decimal digits
        assert!((v[1] - 0.1).abs() < 1e-4);
        assert_ne!(v[1], 0.1);
        assert!((v[2] + 3.140_625).abs() < 1e-6);
        assert_eq!(v[3], 65504.0);
    }

    #[test]
    fn test_q8_quantization() {
        let mut v = vec![1.0, -0.5, 0.25, 0.0];
        apply_precision(&mut v, EmbeddingPrecision::Q8);

        assert!((v[0] - 1.0).abs() < 1e-6);
        assert!((v[1] + 0.5).abs() < 1.0 / 127.0);
        assert!((v[2] - 0.25).abs() < 1.0 / 127.0);
        assert_eq!(v[3], 0.0);
    }

    #[test]
    fn test_q8_zero_vector() {
        let mut v = vec![0.0; 4];
        apply_precision(&mut v, EmbeddingPrecision::Q8);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
