//! Cosine similarity between word vectors.
//!
//! Components are stored as `f32` but every sum is accumulated in `f64`.
//! The formula is `dot(a, b) / (norm(a) * norm(b))`, evaluated in the same
//! order whichever argument comes first, so `similarity(a, b)` and
//! `similarity(b, a)` are bit-identical.

use crate::error::Result;
use crate::store::VectorStore;
use std::sync::Arc;
use tracing::debug;

/// Cosine similarity in `[-1, 1]`.
pub type SimilarityScore = f64;

/// Dot product accumulated in `f64`.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same dimension");
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

/// Euclidean norm accumulated in `f64`.
#[inline]
#[must_use]
pub fn norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| {
            let x = f64::from(x);
            x * x
        })
        .sum::<f64>()
        .sqrt()
}

/// Combine a precomputed dot product and norms into a cosine.
///
/// A zero-length vector has no direction; its similarity is `0.0`.
#[inline]
#[must_use]
pub fn cosine_from_parts(dot: f64, norm_a: f64, norm_b: f64) -> SimilarityScore {
    let denominator = norm_a * norm_b;
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    (dot / denominator).clamp(-1.0, 1.0)
}

/// Cosine similarity of two vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> SimilarityScore {
    cosine_from_parts(dot(a, b), norm(a), norm(b))
}

/// Word-level similarity lookups over a [`VectorStore`].
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    store: Arc<VectorStore>,
}

impl SimilarityEngine {
    #[must_use]
    pub const fn new(store: Arc<VectorStore>) -> Self {
        Self { store }
    }

    /// Similarity between two words, or `None` if either is not indexed.
    ///
    /// A word compared with itself is exactly `1.0`.
    ///
    /// # Errors
    ///
    /// Returns `PartialRead` or IO errors from the vector reads.
    pub async fn similarity(&self, a: &str, b: &str) -> Result<Option<SimilarityScore>> {
        if a == b {
            return Ok(self.store.index().contains(a).then_some(1.0));
        }

        let (va, vb) = tokio::try_join!(self.store.read_vector(a), self.store.read_vector(b))?;
        let score = match (va, vb) {
            (Some(va), Some(vb)) => Some(cosine_similarity(&va, &vb)),
            _ => None,
        };
        debug!(a, b, ?score, "Computed similarity");
        Ok(score)
    }
}
