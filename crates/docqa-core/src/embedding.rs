//! Embedding backend trait and vector similarity.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus the pure similarity functions used by the vector index.
//!
//! Concrete backends (Ollama, OpenAI, fastembed) and the batching/retry
//! driver live in the `docqa` app crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Maps texts to fixed-dimension vectors.
///
/// Implementations embed one backend-sized batch per call; splitting a
/// large input into batches is the caller's job (see `docqa::embedding::embed_texts`).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"nomic-embed-text"`).
    fn model_name(&self) -> &str;

    /// Largest number of texts accepted by one [`embed_batch`](Embedder::embed_batch) call.
    fn max_batch_size(&self) -> usize {
        64
    }

    /// Embed one batch. Must return exactly one vector per input text, in
    /// input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Similarity function used to rank index entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Cosine,
    InnerProduct,
}

impl Metric {
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_similarity(a, b),
            Metric::InnerProduct => inner_product(a, b),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::InnerProduct => "inner_product",
        }
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero-magnitude vector.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Dot product of two vectors; `0.0` for mismatched lengths.
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
