//! Immutable in-memory vector index.
//!
//! A [`VectorIndex`] is a snapshot of `(Chunk, Embedding)` entries built
//! once per document. Queries are an exact brute-force scan over every
//! entry, ranked with the [`Metric`] chosen at build time. There is no
//! insert or delete: a changed document gets a fresh [`VectorIndex::build`].
//!
//! # Ranking
//!
//! 1. Score every entry against the query vector with the build metric.
//! 2. Sort by score (desc), then chunk index (asc) so ties are stable.
//! 3. Truncate to `k`.

use crate::embedding::Metric;
use crate::error::{Error, Result};
use crate::models::{Chunk, ScoredChunk};

#[derive(Debug)]
struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<Entry>,
    dims: usize,
    metric: Metric,
}

impl VectorIndex {
    /// Pair each chunk with its embedding.
    ///
    /// # Errors
    ///
    /// - [`Error::DimensionMismatch`] if the embeddings differ in length.
    /// - [`Error::Backend`] if there is not exactly one embedding per chunk.
    pub fn build(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>, metric: Metric) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(Error::Backend(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dims = embeddings.first().map(|v| v.len()).unwrap_or(0);
        if let Some(bad) = embeddings.iter().find(|v| v.len() != dims) {
            return Err(Error::DimensionMismatch {
                expected: dims,
                actual: bad.len(),
            });
        }

        let mut entries: Vec<Entry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| Entry { chunk, vector })
            .collect();
        entries.sort_by_key(|e| e.chunk.chunk_index);

        Ok(Self {
            entries,
            dims,
            metric,
        })
    }

    /// Return up to `k` chunks most similar to `query`.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] if `query` does not match the index
    /// dimension (an empty index accepts any query).
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dims {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f32, &Entry)> = self
            .entries
            .iter()
            .map(|e| (self.metric.score(query, &e.vector), e))
            .collect();
        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then(a.1.chunk.chunk_index.cmp(&b.1.chunk.chunk_index))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, e)| ScoredChunk {
                chunk: e.chunk.clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding dimension shared by every entry (0 when empty).
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Indexed chunks in original document order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }
}
