//! Embedding backends and the batching driver.
//!
//! Concrete [`Embedder`] implementations:
//! - **[`OllamaEmbedder`]**: a local Ollama instance's `/api/embed` endpoint.
//! - **[`OpenAIEmbedder`]**: the OpenAI `/v1/embeddings` endpoint (needs a key).
//! - **`LocalEmbedder`**: in-process fastembed model, behind the
//!   `local-embeddings-fastembed` feature.
//!
//! [`embed_texts`] splits input into backend-sized batches, retries each
//! batch with exponential backoff, and checks that every text got a vector.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use docqa::config::Config;
//! # use docqa::embedding::create_embedder;
//! let config = Config::default(); // provider = "ollama"
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "nomic-embed-text");
//! ```

#[cfg(feature = "local-embeddings-fastembed")]
mod local;

#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalEmbedder;

use async_trait::async_trait;
use std::sync::Arc;

pub use docqa_core::embedding::Embedder;
use docqa_core::{Error, Result};

#[cfg(not(feature = "local-embeddings-fastembed"))]
use crate::config::LOCAL_EMBEDDINGS_DISABLED;
use crate::config::{ApiKey, Config, EmbeddingConfig};
use crate::http::{build_client, post_json};
use crate::retry::{with_retry, RetryPolicy};

/// Embed every text, in order, one vector per text.
///
/// # Errors
///
/// The first batch error that survives the retry budget, or
/// [`Error::Backend`] if a backend returns the wrong number of vectors.
pub async fn embed_texts(
    embedder: &dyn Embedder,
    texts: &[String],
    policy: &RetryPolicy,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = embedder.max_batch_size().max(1);
    let total_batches = texts.len().div_ceil(batch_size);
    let mut vectors = Vec::with_capacity(texts.len());

    for (i, batch) in texts.chunks(batch_size).enumerate() {
        let embedded = with_retry(policy, "embedding batch", || embedder.embed_batch(batch)).await?;
        if embedded.len() != batch.len() {
            return Err(Error::Backend(format!(
                "embedding count mismatch: sent {} texts, got {} vectors",
                batch.len(),
                embedded.len()
            )));
        }
        tracing::debug!(
            model = embedder.model_name(),
            batch = i + 1,
            total_batches,
            "embedded batch"
        );
        vectors.extend(embedded);
    }

    Ok(vectors)
}

/// Embed a single query text.
pub async fn embed_query(
    embedder: &dyn Embedder,
    text: &str,
    policy: &RetryPolicy,
) -> Result<Vec<f32>> {
    let mut vectors = embed_texts(embedder, &[text.to_string()], policy).await?;
    vectors
        .pop()
        .ok_or_else(|| Error::Backend("empty embedding response".to_string()))
}

// ============ Ollama ============

/// Embeddings from a local Ollama instance (`POST {url}/api/embed`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    batch_size: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: config.base_url(),
            model: config.model_name(),
            batch_size: config.batch_size,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/api/embed", self.url);
        let json = post_json(&self.client, &url, None, &body, "Ollama").await?;
        parse_ollama_embeddings(&json)
    }
}

/// Parse `{"embeddings": [[...], ...]}`.
pub fn parse_ollama_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| Error::Backend("invalid Ollama response: missing 'embeddings'".into()))?;

    embeddings.iter().map(parse_vector).collect()
}

// ============ OpenAI ============

/// Embeddings from the OpenAI API (`POST {url}/v1/embeddings`).
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: ApiKey,
    batch_size: usize,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: ApiKey) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: config.base_url(),
            model: config.model_name(),
            api_key,
            batch_size: config.batch_size,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/v1/embeddings", self.url);
        let json = post_json(&self.client, &url, Some(&self.api_key), &body, "OpenAI").await?;
        parse_openai_embeddings(&json)
    }
}

/// Parse `{"data": [{"index": n, "embedding": [...]}, ...]}`, restoring
/// input order from `index`.
pub fn parse_openai_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| Error::Backend("invalid OpenAI response: missing 'data'".into()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| Error::Backend("invalid OpenAI response: missing 'embedding'".into()))?;
        indexed.push((index, parse_vector(embedding)?));
    }
    indexed.sort_by_key(|(index, _)| *index);

    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

fn parse_vector(value: &serde_json::Value) -> Result<Vec<f32>> {
    value
        .as_array()
        .ok_or_else(|| Error::Backend("invalid embedding: not an array".into()))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| Error::Backend("invalid embedding value".into()))
        })
        .collect()
}

/// Create the configured [`Embedder`].
///
/// | `embedding.provider` | Backend |
/// |----------------------|---------|
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"local"` | `LocalEmbedder` (needs `--features local-embeddings-fastembed`) |
///
/// # Errors
///
/// [`Error::Config`] for an unknown provider, a missing credential, or a
/// provider whose feature is not compiled in.
pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedding = &config.embedding;
    match embedding.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(embedding)?)),
        "openai" => {
            let key = config.credentials.require()?;
            Ok(Arc::new(OpenAIEmbedder::new(embedding, key)?))
        }
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::new(embedding)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => Err(Error::Config(LOCAL_EMBEDDINGS_DISABLED.to_string())),
        other => Err(Error::Config(format!(
            "Unknown embedding provider: '{}'. Must be ollama, openai, or local.",
            other
        ))),
    }
}
