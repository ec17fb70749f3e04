//! In-process embeddings via fastembed (ONNX Runtime, bundled).
//!
//! The model is downloaded and loaded on the first batch, then kept for
//! the life of the embedder. Inference runs on the blocking pool.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use docqa_core::embedding::Embedder;
use docqa_core::{Error, Result};

use crate::config::EmbeddingConfig;

pub struct LocalEmbedder {
    model_name: String,
    model: fastembed::EmbeddingModel,
    batch_size: usize,
    engine: Arc<Mutex<Option<fastembed::TextEmbedding>>>,
}

impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config.model_name();
        let model = fastembed_model(&model_name)?;
        Ok(Self {
            model_name,
            model,
            batch_size: config.batch_size,
            engine: Arc::new(Mutex::new(None)),
        })
    }
}

fn fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        other => Err(Error::Config(format!(
            "Unknown local embedding model: '{}'. Supported: all-minilm-l6-v2, \
             bge-small-en-v1.5, bge-base-en-v1.5, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base",
            other
        ))),
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let engine = Arc::clone(&self.engine);
        let model = self.model.clone();
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = engine
                .lock()
                .map_err(|_| Error::Backend("local embedding model lock poisoned".into()))?;
            if guard.is_none() {
                tracing::info!(?model, "loading local embedding model");
                let loaded = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(model).with_show_download_progress(true),
                )
                .map_err(|e| {
                    Error::Backend(format!("failed to initialize local embedding model: {}", e))
                })?;
                *guard = Some(loaded);
            }
            let engine = guard
                .as_mut()
                .ok_or_else(|| Error::Backend("local embedding model not loaded".into()))?;
            engine
                .embed(texts, Some(batch_size))
                .map_err(|e| Error::Backend(format!("local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| Error::Backend(format!("local embedding task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_is_config_error() {
        let config = EmbeddingConfig {
            provider: "local".into(),
            model: Some("word2vec".into()),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(LocalEmbedder::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_default_local_model() {
        let config = EmbeddingConfig {
            provider: "local".into(),
            ..EmbeddingConfig::default()
        };
        let embedder = LocalEmbedder::new(&config).unwrap();
        assert_eq!(embedder.model_name(), "all-minilm-l6-v2");
    }
}
