//! Session: owner of the pipeline lifecycle.
//!
//! ```text
//! Uninitialized ──initialize──▶ Building ──ok──▶ Ready ──changed──▶ Building
//!                                  │
//!                                  └──err──▶ Failed
//! ```
//!
//! A session holds at most one [`Pipeline`]. [`Session::ensure_ready`]
//! rebuilds it whenever the [`Fingerprint`] of the configuration and the
//! document on disk no longer matches the one it was built from, so a
//! stale index is never queried against a new document or credential.
//!
//! Building borrows the session mutably. If the build future is dropped
//! before it finishes, the state stays [`SessionState::Building`]:
//! [`Session::answer`] refuses with [`Error::NotReady`] and the next
//! [`Session::ensure_ready`] starts over.

use std::sync::Arc;

use docqa_core::chunk::ChunkParams;
use docqa_core::embedding::{Embedder, Metric};
use docqa_core::generation::Generator;
use docqa_core::models::content_hash;
use docqa_core::prompt::PromptTemplate;
use docqa_core::{Error, Result};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::generation::create_generator;
use crate::pipeline::Pipeline;

/// Creates backends for a build.
pub trait BackendFactory: Send + Sync {
    fn embedder(&self, config: &Config) -> Result<Arc<dyn Embedder>>;
    fn generator(&self, config: &Config) -> Result<Arc<dyn Generator>>;
}

/// Backends selected by the `[embedding]` and `[generation]` config sections.
pub struct ConfigBackendFactory;

impl BackendFactory for ConfigBackendFactory {
    fn embedder(&self, config: &Config) -> Result<Arc<dyn Embedder>> {
        create_embedder(config)
    }

    fn generator(&self, config: &Config) -> Result<Arc<dyn Generator>> {
        create_generator(config)
    }
}

/// Everything a built pipeline depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub document_hash: String,
    /// Hash of the resolved credential, never the credential itself.
    pub credential_hash: Option<String>,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    pub generation_provider: String,
    pub generation_model: String,
    pub generation_url: String,
    pub chunking: ChunkParams,
    pub metric: Metric,
    pub top_k: usize,
    pub template: Option<PromptTemplate>,
}

impl Fingerprint {
    pub fn from_config(config: &Config, document_hash: impl Into<String>) -> Self {
        Self {
            document_hash: document_hash.into(),
            credential_hash: config.credentials.resolve().map(|k| k.fingerprint()),
            embedding_provider: config.embedding.provider.clone(),
            embedding_model: config.embedding.model_name(),
            embedding_url: config.embedding.base_url(),
            generation_provider: config.generation.provider.clone(),
            generation_model: config.generation.model_name(),
            generation_url: config.generation.base_url(),
            chunking: config.chunking.params(),
            metric: config.retrieval.metric,
            top_k: config.retrieval.top_k,
            template: config.prompt.template().ok(),
        }
    }

    /// Hash the document currently on disk and combine it with `config`.
    pub async fn compute(config: &Config) -> Result<Self> {
        let path = config.document_path()?;
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::Parse(format!("failed to read {}: {}", path.display(), e)),
        })?;
        Ok(Self::from_config(config, content_hash(&bytes)))
    }
}

pub enum SessionState {
    Uninitialized,
    Building,
    Ready(Arc<Pipeline>),
    Failed(Error),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Building => "building",
            SessionState::Ready(_) => "ready",
            SessionState::Failed(_) => "failed",
        }
    }
}

pub struct Session {
    factory: Arc<dyn BackendFactory>,
    state: SessionState,
    fingerprint: Option<Fingerprint>,
    build_count: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_factory(Arc::new(ConfigBackendFactory))
    }

    pub fn with_factory(factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            factory,
            state: SessionState::Uninitialized,
            fingerprint: None,
            build_count: 0,
        }
    }

    /// Discard any current pipeline and build a new one.
    ///
    /// On failure the session is left [`SessionState::Failed`] with the
    /// error, and the error is returned.
    pub async fn initialize(&mut self, config: &Config) -> Result<Arc<Pipeline>> {
        self.state = SessionState::Building;
        self.fingerprint = None;

        let result = self.build(config).await;
        self.build_count += 1;

        match result {
            Ok(pipeline) => {
                let pipeline = Arc::new(pipeline);
                self.fingerprint = Some(Fingerprint::from_config(
                    config,
                    pipeline.build_info().document_id.clone(),
                ));
                self.state = SessionState::Ready(Arc::clone(&pipeline));
                Ok(pipeline)
            }
            Err(e) => {
                tracing::warn!(kind = e.kind().as_str(), error = %e, "build failed");
                self.state = SessionState::Failed(e.clone());
                Err(e)
            }
        }
    }

    async fn build(&self, config: &Config) -> Result<Pipeline> {
        config.validate()?;
        let embedder = self.factory.embedder(config)?;
        let generator = self.factory.generator(config)?;
        Pipeline::initialize_with(config, embedder, generator).await
    }

    /// Return the current pipeline if it still matches `config` and the
    /// document on disk, rebuilding otherwise.
    pub async fn ensure_ready(&mut self, config: &Config) -> Result<Arc<Pipeline>> {
        if let SessionState::Ready(pipeline) = &self.state {
            let pipeline = Arc::clone(pipeline);
            match Fingerprint::compute(config).await {
                Ok(wanted) if self.fingerprint.as_ref() == Some(&wanted) => return Ok(pipeline),
                Ok(_) => tracing::info!("document or configuration changed, rebuilding"),
                Err(e) => tracing::debug!(error = %e, "cannot fingerprint document, rebuilding"),
            }
        }
        self.initialize(config).await
    }

    /// Answer with the Ready pipeline.
    ///
    /// A failed answer leaves the session Ready.
    pub async fn answer(&self, question: &str) -> Result<String> {
        match &self.state {
            SessionState::Ready(pipeline) => pipeline.answer(question).await,
            other => Err(Error::NotReady(format!(
                "no ready pipeline (session is {})",
                other.name()
            ))),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn pipeline(&self) -> Option<Arc<Pipeline>> {
        match &self.state {
            SessionState::Ready(pipeline) => Some(Arc::clone(pipeline)),
            _ => None,
        }
    }

    /// Build attempts that ran to completion, successful or not.
    pub fn build_count(&self) -> u64 {
        self.build_count
    }
}
