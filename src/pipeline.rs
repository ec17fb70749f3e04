//! The question-answering pipeline.
//!
//! A [`Pipeline`] is the Ready state: an immutable vector index over one
//! document plus the backends used to answer questions against it. It is
//! only ever handed out fully built, so there is no half-initialized
//! pipeline to query.
//!
//! # Build
//!
//! ```text
//! validate config → load document → split → embed (batched, retried) → index
//! ```
//!
//! # Answer
//!
//! ```text
//! embed question → top-k query → assemble prompt → generate
//! ```
//!
//! The generator's reply is returned verbatim.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use docqa_core::chunk;
use docqa_core::embedding::{Embedder, Metric};
use docqa_core::generation::Generator;
use docqa_core::index::VectorIndex;
use docqa_core::models::{Chunk, ScoredChunk};
use docqa_core::prompt::PromptTemplate;
use docqa_core::Result;

use crate::config::Config;
use crate::embedding::{create_embedder, embed_query, embed_texts};
use crate::generation::create_generator;
use crate::loader::load_document;
use crate::retry::{with_retry, RetryPolicy};

/// Identity of one successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    /// Fresh for every build, so a rebuild is observable even when the
    /// document did not change.
    pub build_id: Uuid,
    pub built_at: DateTime<Utc>,
    pub document_id: String,
    pub source: String,
    pub pages: usize,
    pub chunk_count: usize,
    pub dims: usize,
    pub metric: Metric,
    pub embedding_model: String,
    pub generation_model: String,
}

pub struct Pipeline {
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    template: PromptTemplate,
    top_k: usize,
    embedding_retry: RetryPolicy,
    generation_retry: RetryPolicy,
    info: BuildInfo,
}

impl Pipeline {
    /// Build with the backends named in `config`.
    pub async fn initialize(config: &Config) -> Result<Self> {
        config.validate()?;
        let embedder = create_embedder(config)?;
        let generator = create_generator(config)?;
        Self::initialize_with(config, embedder, generator).await
    }

    /// Build with caller-supplied backends.
    ///
    /// The configuration is validated before the document is read or any
    /// backend is called.
    pub async fn initialize_with(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        config.validate()?;
        let template = config.prompt.template()?;
        let params = config.chunking.params();
        let path = config.document_path()?;

        let document = load_document(path).await?;
        tracing::info!(
            source = %document.source,
            pages = document.pages.len(),
            "loaded document"
        );

        let chunks = chunk::split(&document, &params)?;
        tracing::info!(
            chunks = chunks.len(),
            chunk_size = params.chunk_size,
            overlap = params.overlap,
            "split document"
        );

        let embedding_retry = RetryPolicy::for_embedding(&config.embedding);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_texts(embedder.as_ref(), &texts, &embedding_retry).await?;

        let index = VectorIndex::build(chunks, vectors, config.retrieval.metric)?;
        let info = BuildInfo {
            build_id: Uuid::new_v4(),
            built_at: Utc::now(),
            document_id: document.id.clone(),
            source: document.source.clone(),
            pages: document.pages.len(),
            chunk_count: index.len(),
            dims: index.dims(),
            metric: index.metric(),
            embedding_model: embedder.model_name().to_string(),
            generation_model: generator.model_name().to_string(),
        };
        tracing::info!(
            build_id = %info.build_id,
            chunks = info.chunk_count,
            dims = info.dims,
            metric = info.metric.as_str(),
            embedding_model = %info.embedding_model,
            "index built"
        );

        Ok(Self {
            index,
            embedder,
            generator,
            template,
            top_k: config.retrieval.top_k,
            embedding_retry,
            generation_retry: RetryPolicy::for_generation(&config.generation),
            info,
        })
    }

    /// Answer `question` from the indexed document.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let retrieved = self.retrieve(question).await?;
        let prompt = self.template.assemble(&retrieved, question);
        let answer = with_retry(&self.generation_retry, "generation", || {
            self.generator.generate(&prompt)
        })
        .await?;
        tracing::debug!(
            retrieved = retrieved.len(),
            fallback = self.template.is_fallback(&answer),
            "answered question"
        );
        Ok(answer)
    }

    /// The configured top-k chunks for `question`, best first.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        self.search(question, self.top_k).await
    }

    /// The `k` best chunks for `query`, best first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let vector = embed_query(self.embedder.as_ref(), query, &self.embedding_retry).await?;
        self.index.query(&vector, k)
    }

    pub fn build_info(&self) -> &BuildInfo {
        &self.info
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Indexed chunks in document order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.index.chunks()
    }
}
