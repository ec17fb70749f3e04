//! TOML configuration.
//!
//! Every section is optional; missing fields fall back to the defaults
//! below. [`load_config`] parses and validates in one step, and
//! [`Config::validate`] is re-run by the pipeline before any backend is
//! touched, so programmatically built configs get the same checks.
//!
//! ```toml
//! [document]
//! path = "./data/weekly-farm-info-28.pdf"
//!
//! [chunking]
//! chunk_size = 1000
//! overlap = 100
//!
//! [retrieval]
//! top_k = 4
//! metric = "cosine"
//!
//! [embedding]
//! provider = "ollama"          # ollama | openai | local
//! model = "nomic-embed-text"
//!
//! [generation]
//! provider = "ollama"          # ollama | openai
//! model = "gemma3"
//!
//! [prompt]
//! preset = "korean"            # optional; language/fallback override it
//!
//! [credentials]
//! api_key_env = "OPENAI_API_KEY"
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use docqa_core::chunk::{ChunkParams, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use docqa_core::embedding::Metric;
use docqa_core::models::content_hash;
use docqa_core::prompt::PromptTemplate;
use docqa_core::{Error, Result};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DocumentConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn params(&self) -> ChunkParams {
        ChunkParams::new(self.chunk_size, self.overlap)
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub metric: Metric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            metric: Metric::default(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_embedding_retries(),
            timeout_secs: default_embedding_timeout(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

impl EmbeddingConfig {
    /// Configured model, or the provider's default.
    pub fn model_name(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        match self.provider.as_str() {
            "openai" => "text-embedding-3-small",
            "local" => "all-minilm-l6-v2",
            _ => "nomic-embed-text",
        }
        .to_string()
    }

    /// Configured base URL, or the provider's default.
    pub fn base_url(&self) -> String {
        base_url_for(&self.provider, self.url.as_deref())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Retries on rate limiting only. Off by default: generation calls cost money.
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            max_retries: 0,
            timeout_secs: default_generation_timeout(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

impl GenerationConfig {
    pub fn model_name(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        match self.provider.as_str() {
            "openai" => "gpt-4o-mini",
            _ => "gemma3",
        }
        .to_string()
    }

    pub fn base_url(&self) -> String {
        base_url_for(&self.provider, self.url.as_deref())
    }
}

fn base_url_for(provider: &str, url: Option<&str>) -> String {
    let url = url.unwrap_or(match provider {
        "openai" => DEFAULT_OPENAI_URL,
        _ => DEFAULT_OLLAMA_URL,
    });
    url.trim_end_matches('/').to_string()
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_retries() -> u32 {
    5
}
fn default_embedding_timeout() -> u64 {
    30
}
fn default_generation_timeout() -> u64 {
    120
}
fn default_retry_base_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptConfig {
    /// `"english"` (default) or `"korean"`.
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub fallback: Option<String>,
}

impl PromptConfig {
    pub fn template(&self) -> Result<PromptTemplate> {
        let mut template = match self.preset.as_deref() {
            None | Some("english") => PromptTemplate::default(),
            Some("korean") => PromptTemplate::korean(),
            Some(other) => {
                return Err(Error::Config(format!(
                    "Unknown prompt preset: '{}'. Must be english or korean.",
                    other
                )))
            }
        };
        if let Some(language) = &self.language {
            template.language = language.clone();
        }
        if let Some(fallback) = &self.fallback {
            template.fallback = fallback.clone();
        }
        Ok(template)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsConfig {
    /// Inline key. Prefer `api_key_env` so the key stays out of the file.
    #[serde(default)]
    pub api_key: Option<ApiKey>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl CredentialsConfig {
    /// The inline key, else the non-empty value of `api_key_env`.
    pub fn resolve(&self) -> Option<ApiKey> {
        if let Some(key) = &self.api_key {
            return Some(key.clone());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(ApiKey::new)
    }

    /// [`resolve`](Self::resolve), or a [`Error::Config`] naming where the key was looked for.
    pub fn require(&self) -> Result<ApiKey> {
        self.resolve().ok_or_else(|| {
            Error::Config(format!(
                "missing credentials: set credentials.api_key or the {} environment variable",
                self.api_key_env
            ))
        })
    }
}

/// An API credential. Never printed: `Debug` and `Display` are redacted.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// SHA-256 of the key, for change detection without keeping the key around.
    pub fn fingerprint(&self) -> String {
        content_hash(self.0.as_bytes())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl Config {
    /// Replace the document path (CLI `--document`).
    pub fn with_document(mut self, path: impl Into<PathBuf>) -> Self {
        self.document.path = Some(path.into());
        self
    }

    pub fn document_path(&self) -> Result<&Path> {
        self.document
            .path
            .as_deref()
            .ok_or_else(|| Error::Config("document.path is required".to_string()))
    }

    /// Check everything that can be checked without I/O or network.
    pub fn validate(&self) -> Result<()> {
        self.chunking.params().validate()?;

        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be >= 1".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::Config("embedding.batch_size must be >= 1".to_string()));
        }

        match self.embedding.provider.as_str() {
            "ollama" | "openai" => {}
            "local" if cfg!(feature = "local-embeddings-fastembed") => {}
            "local" => return Err(Error::Config(LOCAL_EMBEDDINGS_DISABLED.to_string())),
            other => {
                return Err(Error::Config(format!(
                    "Unknown embedding provider: '{}'. Must be ollama, openai, or local.",
                    other
                )))
            }
        }
        match self.generation.provider.as_str() {
            "ollama" | "openai" => {}
            other => {
                return Err(Error::Config(format!(
                    "Unknown generation provider: '{}'. Must be ollama or openai.",
                    other
                )))
            }
        }

        if self.embedding.provider == "openai" || self.generation.provider == "openai" {
            self.credentials.require()?;
        }

        self.prompt.template()?;
        Ok(())
    }
}

pub(crate) const LOCAL_EMBEDDINGS_DISABLED: &str =
    "Local embedding provider requires --features local-embeddings-fastembed";

/// Read, parse, and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

    config.validate()?;
    Ok(config)
}
