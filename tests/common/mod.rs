//! Deterministic in-process backends shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docqa::config::Config;
use docqa::session::BackendFactory;
use docqa_core::embedding::Embedder;
use docqa_core::generation::Generator;
use docqa_core::{Error, Result};

pub const PAGE_ONE: &str = "Weekly farm information bulletin. Weather outlook: \
scattered showers are expected across the southern provinces on Tuesday.";

pub const PAGE_TWO: &str = "Crop protection notes. The weekly pest alert for week 28 \
recommends inspecting rice paddies for brown planthopper. Drain standing water where possible.";

pub const PAGE_THREE: &str = "Market prices for soybeans remained stable. The livestock \
vaccination schedule follows in the next issue.";

pub const PEST_QUESTION: &str = "What pest should be inspected in week 28?";

pub const OFF_TOPIC_QUESTION: &str = "Who won the 1998 football world cup final?";

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "be", "by", "for", "from", "how", "in", "is", "it", "of", "on",
    "or", "should", "the", "to", "was", "what", "when", "where", "which", "who", "why", "with",
];

const DIMS: usize = 128;

/// Lowercased alphanumeric tokens.
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn content_tokens(text: &str) -> Vec<String> {
    tokens(text)
        .into_iter()
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Hashed bag-of-words embedder.
pub struct HashEmbedder {
    pub calls: Arc<AtomicUsize>,
    /// When set, every batch sleeps for a long time before answering.
    pub stall: Arc<AtomicBool>,
    /// Calls that fail with this error before the embedder recovers.
    pub failures: Arc<AtomicUsize>,
    pub failure: Option<Error>,
    pub batch_size: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            stall: Arc::new(AtomicBool::new(false)),
            failures: Arc::new(AtomicUsize::new(0)),
            failure: None,
            batch_size: 4,
        }
    }
}

impl HashEmbedder {
    pub fn failing(error: Error, times: usize) -> Self {
        Self {
            failures: Arc::new(AtomicUsize::new(times)),
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; DIMS];
        for token in content_tokens(text) {
            v[(fnv1a(&token) % DIMS as u64) as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-bow"
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stall.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if let Some(error) = &self.failure {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(error.clone());
            }
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Returns vectors whose length grows with each text, to trip the index.
pub struct RaggedEmbedder;

#[async_trait]
impl Embedder for RaggedEmbedder {
    fn model_name(&self) -> &str {
        "ragged"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, _)| vec![1.0; 3 + i])
            .collect())
    }
}

/// Answers with the context sentences that share at least two content
/// words with the question, or with the prompt's fallback sentence.
pub struct ExtractiveGenerator {
    pub calls: Arc<AtomicUsize>,
    pub failures: Arc<AtomicUsize>,
    pub failure: Option<Error>,
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            failures: Arc::new(AtomicUsize::new(0)),
            failure: None,
        }
    }
}

impl ExtractiveGenerator {
    pub fn failing(error: Error, times: usize) -> Self {
        Self {
            failures: Arc::new(AtomicUsize::new(times)),
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn reply(prompt: &str) -> String {
        let fallback = between(prompt, "reply exactly: \"", "\"\n").unwrap_or("");
        let context = between(prompt, "CONTEXT: ", "\n\nQUESTION: ").unwrap_or("");
        let question = prompt
            .split("QUESTION: ")
            .nth(1)
            .unwrap_or("")
            .trim();

        let wanted = content_tokens(question);
        let mut matches: Vec<&str> = Vec::new();
        for sentence in context.split(['.', '\n']) {
            let sentence = sentence.trim();
            if sentence.is_empty() || matches.contains(&sentence) {
                continue;
            }
            let have = content_tokens(sentence);
            let shared = wanted.iter().filter(|t| have.contains(t)).count();
            if shared >= 2 {
                matches.push(sentence);
            }
        }

        if matches.is_empty() {
            fallback.to_string()
        } else {
            matches.join(". ")
        }
    }
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let len = text[from..].find(end)?;
    Some(&text[from..from + len])
}

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn model_name(&self) -> &str {
        "extractive"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(error.clone());
            }
        }
        Ok(Self::reply(prompt))
    }
}

/// Hands out the same fake backends for every build and counts builds.
#[derive(Default)]
pub struct FakeFactory {
    pub embedder: Arc<HashEmbedder>,
    pub generator: Arc<ExtractiveGenerator>,
    pub builds: AtomicUsize,
}

impl BackendFactory for FakeFactory {
    fn embedder(&self, _config: &Config) -> Result<Arc<dyn Embedder>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(self.embedder.clone())
    }

    fn generator(&self, _config: &Config) -> Result<Arc<dyn Generator>> {
        Ok(self.generator.clone())
    }
}

/// Three-page text document, pages separated by form feeds.
pub fn write_farm_document(dir: &Path) -> PathBuf {
    let path = dir.join("weekly-farm-info-28.txt");
    std::fs::write(
        &path,
        format!("{}\x0c{}\x0c{}\n", PAGE_ONE, PAGE_TWO, PAGE_THREE),
    )
    .unwrap();
    path
}

/// Small chunks so the pest sentence sits whole inside at least one of them.
pub fn test_config(document: &Path) -> Config {
    let mut config = Config::default().with_document(document);
    config.chunking.chunk_size = 200;
    config.chunking.overlap = 100;
    config.retrieval.top_k = 8;
    config.embedding.retry_base_ms = 1;
    config.generation.retry_base_ms = 1;
    config
}
