//! Core data models that flow through the retrieval pipeline.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Separator inserted between page texts when a document is flattened.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// A loaded document: an ordered, immutable sequence of pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// SHA-256 hex digest of the source bytes.
    pub id: String,
    /// Where the document was loaded from (usually a file path).
    pub source: String,
    pub pages: Vec<Page>,
}

/// One page of extracted text.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
    /// Id of the owning [`Document`].
    pub document_id: String,
}

/// A bounded, overlapping fragment of a document's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// Deterministic UUID derived from the document id and chunk index.
    pub id: String,
    pub document_id: String,
    /// Position in document order, contiguous from 0.
    pub chunk_index: usize,
    pub text: String,
    /// Character offset of the first char in [`Document::full_text`].
    pub start_offset: usize,
    /// Character offset one past the last char.
    pub end_offset: usize,
    /// First page (1-based) this chunk draws text from.
    pub page_start: u32,
    /// Last page (1-based) this chunk draws text from.
    pub page_end: u32,
    /// SHA-256 of `text`.
    pub hash: String,
}

/// A chunk returned by a vector index query, with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

impl Document {
    /// Build a document from raw page texts, numbering pages from 1.
    pub fn from_pages(
        id: impl Into<String>,
        source: impl Into<String>,
        texts: Vec<String>,
    ) -> Self {
        let id = id.into();
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page {
                number: i as u32 + 1,
                text,
                document_id: id.clone(),
            })
            .collect();
        Self {
            id,
            source: source.into(),
            pages,
        }
    }

    /// Page texts joined with [`PAGE_SEPARATOR`], in page order.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR)
    }

    /// Character ranges `(page_number, start, end)` of each page inside
    /// [`full_text`](Document::full_text). Separators belong to no page.
    pub fn page_spans(&self) -> Vec<(u32, usize, usize)> {
        let sep_len = PAGE_SEPARATOR.chars().count();
        let mut spans = Vec::with_capacity(self.pages.len());
        let mut offset = 0;
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                offset += sep_len;
            }
            let len = page.text.chars().count();
            spans.push((page.number, offset, offset + len));
            offset += len;
        }
        spans
    }

    /// Whether every page is blank.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// SHA-256 hex digest of arbitrary bytes. Used for document ids and chunk hashes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
