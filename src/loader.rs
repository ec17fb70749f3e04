//! Document loading: file path in, ordered page texts out.
//!
//! | Extension | Handling |
//! |-----------|----------|
//! | `.pdf` | `pdf-extract`, one text record per page |
//! | `.txt`, `.md` | UTF-8 text, pages separated by form feed (`\x0c`) |
//!
//! The document id is the SHA-256 of the file bytes, so the same file
//! always loads to the same id and any edit produces a new one.

use std::path::Path;

use docqa_core::models::{content_hash, Document};
use docqa_core::{Error, Result};

/// Page separator recognised in plain-text documents.
pub const FORM_FEED: char = '\u{c}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "txt" | "md" => Ok(DocumentFormat::Text),
            other => Err(Error::Parse(format!(
                "unsupported document format '{}' for {}",
                other,
                path.display()
            ))),
        }
    }
}

/// Load a document from disk.
///
/// # Errors
///
/// - [`Error::NotFound`] if `path` does not exist.
/// - [`Error::Parse`] if the file cannot be read as the expected format or
///   contains no text at all.
pub fn load(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
        _ => Error::Parse(format!("failed to read {}: {}", path.display(), e)),
    })?;

    let format = DocumentFormat::from_path(path)?;
    let document = load_bytes(&bytes, format, &path.display().to_string())?;

    tracing::debug!(
        source = %document.source,
        document_id = %document.id,
        pages = document.pages.len(),
        "document loaded"
    );
    Ok(document)
}

/// [`load`] on the blocking pool; PDF extraction is CPU-bound.
pub async fn load_document(path: &Path) -> Result<Document> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || load(&path))
        .await
        .map_err(|e| Error::Parse(format!("document loading task failed: {}", e)))?
}

/// Parse in-memory document bytes.
pub fn load_bytes(bytes: &[u8], format: DocumentFormat, source: &str) -> Result<Document> {
    let pages = match format {
        DocumentFormat::Pdf => extract_pdf_pages(bytes)?,
        DocumentFormat::Text => split_text_pages(bytes)?,
    };

    let document = Document::from_pages(content_hash(bytes), source, pages);
    if document.is_blank() {
        return Err(Error::Parse(format!("no extractable text in {}", source)));
    }
    Ok(document)
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| Error::Parse(format!("PDF extraction failed: {}", e)))?;
    Ok(pages.into_iter().map(|p| normalize_newlines(&p)).collect())
}

fn split_text_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Parse(format!("text document is not valid UTF-8: {}", e)))?;
    let normalized = normalize_newlines(text);
    let body = normalized.strip_suffix(FORM_FEED).unwrap_or(&normalized);
    Ok(body.split(FORM_FEED).map(|p| p.to_string()).collect())
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}
