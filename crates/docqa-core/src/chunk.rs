//! Sliding-window text chunker.
//!
//! Splits a [`Document`]'s flattened text into overlapping [`Chunk`]s of at
//! most `chunk_size` characters. Sizes are counted in Unicode scalar values,
//! so multi-byte scripts are never cut inside a character.
//!
//! # Algorithm
//!
//! 1. Flatten the document with [`Document::full_text`] (pages joined by
//!    [`PAGE_SEPARATOR`](crate::models::PAGE_SEPARATOR)).
//! 2. Take a window of `chunk_size` characters starting at offset 0.
//! 3. Advance the window by `chunk_size - overlap` characters.
//! 4. Stop after the first window that reaches the end of the text; that
//!    last chunk may be shorter than `chunk_size`.
//!
//! Each chunk records its character offsets and the span of pages it draws
//! from, plus a deterministic UUID (derived from the document id and chunk
//! index) and a SHA-256 of its text.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::{split, ChunkParams};
//! use docqa_core::models::Document;
//!
//! let doc = Document::from_pages("doc-1", "memory", vec!["abcdefghij".into()]);
//! let chunks = split(&doc, &ChunkParams::new(4, 1)).unwrap();
//! let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
//! ```

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{content_hash, Chunk, Document};

/// Default window width, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between adjacent windows, in characters.
pub const DEFAULT_OVERLAP: usize = 100;

/// Window parameters for [`split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkParams {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Reject `chunk_size == 0` and `overlap >= chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be > 0".to_string()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance between the starts of two adjacent windows.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split a document into overlapping chunks.
///
/// # Guarantees
///
/// - Every chunk holds at most `chunk_size` characters.
/// - Adjacent chunks share exactly `overlap` characters.
/// - Indices are contiguous: `0, 1, 2, …, N-1`.
/// - Empty text produces no chunks.
/// - Identical input always yields identical output, ids included.
///
/// # Errors
///
/// [`Error::Config`] if the parameters fail [`ChunkParams::validate`].
pub fn split(document: &Document, params: &ChunkParams) -> Result<Vec<Chunk>> {
    params.validate()?;

    let text = document.full_text();
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;
    if total_chars == 0 {
        return Ok(Vec::new());
    }

    let spans = document.page_spans();
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + params.chunk_size).min(total_chars);
        let piece = &text[boundaries[start]..boundaries[end]];
        let (page_start, page_end) = page_range(&spans, start, end);
        chunks.push(make_chunk(
            &document.id,
            chunks.len(),
            piece,
            start,
            end,
            page_start,
            page_end,
        ));
        if end == total_chars {
            break;
        }
        start += params.stride();
    }

    Ok(chunks)
}

/// Rebuild the flattened text from chunks produced by [`split`] with the
/// given `overlap`. Chunks must be in document order.
pub fn reassemble(chunks: &[Chunk], overlap: usize) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            out.push_str(&chunk.text);
        } else {
            out.extend(chunk.text.chars().skip(overlap));
        }
    }
    out
}

/// Pages overlapping the character range `[start, end)`.
fn page_range(spans: &[(u32, usize, usize)], start: usize, end: usize) -> (u32, u32) {
    let first = spans.first().map(|s| s.0).unwrap_or(1);
    let last = spans.last().map(|s| s.0).unwrap_or(first);
    let page_start = spans
        .iter()
        .find(|(_, _, e)| *e > start)
        .map(|s| s.0)
        .unwrap_or(last);
    let page_end = spans
        .iter()
        .rev()
        .find(|(_, s, _)| *s < end)
        .map(|s| s.0)
        .unwrap_or(first);
    (page_start, page_end.max(page_start))
}

fn make_chunk(
    document_id: &str,
    index: usize,
    text: &str,
    start: usize,
    end: usize,
    page_start: u32,
    page_end: u32,
) -> Chunk {
    let id = Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{}:{}", document_id, index).as_bytes(),
    );

    Chunk {
        id: id.to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        start_offset: start,
        end_offset: end,
        page_start,
        page_end,
        hash: content_hash(text.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pages: &[&str]) -> Document {
        Document::from_pages(
            "doc1",
            "memory",
            pages.iter().map(|p| p.to_string()).collect(),
        )
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = split(&doc(&["abc"]), &ChunkParams::new(0, 0)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        for overlap in [10, 11, 500] {
            let err = split(&doc(&["abc"]), &ChunkParams::new(10, overlap)).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "overlap {}", overlap);
        }
        assert!(ChunkParams::new(10, 9).validate().is_ok());
        assert!(ChunkParams::new(10, 0).validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let p = ChunkParams::default();
        assert_eq!((p.chunk_size, p.overlap), (1000, 100));
        assert_eq!(p.stride(), 900);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(split(&doc(&[""]), &ChunkParams::default()).unwrap().is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split(&doc(&["Hello, world!"]), &ChunkParams::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!((chunks[0].start_offset, chunks[0].end_offset), (0, 13));
    }

    #[test]
    fn test_exact_fit_does_not_emit_trailing_overlap_chunk() {
        let chunks = split(&doc(&["abcdefgh"]), &ChunkParams::new(8, 2)).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_window_sizes_and_overlap() {
        let text: String = (0..95).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let params = ChunkParams::new(20, 5);
        let chunks = split(&doc(&[&text]), &params).unwrap();
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert!(c.text.chars().count() <= 20);
            assert_eq!(c.start_offset, i * 15);
        }
        for pair in chunks.windows(2) {
            let tail: String = pair[0].text.chars().skip(15).collect();
            let head: String = pair[1].text.chars().take(5).collect();
            assert_eq!(tail, head);
        }
        assert_eq!(chunks.last().unwrap().end_offset, 95);
    }

    #[test]
    fn test_multibyte_text_is_split_on_chars() {
        let text = "주간농사정보 제28호: 벼멸구 발생 주의";
        let chunks = split(&doc(&[text]), &ChunkParams::new(5, 2)).unwrap();
        for c in &chunks {
            assert!(c.text.chars().count() <= 5);
        }
        assert_eq!(reassemble(&chunks, 2), text);
    }

    #[test]
    fn test_reassemble_round_trip() {
        let d = doc(&[
            "The weekly pest alert is issued every Monday.",
            "Week 28 recommends inspecting rice paddies for brown planthopper.",
            "Fertilize after the rainy season ends. 비료는 장마 후에.",
        ]);
        let full = d.full_text();
        for (size, overlap) in [(1, 0), (7, 3), (16, 15), (50, 10), (1000, 100)] {
            let chunks = split(&d, &ChunkParams::new(size, overlap)).unwrap();
            assert_eq!(reassemble(&chunks, overlap), full, "size {} overlap {}", size, overlap);
        }
    }

    #[test]
    fn test_page_span_markers() {
        let d = doc(&["aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc"]);
        // full text: 10 a, 2 sep, 10 b, 2 sep, 10 c = 34 chars
        let chunks = split(&d, &ChunkParams::new(12, 0)).unwrap();
        assert_eq!((chunks[0].page_start, chunks[0].page_end), (1, 1));
        assert_eq!((chunks[1].page_start, chunks[1].page_end), (2, 2));
        assert_eq!((chunks[2].page_start, chunks[2].page_end), (3, 3));

        let wide = split(&d, &ChunkParams::new(20, 0)).unwrap();
        assert_eq!((wide[0].page_start, wide[0].page_end), (1, 2));
        assert_eq!((wide[1].page_start, wide[1].page_end), (2, 3));
    }

    #[test]
    fn test_deterministic() {
        let d = doc(&["Alpha beta gamma delta epsilon zeta eta theta"]);
        let c1 = split(&d, &ChunkParams::new(10, 4)).unwrap();
        let c2 = split(&d, &ChunkParams::new(10, 4)).unwrap();
        assert_eq!(c1, c2);
        assert_ne!(c1[0].id, c1[1].id);
    }
}
