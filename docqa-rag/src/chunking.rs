//! Fixed-size document chunking.
//!
//! Text is cut into windows of `chunk_size` characters, each window starting
//! `chunk_size - chunk_overlap` characters after the previous one. Offsets are
//! counted in Unicode scalar values, so a multibyte character is never split.
//! Windows keep being emitted until a start passes the end of the text, so
//! with overlap several trailing windows can be shorter than `chunk_size`.
//! There is no sentence or token awareness.

use crate::config::{RagConfig, validate_chunking};
use crate::document::{Chunk, Document};
use crate::error::Result;

/// Split `text` into overlapping windows.
///
/// Every window starting at or before `len - chunk_size` is full; the ones
/// after it are shorter (more than one when the overlap exceeds the
/// remainder). Empty text yields no windows.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfig`](crate::RagError::InvalidConfig) if
/// `chunk_size == 0` or `chunk_overlap >= chunk_size`.
///
/// # Example
///
/// ```
/// use docqa_rag::split_text;
///
/// let chunks = split_text("0123456789ABCDEFGHIJ", 10, 2).unwrap();
/// assert_eq!(chunks, ["0123456789", "89ABCDEFGH", "GHIJ"]);
/// ```
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>> {
    validate_chunking(chunk_size, chunk_overlap)?;
    Ok(split_validated(text, chunk_size, chunk_overlap))
}

fn split_validated(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every character boundary, plus the end of the text.
    let boundaries: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_count = boundaries.len() - 1;
    let step = chunk_size - chunk_overlap;

    let mut chunks = Vec::with_capacity(char_count.div_ceil(step));
    let mut start = 0;
    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        start += step;
    }
    chunks
}

/// Splits documents into fixed-size [`Chunk`]s with configurable overlap.
///
/// Chunk IDs are generated as `{document_id}_chunk{ordinal}` with 1-based
/// ordinals, so re-chunking an unchanged document reproduces the same ids.
///
/// # Example
///
/// ```
/// use docqa_rag::{Document, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(10, 2).unwrap();
/// let chunks = chunker.chunk(&Document::new("a.txt", "0123456789ABCDEFGHIJ"));
/// assert_eq!(chunks[2].id, "a.txt_chunk3");
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`](crate::RagError::InvalidConfig) if
    /// the overlap is not smaller than the size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the chunking fields of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        split_validated(&document.text, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let ordinal = i + 1;
                Chunk {
                    id: Chunk::make_id(&document.id, ordinal),
                    text,
                    document_id: document.id.clone(),
                    ordinal,
                }
            })
            .collect()
    }
}
