//! Data types for documents, chunks, indexed vectors, and answers.

use serde::{Deserialize, Serialize};

/// A source document. `id` is the source file name and must be unique
/// within one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
}

impl Document {
    /// Create a document from an id and its text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }
}

/// A window of a [`Document`]'s text, the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// `{document_id}_chunk{ordinal}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// 1-based position of the chunk within its document.
    pub ordinal: usize,
}

impl Chunk {
    /// Derive the chunk id for a document and 1-based ordinal.
    pub fn make_id(document_id: &str, ordinal: usize) -> String {
        format!("{document_id}_chunk{ordinal}")
    }
}

/// The unit persisted inside a vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedVector {
    /// The chunk id this vector was produced from.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// The embedding of `text`.
    pub embedding: Vec<f32>,
}

/// An [`IndexedVector`] returned by a query, paired with its distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredVector {
    /// The chunk id.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// Cosine distance to the query (lower is more similar).
    pub distance: f32,
}

/// Chunk texts ranked most-similar-first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrievalResult {
    /// The ranked chunk texts.
    pub chunks: Vec<String>,
}

impl RetrievalResult {
    /// Number of retrieved chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterate over the chunk texts in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(String::as_str)
    }

    /// Consume the result, returning the chunk texts.
    pub fn into_chunks(self) -> Vec<String> {
        self.chunks
    }
}

/// A generated answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    /// The completion text, unmodified.
    pub text: String,
}

/// Summary of a completed ingestion run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestionReport {
    /// Number of documents handed to the pipeline.
    pub documents_loaded: usize,
    /// Number of chunk vectors upserted into the index.
    pub chunks_indexed: usize,
}
