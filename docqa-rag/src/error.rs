//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur in ingestion, retrieval, and answer synthesis.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration value violates its invariant.
    ///
    /// Raised before any chunking, embedding, or index access happens.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The embedding capability failed (transport, auth, rate limit, bad response).
    #[error("Embedding unavailable ({provider}): {message}")]
    EmbeddingUnavailable {
        /// The embedding client that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An upsert or query against the vector index failed.
    #[error("Vector index unavailable ({backend}): {message}")]
    IndexUnavailable {
        /// The index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The language-generation capability failed.
    #[error("Generation failed ({provider}): {message}")]
    GenerationFailure {
        /// The language model that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An ingestion run stopped before every chunk was indexed.
    ///
    /// `failed_chunk_ids` lists the chunks whose embedding or upsert failed.
    /// `unindexed_chunk_ids` lists every chunk of the run that was not written
    /// to the index, including the failed ones.
    #[error(
        "Ingestion aborted: {} chunk(s) failed, {} chunk(s) not indexed: {source}",
        .failed_chunk_ids.len(),
        .unindexed_chunk_ids.len()
    )]
    IngestionAborted {
        /// Chunks whose embedding or upsert failed.
        failed_chunk_ids: Vec<String>,
        /// Every chunk of the run missing from the index.
        unindexed_chunk_ids: Vec<String>,
        /// The first capability error that caused the abort.
        #[source]
        source: Box<RagError>,
    },

    /// Source documents could not be enumerated or read.
    #[error("Document source error ({path}): {message}")]
    DocumentSource {
        /// The file or directory involved.
        path: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    pub(crate) fn embedding(provider: &str, message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable { provider: provider.to_string(), message: message.into() }
    }

    pub(crate) fn index(backend: &str, message: impl Into<String>) -> Self {
        Self::IndexUnavailable { backend: backend.to_string(), message: message.into() }
    }

    pub(crate) fn generation(provider: &str, message: impl Into<String>) -> Self {
        Self::GenerationFailure { provider: provider.to_string(), message: message.into() }
    }
}

/// A convenience result type for docqa operations.
pub type Result<T> = std::result::Result<T, RagError>;
