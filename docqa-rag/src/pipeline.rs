//! Ingestion pipeline: chunk → embed → upsert.
//!
//! The [`IngestionPipeline`] turns a batch of [`Document`]s into indexed
//! chunk vectors. Chunk ids are derived from document ids, so running the
//! pipeline again over an unchanged corpus replaces every vector with an
//! identical one instead of adding duplicates.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{IngestionPipeline, RagConfig, InMemoryVectorIndex};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_client(Arc::new(my_embedder))
//!     .index(Arc::new(InMemoryVectorIndex::new()))
//!     .build()?;
//!
//! let report = pipeline.ingest(&documents).await?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::chunking::FixedSizeChunker;
use crate::config::RagConfig;
use crate::document::{Chunk, Document, IndexedVector, IngestionReport};
use crate::embedding::EmbeddingClient;
use crate::error::{RagError, Result};
use crate::events::{IngestionEvent, IngestionObserver, NoopObserver};
use crate::index::{VectorIndex, embedding_defect};

/// Failure while indexing one document: the chunk ids that failed and the
/// first error seen.
type DocumentFailure = (Vec<String>, RagError);

/// The ingestion orchestrator.
///
/// Documents are chunked up front, then indexed one document at a time:
/// every chunk of the document is embedded (up to `embed_concurrency`
/// requests in flight, results kept in chunk order), and the document's
/// vectors are upserted as one batch.
///
/// A failure aborts the run with [`RagError::IngestionAborted`]. Documents
/// indexed before the failure stay in the index; nothing of the failing
/// document is written, and no placeholder vector is ever stored.
pub struct IngestionPipeline {
    config: RagConfig,
    chunker: FixedSizeChunker,
    embedding_client: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    observer: Arc<dyn IngestionObserver>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector index.
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Ingest a batch of documents.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidConfig`] if two documents share an id (checked
    ///   before anything is embedded).
    /// - [`RagError::IngestionAborted`] if an embedding or upsert fails; the
    ///   error lists the failed chunk ids and every chunk id left unindexed.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestionReport> {
        let mut seen = HashSet::with_capacity(documents.len());
        for document in documents {
            if !seen.insert(document.id.as_str()) {
                return Err(RagError::InvalidConfig(format!(
                    "duplicate document id '{}'",
                    document.id
                )));
            }
        }

        info!(documents = documents.len(), "starting ingestion");
        self.observer.on_event(&IngestionEvent::DocumentsLoaded { count: documents.len() });

        let chunked: Vec<(&Document, Vec<Chunk>)> = documents
            .iter()
            .map(|document| {
                let chunks = self.chunker.chunk(document);
                debug!(document.id = %document.id, chunk_count = chunks.len(), "chunked document");
                self.observer.on_event(&IngestionEvent::DocumentChunked {
                    document_id: document.id.clone(),
                    chunks: chunks.len(),
                });
                (document, chunks)
            })
            .collect();

        let mut chunks_indexed = 0;
        for (position, (document, chunks)) in chunked.iter().enumerate() {
            match self.index_document(chunks).await {
                Ok(count) => {
                    chunks_indexed += count;
                    info!(document.id = %document.id, chunk_count = count, "indexed document");
                    self.observer.on_event(&IngestionEvent::DocumentIndexed {
                        document_id: document.id.clone(),
                        chunks: count,
                    });
                }
                Err((failed_chunk_ids, source)) => {
                    let unindexed_chunk_ids: Vec<String> = chunked[position..]
                        .iter()
                        .flat_map(|(_, chunks)| chunks.iter().map(|c| c.id.clone()))
                        .collect();
                    error!(
                        document.id = %document.id,
                        failed = failed_chunk_ids.len(),
                        unindexed = unindexed_chunk_ids.len(),
                        error = %source,
                        "ingestion aborted"
                    );
                    return Err(RagError::IngestionAborted {
                        failed_chunk_ids,
                        unindexed_chunk_ids,
                        source: Box::new(source),
                    });
                }
            }
        }

        let report = IngestionReport { documents_loaded: documents.len(), chunks_indexed };
        info!(
            documents_loaded = report.documents_loaded,
            chunks_indexed = report.chunks_indexed,
            "ingestion completed"
        );
        self.observer.on_event(&IngestionEvent::Completed(report));
        Ok(report)
    }

    /// Embed and upsert the chunks of one document. Returns the number of
    /// vectors written.
    async fn index_document(
        &self,
        chunks: &[Chunk],
    ) -> std::result::Result<usize, DocumentFailure> {
        if chunks.is_empty() {
            return Ok(0);
        }

        // `buffered` yields results in input order, so result i belongs to chunk i
        // regardless of which request finishes first.
        let embeddings: Vec<Result<Vec<f32>>> =
            stream::iter(chunks.iter().map(|c| self.embed_chunk(c)))
                .buffered(self.config.embed_concurrency)
                .collect()
                .await;

        let mut vectors = Vec::with_capacity(chunks.len());
        let mut failed = Vec::new();
        let mut first_error = None;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            match embedding {
                Ok(embedding) => vectors.push(IndexedVector {
                    id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    embedding,
                }),
                Err(e) => {
                    failed.push(chunk.id.clone());
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err((failed, e));
        }

        self.index.upsert(&vectors).await.map_err(|e| {
            error!(chunk_count = vectors.len(), error = %e, "upsert failed during ingestion");
            (chunks.iter().map(|c| c.id.clone()).collect(), e)
        })?;

        Ok(vectors.len())
    }

    /// Embed one chunk, retrying per the configured policy.
    async fn embed_chunk(&self, chunk: &Chunk) -> Result<Vec<f32>> {
        let policy = &self.config.retry;
        let mut attempt = 1;
        loop {
            let result = self.embedding_client.embed(&chunk.text).await.and_then(|embedding| {
                match embedding_defect(&embedding) {
                    Some(defect) => Err(RagError::embedding(
                        self.embedding_client.name(),
                        format!("embedding returned for chunk '{}' {defect}", chunk.id),
                    )),
                    None => Ok(embedding),
                }
            });

            match result {
                Ok(embedding) => {
                    self.observer
                        .on_event(&IngestionEvent::ChunkEmbedded { chunk_id: chunk.id.clone() });
                    return Ok(embedding);
                }
                Err(e) if attempt < policy.max_attempts => {
                    let delay = policy.backoff_for(attempt);
                    warn!(
                        chunk.id = %chunk.id,
                        attempt,
                        ?delay,
                        error = %e,
                        "embedding failed, retrying"
                    );
                    self.observer.on_event(&IngestionEvent::EmbeddingRetry {
                        chunk_id: chunk.id.clone(),
                        attempt,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        chunk.id = %chunk.id,
                        attempt,
                        error = %e,
                        "embedding failed during ingestion"
                    );
                    return Err(e);
                }
            }
        }
    }
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// The embedding client and index are required. The configuration defaults
/// to [`RagConfig::default()`] and the observer to [`NoopObserver`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = IngestionPipeline::builder()
///     .config(config)
///     .embedding_client(Arc::new(embedder))
///     .index(Arc::new(index))
///     .observer(Arc::new(|event: &IngestionEvent| tracing::info!(?event)))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    embedding_client: Option<Arc<dyn EmbeddingClient>>,
    index: Option<Arc<dyn VectorIndex>>,
    observer: Option<Arc<dyn IngestionObserver>>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding client.
    pub fn embedding_client(mut self, client: Arc<dyn EmbeddingClient>) -> Self {
        self.embedding_client = Some(client);
        self
    }

    /// Set the vector index.
    pub fn index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set an observer for progress events.
    pub fn observer(mut self, observer: Arc<dyn IngestionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Build the [`IngestionPipeline`], validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if a required field is missing or
    /// the configuration is invalid.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let chunker = FixedSizeChunker::from_config(&config)?;
        let embedding_client = self
            .embedding_client
            .ok_or_else(|| RagError::InvalidConfig("embedding_client is required".to_string()))?;
        let index =
            self.index.ok_or_else(|| RagError::InvalidConfig("index is required".to_string()))?;
        let observer = self.observer.unwrap_or_else(|| Arc::new(NoopObserver));

        Ok(IngestionPipeline { config, chunker, embedding_client, index, observer })
    }
}
