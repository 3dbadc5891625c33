//! Question → ranked chunk texts.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::RagConfig;
use crate::document::{RetrievalResult, ScoredVector};
use crate::embedding::EmbeddingClient;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Retrieves the chunks most similar to a question.
///
/// The question is embedded with the same [`EmbeddingClient`] that produced
/// the indexed vectors, and the index is queried by that embedding. The
/// service never writes to the index.
pub struct RetrievalService {
    embedding_client: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    n_results: usize,
}

impl RetrievalService {
    /// Create a service returning at most `n_results` chunks per question.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if `n_results == 0`.
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        n_results: usize,
    ) -> Result<Self> {
        check_n_results(n_results)?;
        Ok(Self { embedding_client, index, n_results })
    }

    /// Create a service using `config.n_results`.
    pub fn from_config(
        embedding_client: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        config: &RagConfig,
    ) -> Result<Self> {
        Self::new(embedding_client, index, config.n_results)
    }

    /// The default number of chunks returned by [`retrieve`](Self::retrieve).
    pub fn n_results(&self) -> usize {
        self.n_results
    }

    /// Retrieve the configured number of chunk texts, most similar first.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        self.retrieve_n(question, self.n_results).await
    }

    /// Retrieve at most `n_results` chunk texts, most similar first.
    ///
    /// An empty index yields an empty result, not an error.
    pub async fn retrieve_n(&self, question: &str, n_results: usize) -> Result<RetrievalResult> {
        let scored = self.retrieve_scored(question, n_results).await?;
        Ok(RetrievalResult { chunks: scored.into_iter().map(|s| s.text).collect() })
    }

    /// Like [`retrieve_n`](Self::retrieve_n) but keeps chunk ids and distances.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if `n_results == 0`, and propagates
    /// embedding and index failures unchanged.
    pub async fn retrieve_scored(
        &self,
        question: &str,
        n_results: usize,
    ) -> Result<Vec<ScoredVector>> {
        check_n_results(n_results)?;

        let embedding = self.embedding_client.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
            e
        })?;

        let ranked = self.index.query(&[embedding], n_results).await.map_err(|e| {
            error!(error = %e, "vector index query failed");
            e
        })?;

        let results: Vec<ScoredVector> = ranked.into_iter().flatten().take(n_results).collect();
        debug!(n_results, result_count = results.len(), "retrieval completed");
        Ok(results)
    }
}

fn check_n_results(n_results: usize) -> Result<()> {
    if n_results == 0 {
        return Err(RagError::InvalidConfig("n_results must be greater than zero".to_string()));
    }
    Ok(())
}
