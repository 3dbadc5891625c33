//! In-memory vector index using cosine distance.
//!
//! This module provides [`InMemoryVectorIndex`], a vector index backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for
//! development, testing, and offline runs. Nothing is persisted.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{IndexedVector, ScoredVector};
use crate::error::Result;
use crate::index::{VectorIndex, check_dimensions, check_query, rank};

const BACKEND: &str = "InMemory";

#[derive(Debug, Default)]
struct Inner {
    dimensions: Option<usize>,
    vectors: HashMap<String, IndexedVector>,
}

/// An in-memory vector index using cosine distance for search.
///
/// Vectors are keyed by chunk id. Upserts take the write lock for the whole
/// batch, so a batch is applied all-or-nothing and concurrent writes to the
/// same id resolve last-writer-wins.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// index.upsert(&vectors).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    inner: RwLock<Inner>,
}

impl InMemoryVectorIndex {
    /// Create a new empty in-memory vector index.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, vectors: &[IndexedVector]) -> Result<()> {
        let mut inner = self.inner.write().await;
        let dimensions = check_dimensions(
            BACKEND,
            inner.dimensions,
            vectors.iter().map(|v| (v.id.as_str(), v.embedding.as_slice())),
        )?;
        inner.dimensions = dimensions;
        for vector in vectors {
            inner.vectors.insert(vector.id.clone(), vector.clone());
        }
        debug!(backend = BACKEND, upserted = vectors.len(), total = inner.vectors.len(), "upsert");
        Ok(())
    }

    async fn query(
        &self,
        embeddings: &[Vec<f32>],
        n_results: usize,
    ) -> Result<Vec<Vec<ScoredVector>>> {
        let inner = self.inner.read().await;
        embeddings
            .iter()
            .map(|embedding| {
                check_query(BACKEND, inner.dimensions, embedding)?;
                Ok(rank(inner.vectors.values(), embedding, n_results))
            })
            .collect()
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().await.vectors.len())
    }

    async fn get(&self, id: &str) -> Result<Option<IndexedVector>> {
        Ok(self.inner.read().await.vectors.get(id).cloned())
    }
}
