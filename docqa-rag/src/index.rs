//! Vector index trait for storing chunk embeddings and querying by similarity.

use async_trait::async_trait;

use crate::document::{IndexedVector, ScoredVector};
use crate::error::{RagError, Result};

/// A storage backend for chunk embeddings with nearest-neighbor search.
///
/// Upserting a vector whose id already exists replaces the stored text and
/// embedding, so re-ingesting an unchanged corpus leaves the index unchanged.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// index.upsert(&vectors).await?;
/// let ranked = index.query(&[query_embedding], 2).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace vectors by id. Each vector must carry an embedding.
    async fn upsert(&self, vectors: &[IndexedVector]) -> Result<()>;

    /// Find the `n_results` nearest stored vectors for each query embedding.
    ///
    /// Returns one list per query, ordered by ascending distance.
    async fn query(
        &self,
        embeddings: &[Vec<f32>],
        n_results: usize,
    ) -> Result<Vec<Vec<ScoredVector>>>;

    /// Number of stored vectors.
    async fn count(&self) -> Result<usize>;

    /// Fetch a stored vector by id.
    async fn get(&self, id: &str) -> Result<Option<IndexedVector>>;
}

/// Cosine distance (`1 - cosine similarity`) between two vectors.
///
/// Returns 1.0 if either vector has zero magnitude.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Score every stored vector against `query` and keep the `n_results` closest.
pub(crate) fn rank<'a>(
    vectors: impl Iterator<Item = &'a IndexedVector>,
    query: &[f32],
    n_results: usize,
) -> Vec<ScoredVector> {
    let mut scored: Vec<ScoredVector> = vectors
        .map(|v| ScoredVector {
            id: v.id.clone(),
            text: v.text.clone(),
            distance: cosine_distance(&v.embedding, query),
        })
        .collect();

    scored.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
    scored.truncate(n_results);
    scored
}

/// Describe why an embedding cannot be stored or searched, if it cannot.
///
/// Empty vectors, vectors with a NaN or infinite component, and vectors of
/// zero magnitude have no meaningful cosine distance.
pub(crate) fn embedding_defect(embedding: &[f32]) -> Option<&'static str> {
    if embedding.is_empty() {
        return Some("is empty");
    }
    if embedding.iter().any(|x| !x.is_finite()) {
        return Some("has a non-finite component");
    }
    if embedding.iter().all(|x| *x == 0.0) {
        return Some("has zero magnitude");
    }
    None
}

/// Check a query embedding against the index's dimensionality (if any).
pub(crate) fn check_query(
    backend: &str,
    dimensions: Option<usize>,
    embedding: &[f32],
) -> Result<()> {
    if let Some(defect) = embedding_defect(embedding) {
        return Err(RagError::index(backend, format!("query embedding {defect}")));
    }
    match dimensions {
        Some(expected) if embedding.len() != expected => Err(RagError::index(
            backend,
            format!("query has {} dimensions, index expects {expected}", embedding.len()),
        )),
        _ => Ok(()),
    }
}

/// Check that every embedding is usable (see [`embedding_defect`]) and has the
/// same length as the index's established dimensionality (if any). Returns the
/// dimensionality.
pub(crate) fn check_dimensions<'a>(
    backend: &str,
    current: Option<usize>,
    embeddings: impl Iterator<Item = (&'a str, &'a [f32])>,
) -> Result<Option<usize>> {
    let mut dimensions = current;
    for (id, embedding) in embeddings {
        if let Some(defect) = embedding_defect(embedding) {
            return Err(RagError::index(backend, format!("embedding of vector '{id}' {defect}")));
        }
        match dimensions {
            Some(expected) if expected != embedding.len() => {
                return Err(RagError::index(
                    backend,
                    format!(
                        "vector '{id}' has {} dimensions, index expects {expected}",
                        embedding.len()
                    ),
                ));
            }
            Some(_) => {}
            None => dimensions = Some(embedding.len()),
        }
    }
    Ok(dimensions)
}
