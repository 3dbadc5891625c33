//! File-backed vector index that survives process restarts.
//!
//! The whole collection is kept in memory and mirrored to a single JSON
//! snapshot at `{dir}/{collection}.json`. Every upsert batch writes a new
//! snapshot to a temporary file and renames it over the old one, so a crash
//! leaves either the previous or the new snapshot on disk, never a mix.
//!
//! Each batch rewrites and fsyncs the whole collection, so ingesting `d`
//! documents costs `d` full snapshot writes. That is fine for a folder of
//! articles; a large corpus wants a store with incremental writes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::document::{IndexedVector, ScoredVector};
use crate::error::{RagError, Result};
use crate::index::{VectorIndex, check_dimensions, check_query, rank};

const BACKEND: &str = "File";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Clone)]
struct Snapshot {
    dimensions: Option<usize>,
    vectors: HashMap<String, IndexedVector>,
}

#[derive(Serialize)]
struct PersistedIndex<'a> {
    version: u32,
    collection: &'a str,
    dimensions: Option<usize>,
    vectors: Vec<&'a IndexedVector>,
}

#[derive(Deserialize)]
struct StoredIndex {
    version: u32,
    collection: String,
    dimensions: Option<usize>,
    vectors: Vec<IndexedVector>,
}

/// A [`VectorIndex`] persisted as a JSON snapshot on the local filesystem.
///
/// Writers are serialized by a mutex and publish a fresh snapshot only after
/// it has been written to disk. Queries read the last published snapshot and
/// never wait for a write to finish, so a query may or may not observe an
/// in-flight upsert.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{FileVectorIndex, VectorIndex};
///
/// let index = FileVectorIndex::open("chroma_persistent_storage", "document_qa_collection").await?;
/// index.upsert(&vectors).await?;
/// ```
#[derive(Debug)]
pub struct FileVectorIndex {
    path: PathBuf,
    collection: String,
    snapshot: RwLock<Arc<Snapshot>>,
    write_lock: Mutex<()>,
}

impl FileVectorIndex {
    /// Open (or create) the collection stored under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] for an empty or path-like collection
    /// name, and [`RagError::IndexUnavailable`] if the directory cannot be
    /// created or an existing snapshot cannot be read or decoded.
    pub async fn open(dir: impl AsRef<Path>, collection: impl Into<String>) -> Result<Self> {
        let collection = collection.into();
        if collection.is_empty()
            || collection.contains(['/', '\\'])
            || collection.starts_with('.')
        {
            return Err(RagError::InvalidConfig(format!(
                "collection name '{collection}' must be a plain, non-empty file name"
            )));
        }

        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            error!(dir = %dir.display(), error = %e, "failed to create index directory");
            RagError::index(BACKEND, format!("failed to create '{}': {e}", dir.display()))
        })?;

        let path = dir.join(format!("{collection}.json"));
        let snapshot = Self::load(&path, &collection).await?;
        info!(
            path = %path.display(),
            collection = %collection,
            vectors = snapshot.vectors.len(),
            "opened file vector index"
        );

        Ok(Self {
            path,
            collection,
            snapshot: RwLock::new(Arc::new(snapshot)),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the JSON snapshot backing this index.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the stored collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn load(path: &Path, collection: &str) -> Result<Snapshot> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(e) => {
                return Err(RagError::index(
                    BACKEND,
                    format!("failed to read '{}': {e}", path.display()),
                ));
            }
        };

        let stored: StoredIndex = serde_json::from_slice(&data).map_err(|e| {
            error!(path = %path.display(), error = %e, "corrupt index snapshot");
            RagError::index(BACKEND, format!("failed to decode '{}': {e}", path.display()))
        })?;

        if stored.version != FORMAT_VERSION {
            return Err(RagError::index(
                BACKEND,
                format!(
                    "unsupported snapshot version {} in '{}' (expected {FORMAT_VERSION})",
                    stored.version,
                    path.display()
                ),
            ));
        }
        if stored.collection != collection {
            return Err(RagError::index(
                BACKEND,
                format!(
                    "snapshot '{}' belongs to collection '{}', not '{collection}'",
                    path.display(),
                    stored.collection
                ),
            ));
        }

        let dimensions = check_dimensions(
            BACKEND,
            stored.dimensions,
            stored.vectors.iter().map(|v| (v.id.as_str(), v.embedding.as_slice())),
        )?;
        let vectors = stored.vectors.into_iter().map(|v| (v.id.clone(), v)).collect();
        Ok(Snapshot { dimensions, vectors })
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let mut vectors: Vec<&IndexedVector> = snapshot.vectors.values().collect();
        vectors.sort_by(|a, b| a.id.cmp(&b.id));
        let persisted = PersistedIndex {
            version: FORMAT_VERSION,
            collection: &self.collection,
            dimensions: snapshot.dimensions,
            vectors,
        };
        let data = serde_json::to_vec(&persisted)
            .map_err(|e| RagError::index(BACKEND, format!("failed to encode snapshot: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        let io_err = |e: std::io::Error| {
            error!(path = %tmp_path.display(), error = %e, "failed to write index snapshot");
            RagError::index(BACKEND, format!("failed to write '{}': {e}", tmp_path.display()))
        };

        let mut file = tokio::fs::File::create(&tmp_path).await.map_err(io_err)?;
        file.write_all(&data).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to replace index snapshot");
            RagError::index(BACKEND, format!("failed to replace '{}': {e}", self.path.display()))
        })
    }

    async fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }
}

#[async_trait]
impl VectorIndex for FileVectorIndex {
    async fn upsert(&self, vectors: &[IndexedVector]) -> Result<()> {
        if vectors.is_empty() {
            return Ok(());
        }

        let _writer = self.write_lock.lock().await;
        let current = self.current().await;

        let dimensions = check_dimensions(
            BACKEND,
            current.dimensions,
            vectors.iter().map(|v| (v.id.as_str(), v.embedding.as_slice())),
        )?;
        let mut next = Snapshot::clone(&current);
        next.dimensions = dimensions;
        for vector in vectors {
            next.vectors.insert(vector.id.clone(), vector.clone());
        }

        self.persist(&next).await?;
        debug!(
            backend = BACKEND,
            collection = %self.collection,
            upserted = vectors.len(),
            total = next.vectors.len(),
            "upsert"
        );
        *self.snapshot.write().await = Arc::new(next);
        Ok(())
    }

    async fn query(
        &self,
        embeddings: &[Vec<f32>],
        n_results: usize,
    ) -> Result<Vec<Vec<ScoredVector>>> {
        let snapshot = self.current().await;
        embeddings
            .iter()
            .map(|embedding| {
                check_query(BACKEND, snapshot.dimensions, embedding)?;
                Ok(rank(snapshot.vectors.values(), embedding, n_results))
            })
            .collect()
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.current().await.vectors.len())
    }

    async fn get(&self, id: &str) -> Result<Option<IndexedVector>> {
        Ok(self.current().await.vectors.get(id).cloned())
    }
}
