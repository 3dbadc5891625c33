//! Enumeration of source documents.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Produces the documents of a corpus.
pub trait DocumentSource: Send + Sync {
    /// Load every eligible document.
    fn load(&self) -> Result<Vec<Document>>;
}

/// Loads the files with a given extension directly inside a directory.
///
/// Subdirectories are not searched. Files are returned sorted by name, each
/// read as UTF-8, with the file name as the document id.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    extension: String,
}

impl DirectorySource {
    /// Load `.txt` files from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), extension: "txt".to_string() }
    }

    /// Load files with this extension instead (without the leading dot).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// The directory being loaded.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn source_error(path: &Path, message: impl Into<String>) -> RagError {
        RagError::DocumentSource { path: path.display().to_string(), message: message.into() }
    }
}

impl DocumentSource for DirectorySource {
    fn load(&self) -> Result<Vec<Document>> {
        if !self.dir.is_dir() {
            return Err(Self::source_error(&self.dir, "not a directory"));
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                Self::source_error(e.path().unwrap_or(self.dir.as_path()), e.to_string())
            })?;
            if !entry.file_type().is_file()
                || !entry.path().extension().is_some_and(|ext| ext == self.extension.as_str())
            {
                continue;
            }

            let text = std::fs::read_to_string(entry.path())
                .map_err(|e| Self::source_error(entry.path(), e.to_string()))?;
            let id = entry.file_name().to_string_lossy().into_owned();
            debug!(document.id = %id, len = text.len(), "loaded document");
            documents.push(Document { id, text });
        }

        info!(dir = %self.dir.display(), documents = documents.len(), "loaded documents");
        Ok(documents)
    }
}
