//! Local copy of the last document the caller asked to persist.
//!
//! The store writes through this cache before every remote write and reads
//! from it whenever the remote is unconfigured or unreachable.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use super::config::Document;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Whole-document get/set backend for the local cache
pub trait DocumentCache: Send + Sync {
    /// Last stored document, or `None` if nothing has been cached yet
    fn load(&self) -> Result<Option<Document>, CacheError>;

    /// Replace the cached document
    fn store(&self, document: &Document) -> Result<(), CacheError>;
}

/// In-memory cache, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryCache {
    document: Mutex<Option<Document>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            document: Mutex::new(Some(document)),
        }
    }
}

impl DocumentCache for MemoryCache {
    fn load(&self) -> Result<Option<Document>, CacheError> {
        let document = self.document.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(document.clone())
    }

    fn store(&self, document: &Document) -> Result<(), CacheError> {
        let mut slot = self.document.lock().map_err(|_| CacheError::Poisoned)?;
        *slot = Some(document.clone());
        Ok(())
    }
}

/// JSON file on disk
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// File name used inside a data directory
    pub const FILE_NAME: &'static str = "articles.json";

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Cache file inside `data_dir`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentCache for FileCache {
    fn load(&self) -> Result<Option<Document>, CacheError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn store(&self, document: &Document) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write to .tmp then rename so an interrupted write keeps the old copy
        let tmp_path = self.path.with_extension("json.tmp");
        let data = serde_json::to_string(document)?;
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Cache that remembers nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl DocumentCache for NoopCache {
    fn load(&self) -> Result<Option<Document>, CacheError> {
        Ok(None)
    }

    fn store(&self, _document: &Document) -> Result<(), CacheError> {
        Ok(())
    }
}

impl<C: DocumentCache + ?Sized> DocumentCache for std::sync::Arc<C> {
    fn load(&self) -> Result<Option<Document>, CacheError> {
        (**self).load()
    }

    fn store(&self, document: &Document) -> Result<(), CacheError> {
        (**self).store(document)
    }
}
