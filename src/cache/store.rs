//! Cache Directory Store
//!
//! One file per image id, named `{id}.jpg`. The set of cached ids is read
//! straight from the directory listing; nothing else tracks it.

use std::collections::BTreeSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::errors::CacheError;
use crate::photos::ImageId;

/// Extension of cached image files
pub const CACHE_EXTENSION: &str = "jpg";

/// Extension of in-flight writes
const TEMP_EXTENSION: &str = "tmp";

/// Filesystem view of the image cache
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_dir: PathBuf,
}

impl CacheStore {
    /// Open (and create if needed) a cache directory
    ///
    /// Failing to create the directory is a configuration problem and is
    /// returned to the caller rather than retried.
    pub fn open(cache_dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|e| CacheError::fs(&cache_dir, e))?;

        let store = Self { cache_dir };
        store.cleanup();

        info!(cache_dir = %store.cache_dir.display(), "Image cache opened");
        Ok(store)
    }

    /// Ids of all cached images
    pub fn list_ids(&self) -> Result<BTreeSet<ImageId>, CacheError> {
        let read_dir =
            fs::read_dir(&self.cache_dir).map_err(|e| CacheError::fs(&self.cache_dir, e))?;

        let mut ids = BTreeSet::new();
        for entry in read_dir.flatten() {
            let path = entry.path();
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(CACHE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.insert(stem.to_string());
            }
        }
        Ok(ids)
    }

    /// Remove a cached image. A file that is already gone is not an error.
    pub fn remove(&self, id: &str) -> Result<(), CacheError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(id = id, "Removed cached image");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::fs(path, e)),
        }
    }

    /// Write image bytes for an id
    ///
    /// Data goes to a temp file in the cache directory first and is renamed
    /// into place, so a reader never sees a half-written `.jpg`.
    pub fn store(&self, id: &str, data: &[u8]) -> Result<PathBuf, CacheError> {
        let local_path = self.path_for(id)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(&format!(".{}", TEMP_EXTENSION))
            .tempfile_in(&self.cache_dir)
            .map_err(|e| CacheError::fs(&self.cache_dir, e))?;

        tmp.write_all(data)
            .map_err(|e| CacheError::fs(tmp.path().to_path_buf(), e))?;

        tmp.persist(&local_path)
            .map_err(|e| CacheError::fs(&local_path, e.error))?;

        debug!(
            id = id,
            local = %local_path.display(),
            size = data.len(),
            "Stored image in cache"
        );

        Ok(local_path)
    }

    /// Local path for an id, rejecting ids that would escape the directory
    pub fn path_for(&self, id: &str) -> Result<PathBuf, CacheError> {
        if !is_safe_id(id) {
            return Err(CacheError::InvalidId(id.to_string()));
        }
        Ok(self.cache_dir.join(format!("{}.{}", id, CACHE_EXTENSION)))
    }

    /// Remove temp files left by interrupted writes
    pub fn cleanup(&self) {
        if let Ok(read_dir) = fs::read_dir(&self.cache_dir) {
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some(TEMP_EXTENSION) {
                    debug!(path = %path.display(), "Removing stale temp file");
                    let _ = fs::remove_file(&path);
                }
            }
        }
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0'])
}
