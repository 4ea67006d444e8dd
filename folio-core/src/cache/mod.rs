//! Cover cache: a small key-value store for downloaded cover images
//!
//! Keys are short file-name-safe strings (`ol-<id>` or a hex digest). The
//! cache is the only state shared between items, so every implementation
//! must tolerate concurrent readers and racing writers.

use crate::error::CacheError;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

/// Result type for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Key-value store for cover bytes
pub trait CoverCache: Send + Sync {
    /// Cached bytes, or `None` on a miss
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store bytes under a key, replacing any previous value
    fn put(&self, key: &str, data: &[u8]) -> CacheResult<()>;

    /// Remove a key; removing a missing key is not an error
    fn remove(&self, key: &str) -> CacheResult<()>;

    fn contains(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// One file per key under a root directory
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Create a cache rooted at `root`; the directory is created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path, rejecting anything that could escape the root
    fn full_path(&self, key: &str) -> CacheResult<PathBuf> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey("empty key".to_string()));
        }

        let mut normalized = PathBuf::new();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(c) => normalized.push(c),
                Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                    return Err(CacheError::InvalidKey(format!(
                        "path traversal attempt: {}",
                        key
                    )));
                }
            }
        }
        if normalized.components().count() != 1 {
            return Err(CacheError::InvalidKey(format!("nested key: {}", key)));
        }

        Ok(self.root.join(normalized))
    }
}

impl CoverCache for DiskCache {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let path = self.full_path(key)?;
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::BackendError(e.to_string())),
        }
    }

    fn put(&self, key: &str, data: &[u8]) -> CacheResult<()> {
        let path = self.full_path(key)?;
        std::fs::create_dir_all(&self.root)
            .map_err(|e| CacheError::BackendError(e.to_string()))?;

        // Unique temp name so racing writers never interleave bytes
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", key, uuid::Uuid::new_v4().simple()));
        std::fs::write(&tmp, data).map_err(|e| CacheError::BackendError(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            CacheError::BackendError(e.to_string())
        })
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        let path = self.full_path(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::BackendError(e.to_string())),
        }
    }
}

/// In-memory cache (for testing)
#[derive(Default)]
pub struct MemoryCache {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> CacheError {
    CacheError::BackendError("cache lock poisoned".to_string())
}

impl CoverCache for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.data.read().map_err(poisoned)?.get(key).cloned())
    }

    fn put(&self, key: &str, data: &[u8]) -> CacheResult<()> {
        self.data
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        self.data.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new();
        assert!(cache.get("ol-1").unwrap().is_none());

        cache.put("ol-1", b"jpeg").unwrap();
        assert_eq!(cache.get("ol-1").unwrap().as_deref(), Some(&b"jpeg"[..]));
        assert!(cache.contains("ol-1").unwrap());
        assert_eq!(cache.len(), 1);

        cache.remove("ol-1").unwrap();
        assert!(!cache.contains("ol-1").unwrap());
    }

    #[test]
    fn test_disk_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("covers"));

        assert!(cache.get("ol-42").unwrap().is_none());
        cache.put("ol-42", b"\xff\xd8\xff").unwrap();
        cache.put("ol-42", b"\xff\xd8\xff\xe0").unwrap();
        assert_eq!(
            cache.get("ol-42").unwrap().as_deref(),
            Some(&b"\xff\xd8\xff\xe0"[..])
        );

        // no temp files left behind
        let names: Vec<_> = std::fs::read_dir(cache.root())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);

        cache.remove("ol-42").unwrap();
        cache.remove("ol-42").unwrap();
        assert!(cache.get("ol-42").unwrap().is_none());
    }

    #[test]
    fn test_disk_cache_rejects_traversal() {
        let cache = DiskCache::new("/tmp/folio-cache-test");
        assert!(matches!(
            cache.get("../etc/passwd"),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(cache.put("a/b", b"x"), Err(CacheError::InvalidKey(_))));
        assert!(matches!(cache.get(""), Err(CacheError::InvalidKey(_))));
    }
}
