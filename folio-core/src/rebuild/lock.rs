//! Per-path exclusion for rebuilds

use crate::error::RebuildError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Paths currently being rebuilt. Acquiring a path that is already held
/// fails with [`RebuildError::Busy`] instead of waiting.
#[derive(Debug, Default)]
pub struct LockRegistry {
    active: Mutex<HashSet<PathBuf>>,
}

/// Releases its path when dropped
#[derive(Debug)]
pub struct PathGuard<'a> {
    registry: &'a LockRegistry,
    key: PathBuf,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, path: &Path) -> Result<PathGuard<'_>, RebuildError> {
        let key = lock_key(path);
        if !self.active().insert(key.clone()) {
            return Err(RebuildError::Busy(path.display().to_string()));
        }
        Ok(PathGuard {
            registry: self,
            key,
        })
    }

    pub fn is_locked(&self, path: &Path) -> bool {
        self.active().contains(&lock_key(path))
    }

    // a panic while holding the set cannot leave it inconsistent
    fn active(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.registry.active().remove(&self.key);
    }
}

fn lock_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
