//! Process-wide per-path mutual exclusion.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::transaction::fsio;

/// One async mutex per artifact, created on first use.
///
/// Paths are keyed by the file they resolve to, so a symlink and its target
/// share one lock.
#[derive(Clone, Default)]
pub struct PathLocks {
    inner: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, path: &Path) -> Arc<Mutex<()>> {
        // The map guard must be released before awaiting the mutex.
        self.inner
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Symlink resolved, parent directory canonical; stable whether or not
    /// the file itself exists yet.
    async fn key(path: &Path) -> PathBuf {
        let resolved = fsio::resolve(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());
        let (Some(dir), Some(name)) = (resolved.parent(), resolved.file_name()) else {
            return resolved;
        };
        match tokio::fs::canonicalize(dir).await {
            Ok(dir) => dir.join(name),
            Err(_) => resolved,
        }
    }

    /// Hold `path` exclusively until the guard drops.
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let key = Self::key(path).await;
        self.entry(&key).lock_owned().await
    }

    /// Lock two paths in a fixed order so concurrent callers cannot deadlock.
    pub async fn lock_pair(&self, a: &Path, b: &Path) -> Vec<OwnedMutexGuard<()>> {
        let a = Self::key(a).await;
        let b = Self::key(b).await;
        if a == b {
            return vec![self.entry(&a).lock_owned().await];
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.entry(&first).lock_owned().await;
        let second = self.entry(&second).lock_owned().await;
        vec![first, second]
    }
}
