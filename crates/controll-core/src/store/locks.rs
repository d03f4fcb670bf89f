// Path-keyed async locks.
//
// One `tokio::sync::Mutex` per file path, created lazily. Entries are never
// evicted; the set of paths an add-on touches is small and bounded by the
// files it manages.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct PathLocks {
    inner: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`. Released when the guard drops.
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let key = normalize(path);
        // Clone the Arc out so the shard guard is released before awaiting.
        let mutex = Arc::clone(self.inner.entry(key).or_default().value());
        mutex.lock_owned().await
    }

    /// Number of distinct paths seen so far.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// `a/./b` and `a/b/` share a lock with `a/b`.
fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn equivalent_paths_share_a_lock() {
        let locks = PathLocks::new();
        let _guard = locks.lock(Path::new("/config/./configuration.yaml")).await;

        let second = tokio::time::timeout(
            Duration::from_millis(50),
            locks.lock(Path::new("/config/configuration.yaml")),
        )
        .await;
        assert!(second.is_err(), "second lock should block");
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn distinct_paths_do_not_contend() {
        let locks = PathLocks::new();
        let _a = locks.lock(Path::new("/config/configuration.yaml")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(50),
            locks.lock(Path::new("/config/themes/controll.yaml")),
        )
        .await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn guard_drop_releases() {
        let locks = PathLocks::new();
        let path = Path::new("/config/configuration.yaml");
        drop(locks.lock(path).await);
        let again = tokio::time::timeout(Duration::from_millis(50), locks.lock(path)).await;
        assert!(again.is_ok());
    }
}
