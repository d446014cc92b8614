use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use fs4::FileExt;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

use crate::fs::run_blocking;

/// Serialises read-modify-write sequences on a resource path.
///
/// The in-process mutex orders tasks; the advisory lock file under `locks/`
/// orders separate processes.
#[derive(Debug, Clone)]
pub struct ResourceLocks {
    lock_dir: PathBuf,
    keys: Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>,
}

#[derive(Debug)]
pub struct ResourceGuard {
    _file: File,
    _local: OwnedMutexGuard<()>,
}

impl ResourceLocks {
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            keys: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Waits until `resource` is exclusively held by the caller.
    ///
    /// # Errors
    /// Returns an error if the lock file cannot be created or locked.
    pub async fn acquire(&self, resource: &Path) -> Result<ResourceGuard> {
        let local = self.local_mutex(resource).lock_owned().await;
        let lock_path = self.lock_path(resource);
        let file = run_blocking(move || {
            if let Some(parent) = lock_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)
                .with_context(|| format!("failed to open {}", lock_path.display()))?;
            file.lock_exclusive()
                .with_context(|| format!("failed to lock {}", lock_path.display()))?;
            Ok(file)
        })
        .await?;
        trace!(resource = %resource.display(), "resource lock acquired");
        Ok(ResourceGuard {
            _file: file,
            _local: local,
        })
    }

    fn local_mutex(&self, resource: &Path) -> Arc<AsyncMutex<()>> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        keys.entry(resource.to_path_buf())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn lock_path(&self, resource: &Path) -> PathBuf {
        let digest = Sha256::digest(resource.to_string_lossy().as_bytes());
        let name = hex::encode(digest);
        self.lock_dir.join(format!("{}.lock", &name[..32]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_key_sections_never_overlap() {
        let temp = tempfile::tempdir().expect("tempdir");
        let locks = ResourceLocks::new(temp.path().join("locks"));
        let inside = Arc::new(AtomicUsize::new(0));
        let resource = temp.path().join("manifest.json");

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let resource = resource.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire(&resource).await.expect("acquire");
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.expect("task");
        }
    }

    #[tokio::test]
    async fn lock_files_are_keyed_per_resource() {
        let temp = tempfile::tempdir().expect("tempdir");
        let locks = ResourceLocks::new(temp.path().join("locks"));
        let a = locks.acquire(Path::new("/r/a")).await.expect("a");
        let b = locks.acquire(Path::new("/r/b")).await.expect("b");
        drop((a, b));
        let count = fs::read_dir(temp.path().join("locks"))
            .expect("dir")
            .count();
        assert_eq!(count, 2);
    }
}
