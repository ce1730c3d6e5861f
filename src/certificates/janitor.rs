//! Delayed removal of preview artifacts.
//!
//! Every scheduled path gets its own timer task. The janitor keeps the abort
//! handles so a deletion can be cancelled, and so that shutdown can drain the
//! outstanding files instead of leaving them on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

type Pending = Arc<Mutex<HashMap<PathBuf, AbortHandle>>>;

#[derive(Clone, Default)]
pub struct PreviewJanitor {
    pending: Pending,
}

impl PreviewJanitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `paths` for deletion after `delay`. Paths that already have a
    /// pending deletion are left on their original timer.
    pub fn schedule<I>(&self, paths: I, delay: Duration)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut pending = lock(&self.pending);

        for path in paths {
            if pending.contains_key(&path) {
                debug!("Deletion already scheduled for {}", path.display());
                continue;
            }

            let registry = self.pending.clone();
            let task_path = path.clone();
            // The registry lock is held until the handle is inserted, so the
            // task cannot unregister itself before it is registered.
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                remove_preview(&task_path).await;
                lock(&registry).remove(&task_path);
            });

            pending.insert(path, handle.abort_handle());
        }
    }

    /// Cancel a pending deletion. Returns `false` when nothing was scheduled.
    pub fn cancel(&self, path: &Path) -> bool {
        match lock(&self.pending).remove(path) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Abort every timer and delete the outstanding files now.
    pub async fn drain(&self) -> usize {
        let drained: Vec<(PathBuf, AbortHandle)> = lock(&self.pending).drain().collect();

        for (path, handle) in &drained {
            handle.abort();
            remove_preview(path).await;
        }

        if !drained.is_empty() {
            info!("Removed {} outstanding preview files", drained.len());
        }
        drained.len()
    }
}

fn lock(pending: &Pending) -> MutexGuard<'_, HashMap<PathBuf, AbortHandle>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn remove_preview(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed preview {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Preview {} already removed", path.display());
        }
        Err(e) => warn!("Failed to remove preview {}: {}", path.display(), e),
    }
}
