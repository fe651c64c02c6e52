use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use super::SyncTarget;
use crate::error::SyncError;

/// Exclusive claim on one sync target, held for the duration of a pull or
/// push and released on drop.
///
/// Backed by an advisory lock on `<lock_dir>/<target>.lock`, so it also
/// keeps a `watch` loop and a manual `pull` from interleaving writes.
#[derive(Debug)]
pub struct TargetLock {
    file: File,
    path: PathBuf,
}

impl TargetLock {
    /// Fails with [`SyncError::SyncInProgress`] while another holder exists.
    pub fn acquire(lock_dir: &Path, target: SyncTarget) -> Result<Self> {
        fs::create_dir_all(lock_dir)
            .with_context(|| format!("Failed to create lock directory: {}", lock_dir.display()))?;

        let path = lock_dir.join(format!("{target}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        if let Err(e) = FileExt::try_lock_exclusive(&file) {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                return Err(SyncError::SyncInProgress(target).into());
            }
            return Err(e).with_context(|| format!("Failed to lock {}", path.display()));
        }

        log::debug!("Acquired {}", path.display());
        Ok(TargetLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TargetLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("Failed to release {}: {}", self.path.display(), e);
        }
    }
}
