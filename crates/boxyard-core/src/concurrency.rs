use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Exclusive advisory lock over a store directory.
///
/// The pipeline itself does not lock; callers that may run concurrently
/// against the same store hold one of these for the duration of a run.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Block until the lock at `lock_path` is ours.
    pub fn acquire(lock_path: &Path) -> Result<Self, CoreError> {
        let file = open_lock_file(lock_path)?;
        file.lock_exclusive().map_err(|e| {
            CoreError::Io(io::Error::new(
                io::ErrorKind::WouldBlock,
                format!("cannot lock {}: {e}", lock_path.display()),
            ))
        })?;
        tracing::debug!("store lock acquired: {}", lock_path.display());
        Ok(Self {
            file,
            path: lock_path.to_path_buf(),
        })
    }

    /// Take the lock only if nobody else holds it.
    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, CoreError> {
        let file = open_lock_file(lock_path)?;
        if file.try_lock_exclusive().is_err() {
            tracing::debug!("store lock busy: {}", lock_path.display());
            return Ok(None);
        }
        Ok(Some(Self {
            file,
            path: lock_path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(lock_path: &Path) -> Result<File, CoreError> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;
    Ok(file)
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("failed to release store lock {}: {e}", self.path.display());
        }
    }
}
