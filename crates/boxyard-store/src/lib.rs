//! Persisted environment snapshots and on-disk layout for boxyard.
//!
//! This crate provides the storage layer: the `SnapshotStore` trait (a
//! key-value store from environment id to the last deployed `EnvSnapshot`),
//! its file-backed implementation `FileSnapshotStore` with atomic, checksummed
//! writes, and `StoreLayout` for directory structure management.

pub mod layout;
pub mod snapshot;

pub use layout::{StoreLayout, STORE_FORMAT_VERSION};
pub use snapshot::{
    validate_env_id, ApplicationRecord, BoxRecord, EnvSnapshot, FileSnapshotStore, SnapshotStore,
};

use std::path::Path;
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("integrity check failed for snapshot '{env_id}': expected {expected}, got {actual}")]
    IntegrityFailure {
        env_id: String,
        expected: String,
        actual: String,
    },
    #[error("environment not found: {0}")]
    EnvNotFound(String),
    #[error("store format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid environment id: {0}")]
    InvalidId(String),
    #[error("cannot snapshot environment: {0}")]
    Incomplete(String),
}
