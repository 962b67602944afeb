//! Point-in-time copies of the live store
//!
//! The live store is a single-writer file, so a consistent copy needs the
//! connection closed for the duration of the copy. [`QuiescenceGuard`] closes
//! it on entry and reopens it on drop, whatever happens in between.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, error};

use crate::error::{LabkeepError, LabkeepResult};
use crate::storage::{copy_file_synced, remove_file_if_exists, LiveStore};

/// Byte-level file copy used by snapshots and restores
pub trait FileCopier: Send + Sync {
    /// Copy `from` over `to`, returning the number of bytes written
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;
}

/// Copies with `std::fs` and syncs the destination
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCopier;

impl FileCopier for FsCopier {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        copy_file_synced(from, to)
    }
}

/// Keeps the live store closed while alive
pub struct QuiescenceGuard<'a> {
    store: &'a dyn LiveStore,
}

impl<'a> QuiescenceGuard<'a> {
    /// Close the store's connection
    pub fn enter(store: &'a dyn LiveStore) -> LabkeepResult<Self> {
        store.close()?;
        debug!(path = %store.file_path().display(), "live store quiesced");
        Ok(Self { store })
    }

    /// Reopen now and report the result, instead of waiting for drop
    pub fn release(self) -> LabkeepResult<()> {
        let store = self.store;
        std::mem::forget(self);
        store.open()
    }
}

impl Drop for QuiescenceGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.store.open() {
            error!(
                path = %self.store.file_path().display(),
                error = %e,
                "failed to reopen live store"
            );
        }
    }
}

/// Copy the live store file to `destination` inside a quiescence window
///
/// Returns the snapshot size in bytes. On failure no partial file is left at
/// `destination`.
pub fn create_snapshot(
    store: &dyn LiveStore,
    destination: &Path,
    copier: &dyn FileCopier,
) -> LabkeepResult<u64> {
    let source = store.file_path();
    if !source.exists() {
        return Err(LabkeepError::SourceMissing(source));
    }

    let _guard = QuiescenceGuard::enter(store)?;

    let result = copy_exact(&source, destination, copier);
    if result.is_err() {
        if let Err(e) = remove_file_if_exists(destination) {
            error!(
                path = %destination.display(),
                error = %e,
                "failed to remove partial snapshot"
            );
        }
    }
    result
}

fn copy_exact(source: &Path, destination: &Path, copier: &dyn FileCopier) -> LabkeepResult<u64> {
    let source_len = fs::metadata(source)
        .map_err(|e| LabkeepError::CopyFailure(format!("Failed to stat live store: {}", e)))?
        .len();

    copier
        .copy(source, destination)
        .map_err(|e| LabkeepError::CopyFailure(format!("Failed to copy live store: {}", e)))?;

    let written = fs::metadata(destination)
        .map_err(|e| LabkeepError::CopyFailure(format!("Failed to stat snapshot: {}", e)))?
        .len();

    if written != source_len {
        return Err(LabkeepError::CopyFailure(format!(
            "Snapshot is {} bytes but live store is {} bytes",
            written, source_len
        )));
    }

    Ok(written)
}
