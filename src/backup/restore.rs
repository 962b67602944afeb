//! Backup restoration
//!
//! Swaps a snapshot into the live store's location. The current live file is
//! first copied to `<livePath>.temp_backup`; if putting the snapshot in place
//! or reopening it fails, that copy is put back. The live store is reopened
//! on every exit path.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::snapshot::{FileCopier, QuiescenceGuard};
use crate::error::{LabkeepError, LabkeepResult};
use crate::storage::{remove_file_if_exists, LiveStore};

/// Suffix of the rollback copy written next to the live store
pub const TEMP_BACKUP_SUFFIX: &str = ".temp_backup";

/// Path of the rollback copy for a live store file
pub fn temp_backup_path(live_path: &Path) -> PathBuf {
    let mut name = live_path.as_os_str().to_os_string();
    name.push(TEMP_BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Performs the file swap of a restore
pub struct RestoreOrchestrator<'a> {
    store: &'a dyn LiveStore,
    copier: &'a dyn FileCopier,
}

impl<'a> RestoreOrchestrator<'a> {
    pub fn new(store: &'a dyn LiveStore, copier: &'a dyn FileCopier) -> Self {
        Self { store, copier }
    }

    /// Replace the live store file with `snapshot`
    ///
    /// The snapshot must already have been verified by the caller.
    pub fn restore(&self, snapshot: &Path) -> LabkeepResult<()> {
        if !snapshot.exists() {
            return Err(LabkeepError::SourceMissing(snapshot.to_path_buf()));
        }

        let live = self.store.file_path();
        let temp = temp_backup_path(&live);

        let guard = QuiescenceGuard::enter(self.store)?;

        if let Err(e) = self.copier.copy(&live, &temp) {
            discard_temp(&temp);
            return Err(LabkeepError::CopyFailure(format!(
                "Failed to save rollback copy of live store: {}",
                e
            )));
        }

        match self.swap_in(snapshot, &live) {
            Ok(()) => {
                discard_temp(&temp);
                guard.release()?;
                info!(snapshot = %snapshot.display(), "restore complete");
                Ok(())
            }
            Err(restore_error) => {
                warn!(error = %restore_error, "restore failed, rolling back");
                self.roll_back(guard, &temp, &live, restore_error)
            }
        }
    }

    /// Steps 3 and 4: copy the snapshot over the live file and reopen it
    fn swap_in(&self, snapshot: &Path, live: &Path) -> LabkeepResult<()> {
        self.copier.copy(snapshot, live).map_err(|e| {
            LabkeepError::CopyFailure(format!("Failed to copy backup over live store: {}", e))
        })?;
        self.store.open()?;
        self.store.health_check()
    }

    fn roll_back(
        &self,
        guard: QuiescenceGuard<'_>,
        temp: &Path,
        live: &Path,
        restore_error: LabkeepError,
    ) -> LabkeepResult<()> {
        // The failed swap may have left the store open on the bad file
        if let Err(e) = self.store.close() {
            warn!(error = %e, "failed to close live store before rollback");
        }

        match self.copier.copy(temp, live) {
            Ok(_) => {
                discard_temp(temp);
                if let Err(e) = guard.release() {
                    error!(error = %e, "failed to reopen live store after rollback");
                }
                info!("rollback complete, live store unchanged");
                Err(restore_error)
            }
            Err(rollback_error) => {
                drop(guard);
                error!(
                    restore_error = %restore_error,
                    rollback_error = %rollback_error,
                    temp_path = %temp.display(),
                    "ROLLBACK FAILED: live store may be inconsistent"
                );
                // the temp copy is now the only copy of the pre-restore data
                Err(LabkeepError::RestoreRollbackFailure {
                    restore_error: restore_error.to_string(),
                    rollback_error: rollback_error.to_string(),
                    temp_path: temp.to_path_buf(),
                })
            }
        }
    }
}

fn discard_temp(temp: &Path) {
    if let Err(e) = remove_file_if_exists(temp) {
        warn!(path = %temp.display(), error = %e, "failed to remove rollback copy");
    }
}
