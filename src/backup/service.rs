//! Backup service
//!
//! The one entry point callers use. Composes snapshotting, hashing, the
//! catalog, verification, restore and retention, and serializes every
//! operation that touches backup files or the live store behind a single lock.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::catalog::BackupCatalog;
use super::checksum::file_digest;
use super::restore::RestoreOrchestrator;
use super::retention::{CleanupReport, RetentionManager};
use super::snapshot::{create_snapshot, FileCopier, FsCopier};
use super::verify::{IntegrityVerifier, SnapshotProbe, SqliteProbe, Verification};
use crate::audit::{AuditEntry, AuditLogger, Operation};
use crate::config::SettingsProvider;
use crate::error::{LabkeepError, LabkeepResult};
use crate::models::{BackupId, BackupRecord, BackupType};
use crate::storage::{remove_file_if_exists, LiveStore};

/// Actor recorded for operations the caller doesn't attribute
pub const SYSTEM_ACTOR: &str = "system";

const DEFAULT_EXTENSION: &str = "db";
const PRE_RESTORE_DESCRIPTION: &str = "Pre-restore safety backup";

/// Result of a successful restore
#[derive(Debug, Clone)]
pub struct RestoreSummary {
    /// The backup that is now live
    pub restored: BackupRecord,
    /// Backup of the state that was replaced
    pub safety_backup: BackupRecord,
}

/// Facade over the backup subsystem
pub struct BackupService {
    store: Arc<dyn LiveStore>,
    catalog: Arc<dyn BackupCatalog>,
    settings: Arc<dyn SettingsProvider>,
    probe: Box<dyn SnapshotProbe>,
    copier: Box<dyn FileCopier>,
    audit: Option<AuditLogger>,
    op_lock: Mutex<()>,
}

impl BackupService {
    /// Create a service over a live store, a catalog and settings
    pub fn new(
        store: Arc<dyn LiveStore>,
        catalog: Arc<dyn BackupCatalog>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            store,
            catalog,
            settings,
            probe: Box::new(SqliteProbe),
            copier: Box::new(FsCopier),
            audit: None,
            op_lock: Mutex::new(()),
        }
    }

    /// Use a different structural check for snapshots
    pub fn with_probe(mut self, probe: impl SnapshotProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Use a different file copier
    pub fn with_copier(mut self, copier: impl FileCopier + 'static) -> Self {
        self.copier = Box::new(copier);
        self
    }

    /// Record operations in an audit log
    pub fn with_audit_logger(mut self, logger: AuditLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    /// The catalog backing this service
    pub fn catalog(&self) -> &dyn BackupCatalog {
        self.catalog.as_ref()
    }

    /// The audit log, if one is attached
    pub fn audit_log(&self) -> Option<&AuditLogger> {
        self.audit.as_ref()
    }

    /// Directory new backups are written to
    pub fn backup_directory(&self) -> PathBuf {
        self.settings.backup_directory()
    }

    /// Take a snapshot of the live store and register it
    pub fn create(
        &self,
        description: &str,
        backup_type: BackupType,
        actor: &str,
    ) -> LabkeepResult<BackupRecord> {
        let _lock = self.lock()?;
        let result = if backup_type == BackupType::Imported {
            Err(LabkeepError::Validation(
                "Imported backups can only be created by import".into(),
            ))
        } else {
            self.create_locked(description, backup_type, actor)
        };
        self.audit_result(Operation::Create, None, actor, &result, |r| {
            (Some(r.id), Some(r.file_name.clone()))
        });
        result
    }

    /// Check a backup's integrity and store the outcome
    pub fn verify(&self, id: BackupId, actor: &str) -> LabkeepResult<BackupRecord> {
        let _lock = self.lock()?;
        let result = self
            .require(id)
            .and_then(|record| self.verify_record(record, actor))
            .map(|(record, _)| record);
        self.audit_result(Operation::Verify, Some(id), actor, &result, |r| {
            (Some(r.id), Some(r.status.to_string()))
        });
        result
    }

    /// Replace the live store with a backup
    ///
    /// Refuses corrupted backups without touching any file. Otherwise the
    /// backup is re-verified, the current state is backed up, and the swap
    /// runs with rollback on failure.
    pub fn restore(&self, id: BackupId, actor: &str) -> LabkeepResult<RestoreSummary> {
        let _lock = self.lock()?;
        let result = self.restore_locked(id, actor);
        match &result {
            Ok(summary) => self.audit(AuditEntry::success(
                Operation::Restore,
                Some(id),
                actor,
                Some(format!(
                    "safety backup {}",
                    summary.safety_backup.id
                )),
            )),
            Err(e) => self.audit(AuditEntry::failure(
                Operation::Restore,
                Some(id),
                actor,
                e.to_string(),
            )),
        }
        result
    }

    /// Delete a backup's file and catalog entry
    pub fn delete(&self, id: BackupId, actor: &str) -> LabkeepResult<()> {
        let _lock = self.lock()?;
        let result = self.require(id).and_then(|record| {
            RetentionManager::new(self.catalog.as_ref()).delete_record(&record)?;
            info!(backup = %id, file = %record.file_name, "backup deleted");
            Ok(record)
        });
        self.audit_result(Operation::Delete, Some(id), actor, &result, |r| {
            (Some(r.id), Some(r.file_name.clone()))
        });
        result.map(|_| ())
    }

    /// Look up one backup
    pub fn get(&self, id: BackupId) -> LabkeepResult<Option<BackupRecord>> {
        self.catalog.get(id)
    }

    /// All backups, newest first. Corrupted backups are included.
    pub fn list_all(&self) -> LabkeepResult<Vec<BackupRecord>> {
        self.catalog.list_all()
    }

    /// Backups taken between `from` and `to` inclusive, newest first
    pub fn list_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> LabkeepResult<Vec<BackupRecord>> {
        self.catalog.list_by_date_range(from, to)
    }

    /// Backups of one kind, newest first
    pub fn list_by_type(&self, backup_type: BackupType) -> LabkeepResult<Vec<BackupRecord>> {
        self.catalog.list_by_type(backup_type)
    }

    /// Keep the `max_to_keep` newest backups and delete the rest
    pub fn cleanup_excess(&self, max_to_keep: usize, actor: &str) -> LabkeepResult<CleanupReport> {
        let _lock = self.lock()?;
        let result = RetentionManager::new(self.catalog.as_ref()).cleanup_excess(max_to_keep);
        self.audit_result(Operation::Cleanup, None, actor, &result, |r| {
            (None, Some(format!("excess: {}", r.summary())))
        });
        result
    }

    /// Apply the configured maximum backup count
    pub fn cleanup_to_configured_limit(&self, actor: &str) -> LabkeepResult<CleanupReport> {
        self.cleanup_excess(self.settings.max_backup_files() as usize, actor)
    }

    /// Delete every corrupted backup
    pub fn cleanup_corrupted(&self, actor: &str) -> LabkeepResult<CleanupReport> {
        let _lock = self.lock()?;
        let result = RetentionManager::new(self.catalog.as_ref()).cleanup_corrupted();
        self.audit_result(Operation::Cleanup, None, actor, &result, |r| {
            (None, Some(format!("corrupted: {}", r.summary())))
        });
        result
    }

    /// Copy a backup file out of the managed directory
    ///
    /// If `destination` is an existing directory the file keeps its name.
    /// Corrupted backups can be exported for offline inspection.
    pub fn export(&self, id: BackupId, destination: &Path) -> LabkeepResult<PathBuf> {
        let _lock = self.lock()?;
        let result = self.export_locked(id, destination);
        match &result {
            Ok(target) => self.audit(AuditEntry::success(
                Operation::Export,
                Some(id),
                SYSTEM_ACTOR,
                Some(target.display().to_string()),
            )),
            Err(e) => self.audit(AuditEntry::failure(
                Operation::Export,
                Some(id),
                SYSTEM_ACTOR,
                e.to_string(),
            )),
        }
        result
    }

    /// Copy an external file into the backup directory and register it
    pub fn import(
        &self,
        source: &Path,
        description: &str,
        actor: &str,
    ) -> LabkeepResult<BackupRecord> {
        let _lock = self.lock()?;
        let result = self.import_locked(source, description, actor);
        self.audit_result(Operation::Import, None, actor, &result, |r| {
            (Some(r.id), Some(r.file_name.clone()))
        });
        result
    }

    /// Sum of the recorded sizes of all backups
    pub fn total_size(&self) -> LabkeepResult<u64> {
        Ok(self
            .catalog
            .list_all()?
            .iter()
            .map(|r| r.file_size_bytes)
            .sum())
    }

    fn lock(&self) -> LabkeepResult<MutexGuard<'_, ()>> {
        self.op_lock
            .lock()
            .map_err(|e| LabkeepError::Storage(format!("Failed to acquire backup lock: {}", e)))
    }

    fn require(&self, id: BackupId) -> LabkeepResult<BackupRecord> {
        self.catalog
            .get(id)?
            .ok_or_else(|| LabkeepError::backup_not_found(id))
    }

    fn prepare_backup_dir(&self) -> LabkeepResult<PathBuf> {
        let dir = self.settings.backup_directory();
        fs::create_dir_all(&dir).map_err(|e| {
            LabkeepError::Io(format!(
                "Failed to create backup directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(dir)
    }

    fn create_locked(
        &self,
        description: &str,
        backup_type: BackupType,
        actor: &str,
    ) -> LabkeepResult<BackupRecord> {
        let dir = self.prepare_backup_dir()?;
        let live = self.store.file_path();
        let extension = live
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        let stem = format!(
            "{}_Backup_{}",
            self.settings.backup_file_prefix(),
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let destination = unique_path(&dir, &stem, Some(&extension));

        // taken before the store is closed; advisory only
        let record_count = self.store.approximate_record_count();

        let size = create_snapshot(self.store.as_ref(), &destination, self.copier.as_ref())?;
        let record = self.register(
            destination,
            size,
            backup_type,
            actor,
            description,
            record_count,
        )?;

        info!(
            backup = %record.id,
            file = %record.file_name,
            size = record.file_size_bytes,
            kind = %record.backup_type,
            "backup created"
        );
        self.verify_if_configured(record, actor)
    }

    fn import_locked(
        &self,
        source: &Path,
        description: &str,
        actor: &str,
    ) -> LabkeepResult<BackupRecord> {
        if !source.is_file() {
            return Err(LabkeepError::SourceMissing(source.to_path_buf()));
        }
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                LabkeepError::Validation(format!("Invalid import file name: {}", source.display()))
            })?;
        let extension = source.extension().map(|e| e.to_string_lossy().to_string());

        let dir = self.prepare_backup_dir()?;
        let destination = unique_path(&dir, &stem, extension.as_deref());

        let size = match self.copier.copy(source, &destination) {
            Ok(size) => size,
            Err(e) => {
                discard_file(&destination);
                return Err(LabkeepError::CopyFailure(format!(
                    "Failed to import {}: {}",
                    source.display(),
                    e
                )));
            }
        };

        let record = self.register(
            destination,
            size,
            BackupType::Imported,
            actor,
            description,
            None,
        )?;
        info!(backup = %record.id, source = %source.display(), "backup imported");
        self.verify_if_configured(record, actor)
    }

    /// Hash a file that is already in place and insert its catalog row.
    /// On failure the file is removed so no unregistered snapshot remains.
    fn register(
        &self,
        path: PathBuf,
        size: u64,
        backup_type: BackupType,
        actor: &str,
        description: &str,
        record_count: Option<u64>,
    ) -> LabkeepResult<BackupRecord> {
        let inserted = file_digest(&path).and_then(|checksum| {
            let record =
                BackupRecord::new(path.clone(), size, backup_type, actor, description, checksum)
                    .with_record_count(record_count);
            self.catalog.insert(record)
        });

        if inserted.is_err() {
            discard_file(&path);
        }
        inserted
    }

    fn verify_if_configured(&self, record: BackupRecord, actor: &str) -> LabkeepResult<BackupRecord> {
        if self.settings.verify_after_create() {
            Ok(self.verify_record(record, actor)?.0)
        } else {
            Ok(record)
        }
    }

    fn verify_record(
        &self,
        mut record: BackupRecord,
        actor: &str,
    ) -> LabkeepResult<(BackupRecord, Verification)> {
        let outcome = IntegrityVerifier::new(self.probe.as_ref()).verify(&record);
        let now = Utc::now();
        match &outcome {
            Verification::Valid => record.mark_valid(actor, now),
            Verification::Corrupted(reason) => record.mark_corrupted(reason.to_string(), actor, now),
        }
        self.catalog.update(&record)?;
        Ok((record, outcome))
    }

    fn restore_locked(&self, id: BackupId, actor: &str) -> LabkeepResult<RestoreSummary> {
        let record = self.require(id)?;
        if let Some(reason) = record.corruption_reason() {
            return Err(LabkeepError::BackupCorrupted {
                id,
                reason: reason.to_string(),
            });
        }

        let (mut record, outcome) = self.verify_record(record, actor)?;
        if let Verification::Corrupted(reason) = outcome {
            return Err(LabkeepError::BackupCorrupted {
                id,
                reason: reason.to_string(),
            });
        }

        let safety_backup =
            self.create_locked(PRE_RESTORE_DESCRIPTION, BackupType::Automatic, actor)?;

        let orchestrator = RestoreOrchestrator::new(self.store.as_ref(), self.copier.as_ref());
        if let Err(e) = orchestrator.restore(&record.file_path) {
            if e.is_recoverable() {
                warn!(backup = %id, error = %e, "restore failed, live store unchanged");
            } else {
                error!(backup = %id, error = %e, "restore failed and live data is at risk");
            }
            record.error_message = Some(e.to_string());
            if let Err(update_err) = self.catalog.update(&record) {
                warn!(backup = %id, error = %update_err, "failed to record restore failure");
            }
            return Err(e);
        }

        if record.error_message.take().is_some() {
            if let Err(e) = self.catalog.update(&record) {
                warn!(backup = %id, error = %e, "failed to clear previous restore failure");
            }
        }

        info!(
            backup = %id,
            safety_backup = %safety_backup.id,
            "live store restored from backup"
        );
        Ok(RestoreSummary {
            restored: record,
            safety_backup,
        })
    }

    fn export_locked(&self, id: BackupId, destination: &Path) -> LabkeepResult<PathBuf> {
        let record = self.require(id)?;
        if !record.file_path.is_file() {
            return Err(LabkeepError::SourceMissing(record.file_path.clone()));
        }

        let target = if destination.is_dir() {
            destination.join(&record.file_name)
        } else {
            destination.to_path_buf()
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        if is_same_file(&record.file_path, &target) {
            info!(backup = %id, target = %target.display(), "export target is the backup itself");
            return Ok(target);
        }

        self.copier
            .copy(&record.file_path, &target)
            .map_err(|e| LabkeepError::CopyFailure(format!("Failed to export backup: {}", e)))?;

        info!(backup = %id, target = %target.display(), "backup exported");
        Ok(target)
    }

    fn audit_result<T>(
        &self,
        operation: Operation,
        target: Option<BackupId>,
        actor: &str,
        result: &LabkeepResult<T>,
        describe: impl FnOnce(&T) -> (Option<BackupId>, Option<String>),
    ) {
        let entry = match result {
            Ok(value) => {
                let (id, detail) = describe(value);
                AuditEntry::success(operation, id.or(target), actor, detail)
            }
            Err(e) => AuditEntry::failure(operation, target, actor, e.to_string()),
        };
        self.audit(entry);
    }

    fn audit(&self, entry: AuditEntry) {
        if let Some(logger) = &self.audit {
            if let Err(e) = logger.log(&entry) {
                warn!(error = %e, operation = %entry.operation, "failed to write audit entry");
            }
        }
    }
}

/// `dir/stem.ext`, or `dir/stem_N.ext` with the first free N
fn unique_path(dir: &Path, stem: &str, extension: Option<&str>) -> PathBuf {
    let file_name = |suffix: Option<u32>| {
        let base = match suffix {
            Some(n) => format!("{}_{}", stem, n),
            None => stem.to_string(),
        };
        match extension {
            Some(ext) => format!("{}.{}", base, ext),
            None => base,
        }
    };

    let mut candidate = dir.join(file_name(None));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(file_name(Some(n)));
        n += 1;
    }
    candidate
}

/// Whether both paths name the same existing file
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn discard_file(path: &Path) {
    if let Err(e) = remove_file_if_exists(path) {
        warn!(path = %path.display(), error = %e, "failed to remove unregistered file");
    }
}
