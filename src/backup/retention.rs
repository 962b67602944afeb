//! Retention policy enforcement
//!
//! Removes backups beyond a maximum count, or every corrupted backup. Each
//! record is deleted independently; one failure never stops the batch.

use tracing::{info, warn};

use super::catalog::BackupCatalog;
use crate::error::{LabkeepError, LabkeepResult};
use crate::models::{BackupId, BackupRecord};
use crate::storage::remove_file_if_exists;

/// Outcome of a cleanup run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Records removed
    pub deleted: Vec<BackupId>,
    /// Records that could not be removed, with the reason
    pub failures: Vec<(BackupId, String)>,
}

impl CleanupReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line description of the run
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            format!("Deleted {} backup(s)", self.deleted.len())
        } else {
            format!(
                "Deleted {} backup(s), {} could not be deleted",
                self.deleted.len(),
                self.failures.len()
            )
        }
    }
}

/// Applies cleanup policies to a catalog
pub struct RetentionManager<'a> {
    catalog: &'a dyn BackupCatalog,
}

impl<'a> RetentionManager<'a> {
    pub fn new(catalog: &'a dyn BackupCatalog) -> Self {
        Self { catalog }
    }

    /// Keep the `max_to_keep` newest backups and delete the rest
    pub fn cleanup_excess(&self, max_to_keep: usize) -> LabkeepResult<CleanupReport> {
        let candidates: Vec<_> = self
            .catalog
            .list_all()?
            .into_iter()
            .skip(max_to_keep)
            .collect();

        let report = self.delete_all(&candidates);
        info!(
            keep = max_to_keep,
            deleted = report.deleted_count(),
            failed = report.failures.len(),
            "excess backups cleaned up"
        );
        Ok(report)
    }

    /// Delete every backup marked corrupted
    pub fn cleanup_corrupted(&self) -> LabkeepResult<CleanupReport> {
        let candidates: Vec<_> = self
            .catalog
            .list_all()?
            .into_iter()
            .filter(BackupRecord::is_corrupted)
            .collect();

        let report = self.delete_all(&candidates);
        info!(
            deleted = report.deleted_count(),
            failed = report.failures.len(),
            "corrupted backups cleaned up"
        );
        Ok(report)
    }

    /// Remove a record's file and catalog row
    ///
    /// A file that is already gone is not an error.
    pub fn delete_record(&self, record: &BackupRecord) -> LabkeepResult<()> {
        remove_file_if_exists(&record.file_path).map_err(|e| {
            LabkeepError::Io(format!(
                "Failed to delete backup file {}: {}",
                record.file_path.display(),
                e
            ))
        })?;

        self.catalog.delete(record.id)?;
        Ok(())
    }

    fn delete_all(&self, records: &[BackupRecord]) -> CleanupReport {
        let mut report = CleanupReport::default();
        for record in records {
            match self.delete_record(record) {
                Ok(()) => report.deleted.push(record.id),
                Err(e) => {
                    warn!(backup = %record.id, error = %e, "failed to delete backup");
                    report.failures.push((record.id, e.to_string()));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::catalog::MemoryCatalog;
    use crate::models::BackupType;
    use chrono::{Duration, TimeZone, Utc};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn add_backup(catalog: &MemoryCatalog, dir: &Path, name: &str, hours: i64) -> BackupRecord {
        let path = dir.join(name);
        fs::write(&path, name.as_bytes()).unwrap();
        let mut record = BackupRecord::new(path, 0, BackupType::Manual, "tech01", "", "00");
        record.backup_date = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap()
            + Duration::hours(hours);
        catalog.insert(record).unwrap()
    }

    #[test]
    fn test_cleanup_excess_keeps_newest() {
        let temp = TempDir::new().unwrap();
        let catalog = MemoryCatalog::new();
        let t1 = add_backup(&catalog, temp.path(), "t1.db", 1);
        let t2 = add_backup(&catalog, temp.path(), "t2.db", 2);
        let t3 = add_backup(&catalog, temp.path(), "t3.db", 3);

        let report = RetentionManager::new(&catalog).cleanup_excess(2).unwrap();

        assert_eq!(report.deleted, vec![t1.id]);
        assert!(report.is_clean());
        assert!(!t1.file_path.exists());
        let remaining: Vec<_> = catalog.list_all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(remaining, vec![t3.id, t2.id]);
    }

    #[test]
    fn test_cleanup_excess_boundary() {
        let temp = TempDir::new().unwrap();
        let catalog = MemoryCatalog::new();
        for i in 0..7 {
            add_backup(&catalog, temp.path(), &format!("b{}.db", i), i);
        }

        let report = RetentionManager::new(&catalog).cleanup_excess(4).unwrap();
        assert_eq!(report.deleted_count(), 3);

        let remaining = catalog.list_all().unwrap();
        assert_eq!(remaining.len(), 4);
        let names: Vec<_> = remaining.iter().map(|r| r.file_name.clone()).collect();
        assert_eq!(names, vec!["b6.db", "b5.db", "b4.db", "b3.db"]);
    }

    #[test]
    fn test_cleanup_excess_with_room_deletes_nothing() {
        let temp = TempDir::new().unwrap();
        let catalog = MemoryCatalog::new();
        add_backup(&catalog, temp.path(), "only.db", 0);

        let report = RetentionManager::new(&catalog).cleanup_excess(5).unwrap();
        assert_eq!(report.deleted_count(), 0);
        assert_eq!(catalog.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_cleanup_corrupted() {
        let temp = TempDir::new().unwrap();
        let catalog = MemoryCatalog::new();
        let good = add_backup(&catalog, temp.path(), "good.db", 1);
        let mut bad = add_backup(&catalog, temp.path(), "bad.db", 2);
        bad.mark_corrupted("Checksum mismatch", "system", Utc::now());
        catalog.update(&bad).unwrap();

        let report = RetentionManager::new(&catalog).cleanup_corrupted().unwrap();

        assert_eq!(report.deleted, vec![bad.id]);
        assert!(catalog.get(good.id).unwrap().is_some());
        assert!(catalog.get(bad.id).unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let catalog = MemoryCatalog::new();
        let record = add_backup(&catalog, temp.path(), "vanished.db", 0);
        fs::remove_file(&record.file_path).unwrap();

        RetentionManager::new(&catalog).delete_record(&record).unwrap();
        assert!(catalog.get(record.id).unwrap().is_none());
    }

    #[test]
    fn test_failure_does_not_abort_batch() {
        let temp = TempDir::new().unwrap();
        let catalog = MemoryCatalog::new();
        let oldest = add_backup(&catalog, temp.path(), "oldest.db", 0);
        // a directory where the file should be cannot be removed as a file
        let stuck = add_backup(&catalog, temp.path(), "stuck.db", 1);
        fs::remove_file(&stuck.file_path).unwrap();
        fs::create_dir(&stuck.file_path).unwrap();
        add_backup(&catalog, temp.path(), "newest.db", 2);

        let report = RetentionManager::new(&catalog).cleanup_excess(1).unwrap();

        assert_eq!(report.deleted, vec![oldest.id]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, stuck.id);
        assert!(report.summary().contains("could not be deleted"));
        assert!(catalog.get(stuck.id).unwrap().is_some());
    }
}
