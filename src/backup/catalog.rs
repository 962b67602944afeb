//! Backup catalog
//!
//! Persists one [`BackupRecord`] per snapshot. The catalog is a pure
//! persistence boundary: it assigns ids and stores rows, nothing else.
//!
//! [`JsonCatalog`] keeps the rows in a sidecar JSON file next to the live
//! store; [`MemoryCatalog`] keeps them in memory.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LabkeepError, LabkeepResult};
use crate::models::{BackupId, BackupRecord, BackupType};
use crate::storage::{read_json, write_json_atomic};

/// CRUD over backup records
pub trait BackupCatalog: Send + Sync {
    /// Store a new record, assigning it the next id
    fn insert(&self, record: BackupRecord) -> LabkeepResult<BackupRecord>;

    /// Replace a stored record
    fn update(&self, record: &BackupRecord) -> LabkeepResult<()>;

    /// Look up a record by id
    fn get(&self, id: BackupId) -> LabkeepResult<Option<BackupRecord>>;

    /// All records, newest first
    fn list_all(&self) -> LabkeepResult<Vec<BackupRecord>>;

    /// Remove a record; returns whether it existed
    fn delete(&self, id: BackupId) -> LabkeepResult<bool>;

    /// Records with `from <= backup_date <= to`, newest first
    fn list_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> LabkeepResult<Vec<BackupRecord>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|r| r.backup_date >= from && r.backup_date <= to)
            .collect())
    }

    /// Records of one kind, newest first
    fn list_by_type(&self, backup_type: BackupType) -> LabkeepResult<Vec<BackupRecord>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|r| r.backup_type == backup_type)
            .collect())
    }
}

/// Serializable catalog contents
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogData {
    next_id: u64,
    backups: Vec<BackupRecord>,
}

impl Default for CatalogData {
    fn default() -> Self {
        Self {
            next_id: 1,
            backups: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct CatalogState {
    next_id: BackupId,
    records: BTreeMap<BackupId, BackupRecord>,
}

impl CatalogState {
    fn from_data(data: CatalogData) -> Self {
        let records: BTreeMap<_, _> = data.backups.into_iter().map(|r| (r.id, r)).collect();
        // never hand out an id that is already on disk
        let max_seen = records.keys().next_back().map(|id| id.next());
        let next_id = match max_seen {
            Some(candidate) if candidate.as_u64() > data.next_id => candidate,
            _ => BackupId::new(data.next_id.max(1)),
        };
        Self { next_id, records }
    }

    fn to_data(&self) -> CatalogData {
        CatalogData {
            next_id: self.next_id.as_u64(),
            backups: self.records.values().cloned().collect(),
        }
    }

    fn insert(&mut self, mut record: BackupRecord) -> BackupRecord {
        record.id = self.next_id;
        self.next_id = self.next_id.next();
        self.records.insert(record.id, record.clone());
        record
    }

    fn update(&mut self, record: &BackupRecord) -> LabkeepResult<()> {
        match self.records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(LabkeepError::backup_not_found(record.id)),
        }
    }

    fn sorted(&self) -> Vec<BackupRecord> {
        let mut records: Vec<_> = self.records.values().cloned().collect();
        records.sort_by(|a, b| {
            b.backup_date
                .cmp(&a.backup_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        records
    }
}

fn lock_error(e: impl std::fmt::Display) -> LabkeepError {
    LabkeepError::Catalog(format!("Failed to acquire catalog lock: {}", e))
}

/// Catalog persisted to a JSON sidecar file
pub struct JsonCatalog {
    path: PathBuf,
    state: RwLock<CatalogState>,
}

impl JsonCatalog {
    /// Load the catalog from `path`, starting empty if the file doesn't exist
    pub fn open(path: impl Into<PathBuf>) -> LabkeepResult<Self> {
        let path = path.into();
        let data: CatalogData = read_json(&path)
            .map_err(|e| LabkeepError::Catalog(format!("Failed to load catalog: {}", e)))?;

        Ok(Self {
            path,
            state: RwLock::new(CatalogState::from_data(data)),
        })
    }

    /// Path of the sidecar file
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn save(&self, state: &CatalogState) -> LabkeepResult<()> {
        write_json_atomic(&self.path, &state.to_data())
            .map_err(|e| LabkeepError::Catalog(format!("Failed to save catalog: {}", e)))
    }
}

impl BackupCatalog for JsonCatalog {
    fn insert(&self, record: BackupRecord) -> LabkeepResult<BackupRecord> {
        let mut state = self.state.write().map_err(lock_error)?;
        let previous_next = state.next_id;
        let stored = state.insert(record);

        if let Err(e) = self.save(&state) {
            state.records.remove(&stored.id);
            state.next_id = previous_next;
            return Err(e);
        }
        Ok(stored)
    }

    fn update(&self, record: &BackupRecord) -> LabkeepResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let previous = state.records.get(&record.id).cloned();
        state.update(record)?;

        if let Err(e) = self.save(&state) {
            if let Some(previous) = previous {
                state.records.insert(previous.id, previous);
            }
            return Err(e);
        }
        Ok(())
    }

    fn get(&self, id: BackupId) -> LabkeepResult<Option<BackupRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.records.get(&id).cloned())
    }

    fn list_all(&self) -> LabkeepResult<Vec<BackupRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.sorted())
    }

    fn delete(&self, id: BackupId) -> LabkeepResult<bool> {
        let mut state = self.state.write().map_err(lock_error)?;
        let Some(removed) = state.records.remove(&id) else {
            return Ok(false);
        };

        if let Err(e) = self.save(&state) {
            state.records.insert(id, removed);
            return Err(e);
        }
        Ok(true)
    }
}

/// Catalog kept in memory only
pub struct MemoryCatalog {
    state: RwLock<CatalogState>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CatalogState::from_data(CatalogData::default())),
        }
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupCatalog for MemoryCatalog {
    fn insert(&self, record: BackupRecord) -> LabkeepResult<BackupRecord> {
        let mut state = self.state.write().map_err(lock_error)?;
        Ok(state.insert(record))
    }

    fn update(&self, record: &BackupRecord) -> LabkeepResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.update(record)
    }

    fn get(&self, id: BackupId) -> LabkeepResult<Option<BackupRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.records.get(&id).cloned())
    }

    fn list_all(&self) -> LabkeepResult<Vec<BackupRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.sorted())
    }

    fn delete(&self, id: BackupId) -> LabkeepResult<bool> {
        let mut state = self.state.write().map_err(lock_error)?;
        Ok(state.records.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn record_at(name: &str, kind: BackupType, at: DateTime<Utc>) -> BackupRecord {
        let mut record = BackupRecord::new(
            PathBuf::from(format!("/backups/{}", name)),
            100,
            kind,
            "tech01",
            "",
            "deadbeef",
        );
        record.backup_date = at;
        record
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_insert_assigns_monotonic_ids() {
        let catalog = MemoryCatalog::new();
        let a = catalog
            .insert(record_at("a.db", BackupType::Manual, base_time()))
            .unwrap();
        let b = catalog
            .insert(record_at("b.db", BackupType::Manual, base_time()))
            .unwrap();

        assert_eq!(a.id, BackupId::new(1));
        assert_eq!(b.id, BackupId::new(2));

        catalog.delete(b.id).unwrap();
        let c = catalog
            .insert(record_at("c.db", BackupType::Manual, base_time()))
            .unwrap();
        assert_eq!(c.id, BackupId::new(3));
    }

    #[test]
    fn test_list_all_newest_first() {
        let catalog = MemoryCatalog::new();
        let t = base_time();
        catalog.insert(record_at("old.db", BackupType::Manual, t)).unwrap();
        catalog
            .insert(record_at("new.db", BackupType::Manual, t + Duration::hours(2)))
            .unwrap();
        catalog
            .insert(record_at("mid.db", BackupType::Manual, t + Duration::hours(1)))
            .unwrap();

        let names: Vec<_> = catalog
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.file_name)
            .collect();
        assert_eq!(names, vec!["new.db", "mid.db", "old.db"]);
    }

    #[test]
    fn test_filters() {
        let catalog = MemoryCatalog::new();
        let t = base_time();
        catalog.insert(record_at("a.db", BackupType::Manual, t)).unwrap();
        catalog
            .insert(record_at("b.db", BackupType::Scheduled, t + Duration::days(1)))
            .unwrap();
        catalog
            .insert(record_at("c.db", BackupType::Manual, t + Duration::days(2)))
            .unwrap();

        let manual = catalog.list_by_type(BackupType::Manual).unwrap();
        assert_eq!(manual.len(), 2);

        let ranged = catalog
            .list_by_date_range(t + Duration::days(1), t + Duration::days(2))
            .unwrap();
        assert_eq!(ranged.len(), 2);
        assert_eq!(ranged[0].file_name, "c.db");
    }

    #[test]
    fn test_update_unknown_record_fails() {
        let catalog = MemoryCatalog::new();
        let mut record = record_at("a.db", BackupType::Manual, base_time());
        record.id = BackupId::new(99);
        assert!(catalog.update(&record).unwrap_err().is_not_found());
    }

    #[test]
    fn test_json_catalog_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("backup_catalog.json");

        {
            let catalog = JsonCatalog::open(&path).unwrap();
            let mut stored = catalog
                .insert(record_at("a.db", BackupType::Manual, base_time()))
                .unwrap();
            stored.description = "after verify".into();
            catalog.update(&stored).unwrap();
            catalog
                .insert(record_at("b.db", BackupType::Imported, base_time()))
                .unwrap();
            catalog.delete(BackupId::new(2)).unwrap();
        }

        let reopened = JsonCatalog::open(&path).unwrap();
        let all = reopened.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "after verify");

        // ids keep counting after a reload, even past deleted rows
        let next = reopened
            .insert(record_at("c.db", BackupType::Manual, base_time()))
            .unwrap();
        assert_eq!(next.id, BackupId::new(3));
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let temp = TempDir::new().unwrap();
        let catalog = JsonCatalog::open(temp.path().join("c.json")).unwrap();
        assert!(!catalog.delete(BackupId::new(5)).unwrap());
    }
}
