//! Backup subsystem for the laboratory store
//!
//! Point-in-time copies of the live store file, each cataloged with a
//! SHA-256 checksum and a verification state.
//!
//! # Architecture
//!
//! - `snapshot`: quiesces the live store and copies its file
//! - `checksum`: streaming SHA-256 of a file
//! - `catalog`: persistent records of every backup
//! - `verify`: existence, size, digest and structural checks
//! - `restore`: swaps a snapshot in with rollback on failure
//! - `retention`: count-based and corruption-based cleanup
//! - `service`: the facade callers use; serializes all operations
//!
//! A backup marked corrupted is never restored, and stays listed until it
//! is deleted or purged by `cleanup_corrupted`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use labkeep::backup::{BackupService, JsonCatalog};
//! use labkeep::config::{AppConfig, LabkeepPaths};
//! use labkeep::models::BackupType;
//! use labkeep::storage::SqliteStore;
//!
//! let config = AppConfig::load(LabkeepPaths::new()?)?;
//! let store = Arc::new(SqliteStore::open_existing(config.paths.live_store_file())?);
//! let catalog = Arc::new(JsonCatalog::open(config.paths.catalog_file())?);
//! let service = BackupService::new(store, catalog, Arc::new(config));
//!
//! let record = service.create("Before analyzer upgrade", BackupType::Manual, "tech01")?;
//! service.restore(record.id, "tech01")?;
//! ```

pub mod catalog;
pub mod checksum;
pub mod restore;
pub mod retention;
pub mod service;
pub mod snapshot;
pub mod verify;

pub use catalog::{BackupCatalog, JsonCatalog, MemoryCatalog};
pub use checksum::{digests_match, file_digest};
pub use restore::{temp_backup_path, RestoreOrchestrator, TEMP_BACKUP_SUFFIX};
pub use retention::{CleanupReport, RetentionManager};
pub use service::{BackupService, RestoreSummary, SYSTEM_ACTOR};
pub use snapshot::{create_snapshot, FileCopier, FsCopier, QuiescenceGuard};
pub use verify::{CorruptionReason, IntegrityVerifier, SnapshotProbe, SqliteProbe, Verification};
