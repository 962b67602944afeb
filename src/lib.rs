//! labkeep - backup subsystem for the laboratory store
//!
//! Creates point-in-time copies of the single-file live store, verifies
//! them, enforces retention, and restores them with rollback on failure.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path resolution and settings
//! - `error`: Custom error types
//! - `models`: Backup records, kinds and verification state
//! - `storage`: The live store handle and JSON file helpers
//! - `backup`: Snapshot, checksum, catalog, verify, restore, retention
//! - `audit`: Audit trail of backup operations
//! - `cli`: Command handlers for the `labkeep` binary
//! - `display`: Terminal formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use labkeep::config::{AppConfig, LabkeepPaths};
//! use labkeep::cli::open_backup_service;
//!
//! let config = AppConfig::load(LabkeepPaths::new()?)?;
//! let service = open_backup_service(config)?;
//! for record in service.list_all()? {
//!     println!("{} {}", record.id, record.status);
//! }
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod storage;

pub use error::{LabkeepError, LabkeepResult};
