//! Core data models for labkeep
//!
//! This module contains the backup catalog's data structures: records,
//! backup kinds, verification state and ids.

pub mod backup;
pub mod ids;

pub use backup::{BackupRecord, BackupType, VerificationStatus};
pub use ids::BackupId;
