//! Custom error types for labkeep
//!
//! This module defines the error hierarchy for the backup subsystem using
//! thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::BackupId;

/// The main error type for labkeep operations
#[derive(Error, Debug)]
pub enum LabkeepError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Invalid caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Live store errors (open, close, health check)
    #[error("Storage error: {0}")]
    Storage(String),

    /// The file a snapshot or import should be taken from does not exist
    #[error("Source file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// I/O failure during a file copy
    #[error("Copy failed: {0}")]
    CopyFailure(String),

    /// Backup file size differs from the size recorded at creation
    #[error("Size mismatch: expected {expected} bytes, found {actual} bytes")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Backup file digest differs from the checksum recorded at creation
    #[error("Checksum mismatch: expected {expected}, found {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// Backup file cannot be opened as a store
    #[error("Snapshot is not a readable store: {0}")]
    StructuralCorruption(String),

    /// Restore failed and so did the rollback; the live store is indeterminate
    #[error(
        "Restore failed ({restore_error}) and rollback failed ({rollback_error}); \
         pre-restore data kept at {}",
        .temp_path.display()
    )]
    RestoreRollbackFailure {
        restore_error: String,
        rollback_error: String,
        temp_path: PathBuf,
    },

    /// Catalog persistence errors
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Restore refused because the backup is known to be corrupted
    #[error("Backup {id} is corrupted: {reason}")]
    BackupCorrupted { id: BackupId, reason: String },
}

impl LabkeepError {
    /// Create a "not found" error for backups
    pub fn backup_not_found(id: BackupId) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: id.to_string(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error describes a damaged backup file
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::SizeMismatch { .. }
                | Self::DigestMismatch { .. }
                | Self::StructuralCorruption(_)
                | Self::BackupCorrupted { .. }
        )
    }

    /// Whether the caller can carry on after this error.
    ///
    /// A failed rollback means live data is at risk and must not be ignored.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::RestoreRollbackFailure { .. })
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for LabkeepError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LabkeepError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<rusqlite::Error> for LabkeepError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias for labkeep operations
pub type LabkeepResult<T> = Result<T, LabkeepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LabkeepError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = LabkeepError::backup_not_found(BackupId::new(7));
        assert_eq!(err.to_string(), "Backup not found: #7");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_size_mismatch_display() {
        let err = LabkeepError::SizeMismatch {
            expected: 4096,
            actual: 100,
        };
        assert_eq!(
            err.to_string(),
            "Size mismatch: expected 4096 bytes, found 100 bytes"
        );
        assert!(err.is_corruption());
    }

    #[test]
    fn test_only_rollback_failure_is_fatal() {
        let fatal = LabkeepError::RestoreRollbackFailure {
            restore_error: "disk full".into(),
            rollback_error: "disk full".into(),
            temp_path: PathBuf::from("/data/laboratory.db.temp_backup"),
        };
        assert!(!fatal.is_recoverable());
        assert!(fatal.to_string().contains("laboratory.db.temp_backup"));

        assert!(LabkeepError::CopyFailure("boom".into()).is_recoverable());
        assert!(LabkeepError::SourceMissing(PathBuf::from("x")).is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LabkeepError = io_err.into();
        assert!(matches!(err, LabkeepError::Io(_)));
    }
}
