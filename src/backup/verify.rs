//! Integrity verification of backup files
//!
//! Checks run in order and stop at the first failure: existence, size,
//! digest, then a structural probe that opens the snapshot as a store.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::checksum::{digests_match, file_digest};
use crate::error::{LabkeepError, LabkeepResult};
use crate::models::BackupRecord;
use crate::storage::probe_read_only;

/// Opens a snapshot file as a store without modifying it
pub trait SnapshotProbe: Send + Sync {
    fn probe(&self, path: &Path) -> LabkeepResult<()>;
}

/// Read-only SQLite open plus a `sqlite_master` query
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteProbe;

impl SnapshotProbe for SqliteProbe {
    fn probe(&self, path: &Path) -> LabkeepResult<()> {
        probe_read_only(path)
    }
}

/// Why a backup was judged corrupted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorruptionReason {
    FileMissing(PathBuf),
    SizeMismatch { expected: u64, actual: u64 },
    DigestMismatch { expected: String, actual: String },
    Unreadable(String),
    Structural(String),
}

impl fmt::Display for CorruptionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileMissing(path) => write!(f, "Backup file not found: {}", path.display()),
            Self::SizeMismatch { expected, actual } => write!(
                f,
                "File size mismatch: expected {} bytes, found {} bytes",
                expected, actual
            ),
            Self::DigestMismatch { expected, actual } => write!(
                f,
                "Checksum mismatch: expected {}, found {}",
                expected, actual
            ),
            Self::Unreadable(detail) => write!(f, "Backup file unreadable: {}", detail),
            Self::Structural(detail) => write!(f, "Backup is not a readable store: {}", detail),
        }
    }
}

impl From<CorruptionReason> for LabkeepError {
    fn from(reason: CorruptionReason) -> Self {
        match reason {
            CorruptionReason::FileMissing(path) => LabkeepError::SourceMissing(path),
            CorruptionReason::SizeMismatch { expected, actual } => {
                LabkeepError::SizeMismatch { expected, actual }
            }
            CorruptionReason::DigestMismatch { expected, actual } => {
                LabkeepError::DigestMismatch { expected, actual }
            }
            CorruptionReason::Unreadable(detail) => LabkeepError::Io(detail),
            CorruptionReason::Structural(detail) => LabkeepError::StructuralCorruption(detail),
        }
    }
}

/// Result of verifying one backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Corrupted(CorruptionReason),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Runs the integrity checks
pub struct IntegrityVerifier<'a> {
    probe: &'a dyn SnapshotProbe,
}

impl<'a> IntegrityVerifier<'a> {
    pub fn new(probe: &'a dyn SnapshotProbe) -> Self {
        Self { probe }
    }

    /// Check a record's file against what was recorded at creation
    pub fn verify(&self, record: &BackupRecord) -> Verification {
        let outcome = self.check(record);
        match &outcome {
            Verification::Valid => debug!(backup = %record.id, "backup verified"),
            Verification::Corrupted(reason) => {
                warn!(backup = %record.id, reason = %reason, "backup failed verification")
            }
        }
        outcome
    }

    fn check(&self, record: &BackupRecord) -> Verification {
        let path = &record.file_path;

        let metadata = match fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Verification::Corrupted(CorruptionReason::FileMissing(path.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Verification::Corrupted(CorruptionReason::FileMissing(path.clone()))
            }
            Err(e) => return Verification::Corrupted(CorruptionReason::Unreadable(e.to_string())),
        };

        if metadata.len() != record.file_size_bytes {
            return Verification::Corrupted(CorruptionReason::SizeMismatch {
                expected: record.file_size_bytes,
                actual: metadata.len(),
            });
        }

        let digest = match file_digest(path) {
            Ok(d) => d,
            Err(e) => return Verification::Corrupted(CorruptionReason::Unreadable(e.to_string())),
        };
        if !digests_match(&digest, &record.checksum) {
            return Verification::Corrupted(CorruptionReason::DigestMismatch {
                expected: record.checksum.clone(),
                actual: digest,
            });
        }

        match self.probe.probe(path) {
            Ok(()) => Verification::Valid,
            Err(e) => Verification::Corrupted(CorruptionReason::Structural(e.to_string())),
        }
    }
}
