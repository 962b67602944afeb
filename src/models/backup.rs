//! Backup record model
//!
//! One record per snapshot taken. Records are created by the backup service,
//! persisted by the catalog and never edited from outside the subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::ids::BackupId;

/// How a backup came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    /// Requested by an operator
    Manual,
    /// Taken by the subsystem itself (e.g. before a restore)
    Automatic,
    /// Triggered by an external timer
    Scheduled,
    /// Registered from an externally supplied file
    Imported,
}

impl BackupType {
    /// Parse backup type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "manual" => Some(Self::Manual),
            "automatic" | "auto" => Some(Self::Automatic),
            "scheduled" => Some(Self::Scheduled),
            "imported" | "import" => Some(Self::Imported),
            _ => None,
        }
    }
}

impl Default for BackupType {
    fn default() -> Self {
        Self::Manual
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "Manual"),
            Self::Automatic => write!(f, "Automatic"),
            Self::Scheduled => write!(f, "Scheduled"),
            Self::Imported => write!(f, "Imported"),
        }
    }
}

/// Outcome of the most recent integrity check
///
/// `Corrupted` is sticky: once a record reaches it, only deletion removes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Never checked
    #[default]
    Unverified,
    /// Last check passed
    Valid {
        verified_at: DateTime<Utc>,
        verified_by: String,
    },
    /// A check failed at some point
    Corrupted {
        reason: String,
        verified_at: DateTime<Utc>,
        verified_by: String,
    },
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unverified => write!(f, "Unverified"),
            Self::Valid { .. } => write!(f, "Verified"),
            Self::Corrupted { .. } => write!(f, "Corrupted"),
        }
    }
}

/// Metadata about one snapshot file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Catalog-assigned identifier
    pub id: BackupId,

    /// File name inside the backup directory
    pub file_name: String,

    /// Full path to the snapshot
    pub file_path: PathBuf,

    /// Size in bytes when the snapshot was taken
    pub file_size_bytes: u64,

    /// When the snapshot was taken
    pub backup_date: DateTime<Utc>,

    /// How the backup came to exist
    pub backup_type: BackupType,

    /// Who requested it
    pub created_by: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Hex SHA-256 of the snapshot at creation time
    pub checksum: String,

    /// Verification state
    #[serde(default)]
    pub status: VerificationStatus,

    /// Last verification or restore failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Approximate number of rows in the live store at snapshot time.
    /// Diagnostic only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
}

impl BackupRecord {
    /// Create an unverified, not yet cataloged record
    pub fn new(
        file_path: PathBuf,
        file_size_bytes: u64,
        backup_type: BackupType,
        created_by: impl Into<String>,
        description: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        let file_name = file_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            id: BackupId::new(0),
            file_name,
            file_path,
            file_size_bytes,
            backup_date: Utc::now(),
            backup_type,
            created_by: created_by.into(),
            description: description.into(),
            checksum: checksum.into(),
            status: VerificationStatus::Unverified,
            error_message: None,
            record_count: None,
        }
    }

    /// Set the advisory row count
    pub fn with_record_count(mut self, record_count: Option<u64>) -> Self {
        self.record_count = record_count;
        self
    }

    /// Whether an integrity check has ever run on this record
    pub fn is_verified(&self) -> bool {
        !matches!(self.status, VerificationStatus::Unverified)
    }

    /// Whether corruption has ever been detected
    pub fn is_corrupted(&self) -> bool {
        matches!(self.status, VerificationStatus::Corrupted { .. })
    }

    /// Whether the last check passed
    pub fn is_valid(&self) -> bool {
        matches!(self.status, VerificationStatus::Valid { .. })
    }

    /// When the last check ran
    pub fn verified_date(&self) -> Option<DateTime<Utc>> {
        match &self.status {
            VerificationStatus::Unverified => None,
            VerificationStatus::Valid { verified_at, .. }
            | VerificationStatus::Corrupted { verified_at, .. } => Some(*verified_at),
        }
    }

    /// Who ran the last check
    pub fn verified_by(&self) -> Option<&str> {
        match &self.status {
            VerificationStatus::Unverified => None,
            VerificationStatus::Valid { verified_by, .. }
            | VerificationStatus::Corrupted { verified_by, .. } => Some(verified_by),
        }
    }

    /// Reason corruption was detected, if it was
    pub fn corruption_reason(&self) -> Option<&str> {
        match &self.status {
            VerificationStatus::Corrupted { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Record a passing integrity check.
    ///
    /// A corrupted record stays corrupted; only the check time moves.
    pub fn mark_valid(&mut self, actor: impl Into<String>, at: DateTime<Utc>) {
        let actor = actor.into();
        match &mut self.status {
            VerificationStatus::Corrupted {
                verified_at,
                verified_by,
                ..
            } => {
                *verified_at = at;
                *verified_by = actor;
            }
            _ => {
                self.status = VerificationStatus::Valid {
                    verified_at: at,
                    verified_by: actor,
                };
            }
        }
    }

    /// Record a failing integrity check
    pub fn mark_corrupted(
        &mut self,
        reason: impl Into<String>,
        actor: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        let reason = reason.into();
        self.error_message = Some(reason.clone());
        self.status = VerificationStatus::Corrupted {
            reason,
            verified_at: at,
            verified_by: actor.into(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> BackupRecord {
        BackupRecord::new(
            PathBuf::from("/backups/Laboratory_Backup_20260101_120000.db"),
            4096,
            BackupType::Manual,
            "tech01",
            "Before upgrade",
            "abc123",
        )
    }

    #[test]
    fn test_new_record_is_unverified() {
        let record = sample_record();
        assert_eq!(record.file_name, "Laboratory_Backup_20260101_120000.db");
        assert!(!record.is_verified());
        assert!(!record.is_corrupted());
        assert!(record.verified_date().is_none());
    }

    #[test]
    fn test_mark_valid() {
        let mut record = sample_record();
        let now = Utc::now();
        record.mark_valid("tech02", now);

        assert!(record.is_verified());
        assert!(record.is_valid());
        assert_eq!(record.verified_date(), Some(now));
        assert_eq!(record.verified_by(), Some("tech02"));
    }

    #[test]
    fn test_corruption_is_sticky() {
        let mut record = sample_record();
        let first = Utc::now();
        record.mark_corrupted("Checksum mismatch", "system", first);

        let later = first + chrono::Duration::seconds(30);
        record.mark_valid("tech02", later);

        assert!(record.is_corrupted());
        assert!(record.is_verified());
        assert_eq!(record.corruption_reason(), Some("Checksum mismatch"));
        assert_eq!(record.verified_date(), Some(later));
        assert_eq!(record.error_message.as_deref(), Some("Checksum mismatch"));
    }

    #[test]
    fn test_backup_type_parse() {
        assert_eq!(BackupType::parse("manual"), Some(BackupType::Manual));
        assert_eq!(BackupType::parse("Auto"), Some(BackupType::Automatic));
        assert_eq!(BackupType::parse("imported"), Some(BackupType::Imported));
        assert_eq!(BackupType::parse("nightly"), None);
    }

    #[test]
    fn test_serde_round_trip_keeps_status() {
        let mut record = sample_record();
        record.mark_corrupted("File missing", "system", Utc::now());

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"state\":\"corrupted\""));

        let deserialized: BackupRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, deserialized);
    }
}
