//! Audit entry data structures
//!
//! Defines the structure of audit log entries: which backup operation ran,
//! on which backup, by whom, and how it ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::BackupId;

/// Backup operations that are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Verify,
    Restore,
    Delete,
    Cleanup,
    Export,
    Import,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Verify => write!(f, "VERIFY"),
            Operation::Restore => write!(f, "RESTORE"),
            Operation::Delete => write!(f, "DELETE"),
            Operation::Cleanup => write!(f, "CLEANUP"),
            Operation::Export => write!(f, "EXPORT"),
            Operation::Import => write!(f, "IMPORT"),
        }
    }
}

/// How an audited operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the operation occurred (UTC)
    pub timestamp: DateTime<Utc>,

    /// Operation performed
    pub operation: Operation,

    /// Backup affected, when there is a single one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<BackupId>,

    /// Who asked for it
    pub actor: String,

    /// How it ended
    pub outcome: Outcome,

    /// Human-readable detail (file name, failure reason, counts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    /// Entry for an operation that succeeded
    pub fn success(
        operation: Operation,
        backup_id: Option<BackupId>,
        actor: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            backup_id,
            actor: actor.into(),
            outcome: Outcome::Success,
            detail,
        }
    }

    /// Entry for an operation that failed
    pub fn failure(
        operation: Operation,
        backup_id: Option<BackupId>,
        actor: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            backup_id,
            actor: actor.into(),
            outcome: Outcome::Failure,
            detail: Some(reason.into()),
        }
    }

    /// Format the entry for human-readable display
    pub fn format_human_readable(&self) -> String {
        let target = self
            .backup_id
            .map(|id| format!(" backup {}", id))
            .unwrap_or_default();
        let status = match self.outcome {
            Outcome::Success => "ok",
            Outcome::Failure => "FAILED",
        };

        let mut output = format!(
            "[{}] {}{} by {} ({})",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            target,
            self.actor,
            status
        );

        if let Some(detail) = &self.detail {
            output.push_str(&format!(": {}", detail));
        }

        output
    }
}
