//! Strongly-typed ID wrappers
//!
//! Backup ids are assigned by the catalog from a monotonic counter, so unlike
//! random UUIDs they sort in creation order and read well on a command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Catalog-assigned identifier of a backup record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupId(u64);

impl BackupId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the underlying integer
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The id following this one
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for BackupId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl FromStr for BackupId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('#').unwrap_or(s);
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(BackupId::new(42).to_string(), "#42");
    }

    #[test]
    fn test_id_parse_with_and_without_prefix() {
        assert_eq!("17".parse::<BackupId>().unwrap(), BackupId::new(17));
        assert_eq!("#17".parse::<BackupId>().unwrap(), BackupId::new(17));
        assert!("abc".parse::<BackupId>().is_err());
    }

    #[test]
    fn test_id_ordering() {
        let first = BackupId::new(1);
        assert!(first < first.next());
    }

    #[test]
    fn test_id_serialization() {
        let id = BackupId::new(9);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "9");
        let deserialized: BackupId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
