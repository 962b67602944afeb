//! Path management for labkeep
//!
//! Provides XDG-compliant path resolution for configuration, the live store,
//! the backup catalog and backups.
//!
//! ## Path Resolution Order
//!
//! 1. `LABKEEP_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/labkeep` or `~/.config/labkeep`
//! 3. Windows: `%APPDATA%\labkeep`

use std::path::PathBuf;

use crate::error::LabkeepError;

/// Default name of the backup directory under the base directory
pub const DEFAULT_BACKUP_DIR_NAME: &str = "Backups";

/// Manages all paths used by labkeep
#[derive(Debug, Clone)]
pub struct LabkeepPaths {
    /// Base directory for all labkeep data
    base_dir: PathBuf,
}

impl LabkeepPaths {
    /// Create a new LabkeepPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, LabkeepError> {
        let base_dir = if let Ok(custom) = std::env::var("LABKEEP_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create LabkeepPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.config/labkeep/ or equivalent)
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (~/.config/labkeep/data/)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the default backup directory (~/.config/labkeep/Backups/)
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join(DEFAULT_BACKUP_DIR_NAME)
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Get the path to the live laboratory store
    pub fn live_store_file(&self) -> PathBuf {
        self.data_dir().join("laboratory.db")
    }

    /// Get the path to the backup catalog
    pub fn catalog_file(&self) -> PathBuf {
        self.data_dir().join("backup_catalog.json")
    }

    /// Ensure the base and data directories exist
    ///
    /// The backup directory is configurable and created on first use.
    pub fn ensure_directories(&self) -> Result<(), LabkeepError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| LabkeepError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| LabkeepError::Io(format!("Failed to create data directory: {}", e)))?;

        Ok(())
    }

    /// Check if labkeep has been initialized (live store exists)
    pub fn is_initialized(&self) -> bool {
        self.live_store_file().exists()
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, LabkeepError> {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(config_home).join("labkeep"));
    }
    let home = std::env::var("HOME")
        .map_err(|_| LabkeepError::Config("Could not determine HOME directory".into()))?;
    Ok(PathBuf::from(home).join(".config").join("labkeep"))
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, LabkeepError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| LabkeepError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("labkeep"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LabkeepPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(paths.backup_dir(), temp_dir.path().join("Backups"));
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();
        let custom_path = temp_dir.path().to_str().unwrap();

        env::set_var("LABKEEP_DATA_DIR", custom_path);

        let paths = LabkeepPaths::new().unwrap();
        assert_eq!(paths.base_dir(), temp_dir.path());

        env::remove_var("LABKEEP_DATA_DIR");
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LabkeepPaths::with_base_dir(temp_dir.path().to_path_buf());

        paths.ensure_directories().unwrap();

        assert!(paths.data_dir().exists());
        assert!(!paths.is_initialized());
    }

    #[test]
    fn test_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LabkeepPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
        assert_eq!(
            paths.live_store_file(),
            temp_dir.path().join("data").join("laboratory.db")
        );
        assert_eq!(
            paths.catalog_file(),
            temp_dir.path().join("data").join("backup_catalog.json")
        );
    }
}
