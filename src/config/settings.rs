//! User settings for labkeep
//!
//! Manages the backup directory, retention limit and file naming, and exposes
//! them to the backup subsystem through [`SettingsProvider`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::LabkeepPaths;
use crate::error::LabkeepError;

/// Read access to the settings the backup subsystem depends on
pub trait SettingsProvider: Send + Sync {
    /// Directory backups are written to
    fn backup_directory(&self) -> PathBuf;

    /// How many backups retention keeps
    fn max_backup_files(&self) -> u32;

    /// Prefix of generated backup file names
    fn backup_file_prefix(&self) -> String {
        default_file_prefix()
    }

    /// Whether a new backup is verified right after it is written
    fn verify_after_create(&self) -> bool {
        true
    }
}

/// Backup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Backup directory; relative paths are resolved against the base directory.
    /// `None` means `<base>/Backups`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Number of backups to keep when cleaning up
    #[serde(default = "default_max_backup_files")]
    pub max_backup_files: u32,

    /// Prefix of generated backup file names
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Verify each backup right after it is created
    #[serde(default = "default_true")]
    pub verify_after_create: bool,
}

fn default_max_backup_files() -> u32 {
    10
}

fn default_file_prefix() -> String {
    "Laboratory".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            directory: None,
            max_backup_files: default_max_backup_files(),
            file_prefix: default_file_prefix(),
            verify_after_create: true,
        }
    }
}

/// User settings for labkeep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Backup policy
    #[serde(default)]
    pub backup: BackupSettings,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup: BackupSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &LabkeepPaths) -> Result<Self, LabkeepError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                LabkeepError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                LabkeepError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &LabkeepPaths) -> Result<(), LabkeepError> {
        paths.ensure_directories()?;

        let settings_path = paths.settings_file();
        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            LabkeepError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(&settings_path, contents).map_err(|e| {
            LabkeepError::Io(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }
}

/// Paths and settings resolved together
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub paths: LabkeepPaths,
    pub settings: Settings,
}

impl AppConfig {
    pub fn new(paths: LabkeepPaths, settings: Settings) -> Self {
        Self { paths, settings }
    }

    /// Load settings for the given paths
    pub fn load(paths: LabkeepPaths) -> Result<Self, LabkeepError> {
        let settings = Settings::load_or_create(&paths)?;
        Ok(Self { paths, settings })
    }
}

impl SettingsProvider for AppConfig {
    fn backup_directory(&self) -> PathBuf {
        match &self.settings.backup.directory {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.paths.base_dir().join(dir),
            None => self.paths.backup_dir(),
        }
    }

    fn max_backup_files(&self) -> u32 {
        self.settings.backup.max_backup_files
    }

    fn backup_file_prefix(&self) -> String {
        self.settings.backup.file_prefix.clone()
    }

    fn verify_after_create(&self) -> bool {
        self.settings.backup.verify_after_create
    }
}
