//! Configuration module for labkeep
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - User settings persistence
//! - The settings view consumed by the backup subsystem

pub mod paths;
pub mod settings;

pub use paths::LabkeepPaths;
pub use settings::{AppConfig, BackupSettings, Settings, SettingsProvider};
