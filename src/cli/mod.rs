//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup service.

pub mod backup;

pub use backup::{handle_backup_command, open_backup_service, BackupCommands};
