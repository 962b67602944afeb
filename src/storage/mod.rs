//! Storage layer for labkeep
//!
//! Provides the live store handle the backup subsystem quiesces, plus JSON
//! file helpers with atomic writes used by the catalog and settings.

pub mod file_io;
pub mod live;

pub use file_io::{copy_file_synced, read_json, remove_file_if_exists, write_json_atomic};
pub use live::{probe_read_only, LiveStore, SqliteStore};
