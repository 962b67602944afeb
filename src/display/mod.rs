//! Display formatting for terminal output
//!
//! Formats backup records and cleanup results for the CLI.

pub mod backup;

pub use backup::{
    format_age, format_backup_details, format_backup_list, format_cleanup_report, format_size,
};
