//! Backup CLI commands
//!
//! Implements CLI commands for backup management.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use std::path::PathBuf;
use std::sync::Arc;

use crate::audit::AuditLogger;
use crate::backup::{BackupService, JsonCatalog};
use crate::config::{AppConfig, SettingsProvider};
use crate::display::{format_backup_details, format_backup_list, format_cleanup_report, format_size};
use crate::error::{LabkeepError, LabkeepResult};
use crate::models::{BackupId, BackupRecord, BackupType};
use crate::storage::SqliteStore;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup of the live store
    Create {
        /// Free-text description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Backup type (manual, automatic, scheduled)
        #[arg(short = 't', long = "type", default_value = "manual")]
        kind: String,
    },

    /// List backups, newest first
    List {
        /// Only backups of this type
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        /// Only backups taken on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Only backups taken on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Show details of a backup
    Info {
        /// Backup ID (use 'latest' for most recent)
        backup: String,
    },

    /// Check a backup's integrity
    Verify {
        /// Backup ID, 'latest', or 'all'
        backup: String,
    },

    /// Replace the live store with a backup
    Restore {
        /// Backup ID (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete a backup and its file
    Delete {
        /// Backup ID
        backup: String,
    },

    /// Delete old or corrupted backups
    Cleanup {
        /// Delete corrupted backups instead of excess ones
        #[arg(long)]
        corrupted: bool,

        /// Number of backups to keep (defaults to the configured maximum)
        #[arg(short, long, conflicts_with = "corrupted")]
        keep: Option<usize>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Copy a backup file out of the backup directory
    Export {
        /// Backup ID (use 'latest' for most recent)
        backup: String,

        /// Destination file or directory
        destination: PathBuf,
    },

    /// Register an external store file as a backup
    Import {
        /// File to import
        source: PathBuf,

        /// Free-text description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Show the total size of all backups
    Size,

    /// Show recent backup operations from the audit log
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

/// Open the live store and catalog and build the backup service
pub fn open_backup_service(config: AppConfig) -> LabkeepResult<BackupService> {
    let store = SqliteStore::open_existing(config.paths.live_store_file())?;
    let catalog = JsonCatalog::open(config.paths.catalog_file())?;
    let audit = AuditLogger::new(config.paths.audit_log());

    Ok(
        BackupService::new(Arc::new(store), Arc::new(catalog), Arc::new(config))
            .with_audit_logger(audit),
    )
}

/// Handle a backup command
pub fn handle_backup_command(
    service: &BackupService,
    settings: &dyn SettingsProvider,
    actor: &str,
    cmd: BackupCommands,
) -> LabkeepResult<()> {
    match cmd {
        BackupCommands::Create { description, kind } => {
            let kind = parse_kind(&kind)?;
            println!("Creating backup...");
            let record = service.create(&description, kind, actor)?;
            println!("Backup created: {} ({})", record.file_name, record.id);
            println!("Location: {}", record.file_path.display());
            println!("Size: {}", format_size(record.file_size_bytes));
            println!("Status: {}", record.status);
            if let Some(reason) = record.corruption_reason() {
                println!("WARNING: the new backup failed verification: {}", reason);
            }
        }

        BackupCommands::List { kind, from, to } => {
            let kind = kind.as_deref().map(parse_kind).transpose()?;

            let records = if from.is_some() || to.is_some() {
                let from = match from {
                    Some(s) => start_of_day(&s)?,
                    None => DateTime::<Utc>::MIN_UTC,
                };
                let to = match to {
                    Some(s) => end_of_day(&s)?,
                    None => DateTime::<Utc>::MAX_UTC,
                };
                let mut records = service.list_by_date_range(from, to)?;
                if let Some(kind) = kind {
                    records.retain(|r| r.backup_type == kind);
                }
                records
            } else if let Some(kind) = kind {
                service.list_by_type(kind)?
            } else {
                service.list_all()?
            };

            print!("{}", format_backup_list(&records));
            if records.is_empty() {
                println!();
                println!("Create one with: labkeep backup create");
            }
        }

        BackupCommands::Info { backup } => {
            let record = resolve_backup(service, &backup)?;
            print!("{}", format_backup_details(&record));
        }

        BackupCommands::Verify { backup } => {
            let targets = if backup.eq_ignore_ascii_case("all") {
                service.list_all()?
            } else {
                vec![resolve_backup(service, &backup)?]
            };

            if targets.is_empty() {
                println!("No backups found.");
                return Ok(());
            }

            let mut corrupted = 0;
            for target in targets {
                let record = service.verify(target.id, actor)?;
                match record.corruption_reason() {
                    Some(reason) => {
                        corrupted += 1;
                        println!("{}  {}  CORRUPTED: {}", record.id, record.file_name, reason);
                    }
                    None => println!("{}  {}  OK", record.id, record.file_name),
                }
            }

            if corrupted > 0 {
                println!();
                println!(
                    "{} corrupted backup(s). Remove them with: labkeep backup cleanup --corrupted --force",
                    corrupted
                );
            }
        }

        BackupCommands::Restore { backup, force } => {
            let record = resolve_backup(service, &backup)?;
            print!("{}", format_backup_details(&record));
            println!();

            if let Some(reason) = record.corruption_reason() {
                return Err(LabkeepError::BackupCorrupted {
                    id: record.id,
                    reason: reason.to_string(),
                });
            }

            if !force {
                println!("WARNING: This will replace the live laboratory store!");
                println!("A safety backup of the current state is taken first.");
                println!("To proceed, run again with --force flag:");
                println!("  labkeep backup restore {} --force", backup);
                return Ok(());
            }

            println!("Restoring from backup...");
            let summary = service.restore(record.id, actor)?;
            println!("Restore complete!");
            println!(
                "Pre-restore backup saved: {} ({})",
                summary.safety_backup.file_name, summary.safety_backup.id
            );
        }

        BackupCommands::Delete { backup } => {
            let id = parse_id(&backup)?;
            service.delete(id, actor)?;
            println!("Deleted backup {}.", id);
        }

        BackupCommands::Cleanup {
            corrupted,
            keep,
            force,
        } => {
            let all = service.list_all()?;

            if corrupted {
                let count = all.iter().filter(|r| r.is_corrupted()).count();
                if count == 0 {
                    println!("No corrupted backups.");
                    return Ok(());
                }
                if !force {
                    println!("{} corrupted backup(s) would be deleted.", count);
                    println!("To delete them, run again with --force flag:");
                    println!("  labkeep backup cleanup --corrupted --force");
                    return Ok(());
                }
                let report = service.cleanup_corrupted(actor)?;
                print!("{}", format_cleanup_report(&report));
                return Ok(());
            }

            let keep = keep.unwrap_or(settings.max_backup_files() as usize);
            let excess = all.len().saturating_sub(keep);
            if excess == 0 {
                println!("No backups to clean up.");
                println!("Keeping up to {} backup(s); you have {}.", keep, all.len());
                return Ok(());
            }
            if !force {
                println!(
                    "{} backup(s) exceed the limit of {} and would be deleted.",
                    excess, keep
                );
                println!("To delete them, run again with --force flag:");
                println!("  labkeep backup cleanup --force");
                return Ok(());
            }
            let report = service.cleanup_excess(keep, actor)?;
            print!("{}", format_cleanup_report(&report));
        }

        BackupCommands::Export {
            backup,
            destination,
        } => {
            let record = resolve_backup(service, &backup)?;
            let target = service.export(record.id, &destination)?;
            println!("Exported backup {} to {}", record.id, target.display());
            if record.is_corrupted() {
                println!("Note: this backup is marked corrupted.");
            }
        }

        BackupCommands::Import {
            source,
            description,
        } => {
            let record = service.import(&source, &description, actor)?;
            println!("Imported as backup {}: {}", record.id, record.file_name);
            match record.corruption_reason() {
                Some(reason) => println!("WARNING: imported file is corrupted: {}", reason),
                None => println!("Status: {}", record.status),
            }
        }

        BackupCommands::Size => {
            let total = service.total_size()?;
            let count = service.list_all()?.len();
            println!(
                "{} backup(s), {} ({} bytes)",
                count,
                format_size(total),
                total
            );
            println!("Directory: {}", service.backup_directory().display());
        }

        BackupCommands::History { limit } => {
            let entries = match service.audit_log() {
                Some(log) => log.read_recent(limit)?,
                None => Vec::new(),
            };

            if entries.is_empty() {
                println!("No backup operations recorded.");
                return Ok(());
            }

            for entry in entries {
                println!("{}", entry.format_human_readable());
            }
        }
    }

    Ok(())
}

/// Resolve 'latest' or a backup ID to a record
fn resolve_backup(service: &BackupService, backup: &str) -> LabkeepResult<BackupRecord> {
    if backup.eq_ignore_ascii_case("latest") {
        return service
            .list_all()?
            .into_iter()
            .next()
            .ok_or_else(|| LabkeepError::NotFound {
                entity_type: "Backup",
                identifier: "latest".to_string(),
            });
    }

    let id = parse_id(backup)?;
    service
        .get(id)?
        .ok_or_else(|| LabkeepError::backup_not_found(id))
}

fn parse_id(s: &str) -> LabkeepResult<BackupId> {
    s.parse()
        .map_err(|_| LabkeepError::Validation(format!("Invalid backup ID: '{}'", s)))
}

fn parse_kind(s: &str) -> LabkeepResult<BackupType> {
    BackupType::parse(s).ok_or_else(|| {
        LabkeepError::Validation(format!(
            "Invalid backup type: '{}'. Use manual, automatic, scheduled, or imported",
            s
        ))
    })
}

fn parse_date(s: &str) -> LabkeepResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| LabkeepError::Validation(format!("Invalid date: '{}'. Use YYYY-MM-DD", s)))
}

fn start_of_day(s: &str) -> LabkeepResult<DateTime<Utc>> {
    let date = parse_date(s)?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| LabkeepError::Validation(format!("Invalid date: '{}'", s)))
}

fn end_of_day(s: &str) -> LabkeepResult<DateTime<Utc>> {
    let date = parse_date(s)?;
    date.and_hms_nano_opt(23, 59, 59, 999_999_999)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| LabkeepError::Validation(format!("Invalid date: '{}'", s)))
}
