use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use labkeep::cli::{handle_backup_command, open_backup_service, BackupCommands};
use labkeep::config::{AppConfig, LabkeepPaths, SettingsProvider};
use labkeep::storage::SqliteStore;

#[derive(Parser)]
#[command(
    name = "labkeep",
    version,
    about = "Backup, verification and restore for the laboratory store",
    long_about = "labkeep takes point-in-time backups of the laboratory's live store, \
                  verifies them with SHA-256 checksums, applies retention, and restores \
                  a verified backup with automatic rollback on failure."
)]
struct Cli {
    /// Name recorded as the actor of each operation
    #[arg(long, global = true, env = "LABKEEP_ACTOR", default_value = "system")]
    actor: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Initialize the data directory and live store
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LABKEEP_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = LabkeepPaths::new()?;
    let config = AppConfig::load(paths.clone())?;

    match cli.command {
        Some(Commands::Backup(cmd)) => {
            if !paths.is_initialized() {
                bail!(
                    "No live store at {}. Run 'labkeep init' first.",
                    paths.live_store_file().display()
                );
            }
            let service =
                open_backup_service(config.clone()).context("Failed to open backup service")?;
            handle_backup_command(&service, &config, &cli.actor, cmd)?;
        }
        Some(Commands::Init) => {
            println!("Initializing labkeep at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            SqliteStore::create(paths.live_store_file())?;
            config.settings.save(&paths)?;
            println!("Initialization complete!");
            println!("Live store: {}", paths.live_store_file().display());
            println!();
            println!("Run 'labkeep backup create' to take the first backup.");
        }
        Some(Commands::Config) => {
            println!("labkeep Configuration");
            println!("=====================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Live store:       {}", paths.live_store_file().display());
            println!("Catalog:          {}", paths.catalog_file().display());
            println!("Audit log:        {}", paths.audit_log().display());
            println!("Backup directory: {}", config.backup_directory().display());
            println!();
            println!("Settings:");
            println!("  Max backup files:    {}", config.max_backup_files());
            println!("  File prefix:         {}", config.backup_file_prefix());
            println!("  Verify after create: {}", config.verify_after_create());
        }
        None => {
            println!("labkeep - laboratory store backups");
            println!();
            println!("Run 'labkeep --help' for usage information.");
        }
    }

    Ok(())
}
