//! Command-line interface definition for disa-store
//!
//! Commands cover migration from legacy storage, backup and restore,
//! export and import, and day-to-day maintenance of the record store.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// disa-store - conversation storage and legacy migration tool
#[derive(Parser, Debug, Clone)]
#[command(name = "disa-store")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the record store database path
    #[arg(long, global = true)]
    pub storage_path: Option<PathBuf>,

    /// Override the legacy key-value store path
    #[arg(long, global = true)]
    pub legacy_path: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show where conversation data lives and whether migration is due
    Status,

    /// Migrate legacy conversations into the record store
    Migrate {
        /// Conversations written per batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Keep going after a failed batch
        #[arg(long)]
        skip_on_error: bool,

        /// Leave legacy data in place after a successful run
        #[arg(long)]
        keep_legacy: bool,

        /// Skip advisory validation
        #[arg(long)]
        no_validate: bool,

        /// Write a legacy backup to this file before migrating
        #[arg(long)]
        backup: Option<PathBuf>,
    },

    /// Estimate how long a migration would take
    Estimate,

    /// Snapshot legacy data into a backup file
    Backup {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore conversations from a legacy backup file
    Restore {
        /// Backup file produced by `backup`
        input: PathBuf,
    },

    /// Export every conversation to a JSON file
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import conversations from an export file
    Import {
        /// Export file produced by `export`
        input: PathBuf,

        /// Replace conversations that already exist
        #[arg(long)]
        overwrite: bool,

        /// Merge into existing conversations
        #[arg(long)]
        merge: bool,
    },

    /// List conversations, newest first
    List {
        /// Only show conversations whose title or model matches
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of rows to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one conversation
    Show {
        /// Conversation id
        id: String,

        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one or more conversations
    Delete {
        /// Conversation ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Toggle the favorite flag of a conversation
    Favorite {
        /// Conversation id
        id: String,
    },

    /// Change the title of a conversation
    Rename {
        /// Conversation id
        id: String,

        /// New title
        title: String,
    },

    /// Show aggregate statistics
    Stats,

    /// Delete conversations older than the retention window
    Cleanup {
        /// Age in days (defaults to retention.cleanup_days)
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Delete all conversations
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Show storage usage
    Usage,

    /// Repair metadata rows from full conversation records
    SyncMetadata,
}

impl Cli {
    /// Parse CLI arguments from the environment
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            storage_path: None,
            legacy_path: None,
            command: Commands::Status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_cli_parse_migrate_flags() {
        let cli = Cli::try_parse_from([
            "disa-store",
            "migrate",
            "--batch-size",
            "10",
            "--skip-on-error",
            "--keep-legacy",
        ])
        .expect("parse");

        match cli.command {
            Commands::Migrate {
                batch_size,
                skip_on_error,
                keep_legacy,
                no_validate,
                backup,
            } => {
                assert_eq!(batch_size, Some(10));
                assert!(skip_on_error);
                assert!(keep_legacy);
                assert!(!no_validate);
                assert!(backup.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_paths_after_subcommand() {
        let cli = Cli::try_parse_from([
            "disa-store",
            "list",
            "--storage-path",
            "/tmp/store.db",
            "--legacy-path",
            "/tmp/legacy",
        ])
        .expect("parse");
        assert_eq!(cli.storage_path, Some(PathBuf::from("/tmp/store.db")));
        assert_eq!(cli.legacy_path, Some(PathBuf::from("/tmp/legacy")));
    }

    #[test]
    fn test_cli_parse_import_and_delete() {
        let cli = Cli::try_parse_from(["disa-store", "import", "dump.json", "--overwrite"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Import {
                overwrite: true,
                merge: false,
                ..
            }
        ));

        let cli = Cli::try_parse_from(["disa-store", "delete", "a", "b"]).expect("parse");
        match cli.command {
            Commands::Delete { ids } => assert_eq!(ids, vec!["a", "b"]),
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Cli::try_parse_from(["disa-store", "delete"]).is_err());
    }

    #[test]
    fn test_cli_parse_sync_metadata_and_verbose() {
        let cli = Cli::try_parse_from(["disa-store", "-v", "sync-metadata"]).expect("parse");
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::SyncMetadata));
    }
}
