//! disa-store - conversation storage and legacy migration CLI
//!
#![doc = "Main entry point for the disa-store command-line tool."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use disa_store::cli::{Cli, Commands};
use disa_store::commands::{self, history, migrate, transfer};
use disa_store::config::Config;
use disa_store::storage::ImportOptions;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Status => {
            let engine = commands::open_migration(&config)?;
            migrate::status(&engine).await
        }
        Commands::Migrate {
            batch_size,
            skip_on_error,
            keep_legacy,
            no_validate,
            backup,
        } => {
            tracing::info!("Starting legacy migration");
            let mut options = config.migration.options();
            if let Some(size) = batch_size {
                options.batch_size = size;
            }
            options.skip_on_error |= skip_on_error;
            if keep_legacy {
                options.clear_legacy_after_success = false;
            }
            if no_validate {
                options.validate_data = false;
            }
            let engine = commands::open_migration(&config)?;
            migrate::migrate(&engine, options, backup.as_deref()).await
        }
        Commands::Estimate => {
            let engine = commands::open_migration(&config)?;
            migrate::estimate(&engine)
        }
        Commands::Backup { output } => {
            let engine = commands::open_migration(&config)?;
            migrate::backup(&engine, output.as_deref())
        }
        Commands::Restore { input } => {
            tracing::info!("Restoring from backup {}", input.display());
            let engine = commands::open_migration(&config)?;
            migrate::restore(&engine, &input).await
        }
        Commands::Export { output } => {
            let store = commands::open_store(&config)?;
            transfer::export(&store, output.as_deref()).await
        }
        Commands::Import {
            input,
            overwrite,
            merge,
        } => {
            let store = commands::open_store(&config)?;
            transfer::import(&store, &input, ImportOptions { overwrite, merge }).await
        }
        Commands::List { search, limit } => {
            let store = commands::open_store(&config)?;
            history::list(&store, search.as_deref(), limit).await
        }
        Commands::Show { id, json } => {
            let store = commands::open_store(&config)?;
            history::show(&store, &id, json).await
        }
        Commands::Delete { ids } => {
            let store = commands::open_store(&config)?;
            history::delete(&store, &ids).await
        }
        Commands::Favorite { id } => {
            let store = commands::open_store(&config)?;
            history::favorite(&store, &id).await
        }
        Commands::Rename { id, title } => {
            let store = commands::open_store(&config)?;
            history::rename(&store, &id, &title).await
        }
        Commands::Stats => {
            let store = commands::open_store(&config)?;
            history::stats(&store).await
        }
        Commands::Cleanup { days } => {
            let days = days.unwrap_or(config.retention.cleanup_days);
            let store = commands::open_store(&config)?;
            history::cleanup(&store, days).await
        }
        Commands::Clear { yes } => {
            let store = commands::open_store(&config)?;
            history::clear(&store, yes).await
        }
        Commands::Usage => {
            let store = commands::open_store(&config)?;
            history::usage(&store).await
        }
        Commands::SyncMetadata => {
            let store = commands::open_store(&config)?;
            history::sync_metadata(&store).await
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so exported JSON on stdout stays clean.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "disa_store=debug"
    } else {
        "disa_store=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
