//! Command handlers for the CLI
//!
//! - `history`: listing, inspection and maintenance of stored conversations
//! - `migrate`: legacy status, migration, estimates, backup and restore
//! - `transfer`: export and import of conversation files

use crate::config::Config;
use crate::error::{DisaError, Result};
use crate::legacy::SledLegacyStore;
use crate::migration::StorageMigration;
use crate::storage::{RecordStore, SqliteBackend};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

pub mod history;
pub mod migrate;
pub mod transfer;

/// Open the record store described by `config`
pub fn open_store(config: &Config) -> Result<Arc<RecordStore>> {
    let db_path = config.storage.resolved_db_path()?;
    tracing::debug!("Opening record store at {}", db_path.display());
    let backend = SqliteBackend::open(db_path)?;
    Ok(Arc::new(
        RecordStore::new(Arc::new(backend)).with_app_version(&config.storage.app_version),
    ))
}

/// Open the record store and the legacy store together
pub fn open_migration(config: &Config) -> Result<Arc<StorageMigration>> {
    let store = open_store(config)?;
    let legacy_path = config.storage.resolved_legacy_path()?;
    tracing::debug!("Opening legacy store at {}", legacy_path.display());
    let legacy = SledLegacyStore::open(legacy_path)?;
    Ok(Arc::new(StorageMigration::new(store, Arc::new(legacy))))
}

/// Write `contents` to `path`, or to stdout when no path is given
pub fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(())
        }
        None => {
            println!("{}", contents);
            Ok(())
        }
    }
}

/// Read a whole input file
pub fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| DisaError::Config(format!("Failed to read {}: {}", path.display(), e)).into())
}
