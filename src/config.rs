//! Configuration management for disa-store
//!
//! Configuration is read from a YAML file, then overridden by `DISA_*`
//! environment variables and finally by command-line flags.

use crate::error::{DisaError, Result};
use crate::migration::{MigrationOptions, DEFAULT_BATCH_SIZE};
use crate::storage::DEFAULT_APP_VERSION;
use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest accepted migration batch
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where the record store and legacy data live
    #[serde(default)]
    pub storage: StorageConfig,
    /// Defaults for `migrate`
    #[serde(default)]
    pub migration: MigrationConfig,
    /// Age-based cleanup settings
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Record store database file; defaults to `<data dir>/conversations.db`
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Legacy key-value store directory; defaults to `<data dir>/legacy`
    #[serde(default)]
    pub legacy_path: Option<PathBuf>,

    /// Version stamped into export files
    #[serde(default = "default_app_version")]
    pub app_version: String,
}

fn default_app_version() -> String {
    DEFAULT_APP_VERSION.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            legacy_path: None,
            app_version: default_app_version(),
        }
    }
}

impl StorageConfig {
    /// Record store path, falling back to the platform data directory
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("conversations.db")),
        }
    }

    /// Legacy store path, falling back to the platform data directory
    pub fn resolved_legacy_path(&self) -> Result<PathBuf> {
        match &self.legacy_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("legacy")),
        }
    }
}

fn data_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "disa", "disa-store")
        .ok_or_else(|| DisaError::Storage("Could not determine data directory".into()))?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .context("Failed to create data directory")
        .map_err(|e| DisaError::Storage(e.to_string()))?;

    Ok(data_dir.to_path_buf())
}

/// Migration defaults, overridable per run from the command line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default = "default_true")]
    pub clear_legacy_after_success: bool,

    #[serde(default = "default_true")]
    pub validate_data: bool,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub skip_on_error: bool,
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            clear_legacy_after_success: true,
            validate_data: true,
            batch_size: default_batch_size(),
            skip_on_error: false,
        }
    }
}

impl MigrationConfig {
    /// Engine options carrying these defaults
    pub fn options(&self) -> MigrationOptions {
        MigrationOptions {
            clear_legacy_after_success: self.clear_legacy_after_success,
            validate_data: self.validate_data,
            batch_size: self.batch_size,
            skip_on_error: self.skip_on_error,
        }
    }
}

/// Age-based cleanup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Conversations inactive for longer than this are removed by `cleanup`
    #[serde(default = "default_cleanup_days")]
    pub cleanup_days: u32,
}

fn default_cleanup_days() -> u32 {
    90
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            cleanup_days: default_cleanup_days(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment, and CLI flags
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns `DisaError::Config` if the file exists but cannot be read or
    /// parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DisaError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| DisaError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(db_path) = std::env::var("DISA_STORE_DB") {
            self.storage.db_path = Some(PathBuf::from(db_path));
        }

        if let Ok(legacy_path) = std::env::var("DISA_LEGACY_DB") {
            self.storage.legacy_path = Some(PathBuf::from(legacy_path));
        }

        if let Ok(batch_size) = std::env::var("DISA_MIGRATION_BATCH_SIZE") {
            if let Ok(value) = batch_size.parse() {
                self.migration.batch_size = value;
            } else {
                tracing::warn!("Invalid DISA_MIGRATION_BATCH_SIZE: {}", batch_size);
            }
        }

        if let Ok(skip) = std::env::var("DISA_MIGRATION_SKIP_ON_ERROR") {
            match skip.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.migration.skip_on_error = true,
                "0" | "false" | "no" => self.migration.skip_on_error = false,
                _ => tracing::warn!("Invalid DISA_MIGRATION_SKIP_ON_ERROR: {}", skip),
            }
        }

        if let Ok(days) = std::env::var("DISA_RETENTION_DAYS") {
            if let Ok(value) = days.parse() {
                self.retention.cleanup_days = value;
            } else {
                tracing::warn!("Invalid DISA_RETENTION_DAYS: {}", days);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(path) = &cli.storage_path {
            self.storage.db_path = Some(path.clone());
        }
        if let Some(path) = &cli.legacy_path {
            self.storage.legacy_path = Some(path.clone());
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.migration.batch_size == 0 {
            return Err(DisaError::Config(
                "migration.batch_size must be greater than 0".to_string(),
            )
            .into());
        }

        if self.migration.batch_size > MAX_BATCH_SIZE {
            return Err(DisaError::Config(format!(
                "migration.batch_size must be less than or equal to {}",
                MAX_BATCH_SIZE
            ))
            .into());
        }

        if self.retention.cleanup_days == 0 {
            return Err(DisaError::Config(
                "retention.cleanup_days must be greater than 0".to_string(),
            )
            .into());
        }

        if self.storage.app_version.trim().is_empty() {
            return Err(
                DisaError::Config("storage.app_version cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}
