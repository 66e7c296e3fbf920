//! Error types for disa-store
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for disa-store operations
///
/// Read paths of the record store never surface these to callers (they
/// degrade to empty values); write paths, migration and configuration
/// loading do.
#[derive(Error, Debug)]
pub enum DisaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Conversation storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Legacy data could not be read, parsed or cleared
    #[error("Migration error: {0}")]
    Migration(String),

    /// A migration run was started while another one is still running
    #[error("Migration is already in progress")]
    MigrationInProgress,

    /// Backup document is missing required sections
    #[error("Invalid backup format: {0}")]
    InvalidBackup(String),

    /// A conversation addressed by id does not exist
    #[error("Conversation {0} not found")]
    NotFound(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for disa-store operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Callers that
/// need to branch on the failure kind can `downcast_ref::<DisaError>()`.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = DisaError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_storage_error_display() {
        let error = DisaError::Storage("database connection failed".to_string());
        assert_eq!(
            error.to_string(),
            "Storage error: database connection failed"
        );
    }

    #[test]
    fn test_migration_in_progress_display() {
        let error = DisaError::MigrationInProgress;
        assert_eq!(error.to_string(), "Migration is already in progress");
    }

    #[test]
    fn test_invalid_backup_display() {
        let error = DisaError::InvalidBackup("missing metadata".to_string());
        assert_eq!(error.to_string(), "Invalid backup format: missing metadata");
    }

    #[test]
    fn test_not_found_display() {
        let error = DisaError::NotFound("abc".to_string());
        assert_eq!(error.to_string(), "Conversation abc not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: DisaError = io_error.into();
        assert!(matches!(error, DisaError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: DisaError = json_error.into();
        assert!(matches!(error, DisaError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: DisaError = yaml_error.into();
        assert!(matches!(error, DisaError::Yaml(_)));
    }

    #[test]
    fn test_error_downcasts_through_anyhow() {
        let err: anyhow::Error = DisaError::MigrationInProgress.into();
        assert!(matches!(
            err.downcast_ref::<DisaError>(),
            Some(DisaError::MigrationInProgress)
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DisaError>();
    }
}
