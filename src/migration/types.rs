use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a migration or restore run
///
/// `success` reflects `errors` only; warnings never fail a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub success: bool,
    pub migrated_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Wall-clock duration in milliseconds
    pub duration: u64,
}

/// Progress reported after each successfully written batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationProgress {
    pub current: usize,
    pub total: usize,
    pub percentage: u32,
    pub batch: usize,
    pub total_batches: usize,
}

/// Knobs for `migrate_from_legacy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationOptions {
    /// Remove the legacy keys after a successful, non-empty run
    pub clear_legacy_after_success: bool,
    /// Collect validation warnings before writing
    pub validate_data: bool,
    /// Conversations written per sequential batch
    pub batch_size: usize,
    /// Keep going after a failed batch instead of stopping
    pub skip_on_error: bool,
}

/// Default number of conversations per migration batch
pub const DEFAULT_BATCH_SIZE: usize = 50;

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            clear_legacy_after_success: true,
            validate_data: true,
            batch_size: DEFAULT_BATCH_SIZE,
            skip_on_error: false,
        }
    }
}

/// Where conversation data currently lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    pub has_legacy_data: bool,
    pub has_store_data: bool,
    pub needs_migration: bool,
}

/// Rough cost of migrating the current legacy data
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationEstimate {
    /// Milliseconds, `count * 10 + size / 1000`
    pub estimated_duration: f64,
    pub conversation_count: usize,
    /// Bytes of the raw legacy conversation blob
    pub estimated_size: u64,
}

/// Backup format version written by `create_backup`
pub const BACKUP_VERSION: &str = "1.0";

/// Legacy-shaped backup document
///
/// Holds the two legacy maps verbatim. Distinct from the record store's
/// export envelope, which carries a conversation array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEnvelope {
    pub version: String,
    pub timestamp: String,
    pub conversations: Value,
    pub metadata: Value,
}
