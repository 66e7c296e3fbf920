//! One-way migration from legacy key-value storage into the record store
//!
//! [`StorageMigration`] reads the two legacy JSON blobs, validates and
//! sanitizes the conversations they hold, and writes them to the
//! [`RecordStore`] in sequential batches. It also snapshots and restores the
//! legacy data independently of migration state.
//!
//! Only one migration may run at a time. A second call made while one is in
//! flight fails immediately with [`DisaError::MigrationInProgress`]; calls are
//! never queued.

use crate::error::{DisaError, Result};
use crate::legacy::{read_non_empty, LegacyStore, LEGACY_CONVERSATIONS_KEY, LEGACY_METADATA_KEY};
use crate::storage::{now_rfc3339, Conversation, RecordStore};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod metrics;
pub mod types;
pub mod validate;

pub use metrics::MigrationMetrics;
pub use types::{
    BackupEnvelope, MigrationEstimate, MigrationOptions, MigrationProgress, MigrationResult,
    MigrationStatus, BACKUP_VERSION, DEFAULT_BATCH_SIZE,
};
pub use validate::{sanitize_conversation, validate_conversations, DEFAULT_MODEL, DEFAULT_TITLE};

/// Clears the in-progress flag when a run ends, however it ends
struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Legacy-to-record-store migration engine
///
/// Construct once per process and share by `Arc`.
pub struct StorageMigration {
    store: Arc<RecordStore>,
    legacy: Arc<dyn LegacyStore>,
    in_progress: AtomicBool,
}

impl StorageMigration {
    pub fn new(store: Arc<RecordStore>, legacy: Arc<dyn LegacyStore>) -> Self {
        Self {
            store,
            legacy,
            in_progress: AtomicBool::new(false),
        }
    }

    /// The record store migrations write into
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Whether a migration run is currently executing
    pub fn is_migration_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Report where conversation data lives and whether migration is due
    ///
    /// Migration is due only while the record store is completely empty.
    /// Once any row exists, leftover legacy data is not migrated again.
    pub async fn check_migration_status(&self) -> MigrationStatus {
        let has_legacy_data = read_non_empty(self.legacy.as_ref(), LEGACY_CONVERSATIONS_KEY)
            .is_some()
            && read_non_empty(self.legacy.as_ref(), LEGACY_METADATA_KEY).is_some();
        let has_store_data = !self.store.get_all_conversations().await.is_empty();

        MigrationStatus {
            has_legacy_data,
            has_store_data,
            needs_migration: has_legacy_data && !has_store_data,
        }
    }

    /// Migrate legacy conversations into the record store
    ///
    /// # Errors
    ///
    /// Returns `DisaError::MigrationInProgress` when another run is active.
    /// Every other problem is reported inside the returned result.
    pub async fn migrate_from_legacy(&self, options: MigrationOptions) -> Result<MigrationResult> {
        self.migrate_from_legacy_with_progress(options, |_| {}).await
    }

    /// Like [`migrate_from_legacy`](Self::migrate_from_legacy), reporting
    /// progress after each successfully written batch
    pub async fn migrate_from_legacy_with_progress<F>(
        &self,
        options: MigrationOptions,
        mut on_progress: F,
    ) -> Result<MigrationResult>
    where
        F: FnMut(MigrationProgress) + Send,
    {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DisaError::MigrationInProgress.into());
        }
        let _guard = InProgressGuard(&self.in_progress);

        let metrics = MigrationMetrics::start("migrate");
        let mut result = MigrationResult::default();

        let raw = match read_non_empty(self.legacy.as_ref(), LEGACY_CONVERSATIONS_KEY) {
            Some(raw) => raw,
            None => {
                result.warnings.push("No legacy data found to migrate".to_string());
                return Ok(self.finish(result, &metrics));
            }
        };

        let conversations = match decode_conversation_map(&raw, &mut result.errors) {
            Ok(conversations) => conversations,
            Err(e) => {
                tracing::error!("Failed to parse legacy conversations: {:#}", e);
                result
                    .errors
                    .push(format!("Failed to parse legacy conversations: {}", e));
                return Ok(self.finish(result, &metrics));
            }
        };

        if conversations.is_empty() {
            result
                .warnings
                .push("No conversations found in legacy storage".to_string());
            return Ok(self.finish(result, &metrics));
        }

        if options.validate_data {
            result
                .warnings
                .extend(validate_conversations(&conversations));
        }

        let batch_size = options.batch_size.max(1);
        let total = conversations.len();
        let total_batches = (total + batch_size - 1) / batch_size;

        for (index, batch) in conversations.chunks(batch_size).enumerate() {
            let batch_number = index + 1;
            match self.migrate_batch(batch).await {
                Ok(()) => {
                    result.migrated_count += batch.len();
                    tracing::debug!(
                        batch = batch_number,
                        total_batches,
                        migrated = result.migrated_count,
                        "Migrated batch"
                    );
                    on_progress(MigrationProgress {
                        current: result.migrated_count,
                        total,
                        percentage: ((result.migrated_count * 100) as f64 / total as f64).round()
                            as u32,
                        batch: batch_number,
                        total_batches,
                    });
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to migrate batch {}/{}: {:#}",
                        batch_number,
                        total_batches,
                        e
                    );
                    metrics.record_batch_failure();
                    result.errors.push(format!(
                        "Failed to migrate batch {}/{}: {}",
                        batch_number, total_batches, e
                    ));
                    if !options.skip_on_error {
                        break;
                    }
                }
            }
        }

        let succeeded = result.errors.is_empty();
        if succeeded && result.migrated_count > 0 && options.clear_legacy_after_success {
            if let Err(e) = self.clear_legacy() {
                tracing::warn!("Failed to clear legacy storage: {:#}", e);
                result
                    .warnings
                    .push(format!("Failed to clear legacy storage: {}", e));
            }
        }

        Ok(self.finish(result, &metrics))
    }

    /// Estimate how long migrating the current legacy data would take
    pub fn estimate_migration_time(&self) -> MigrationEstimate {
        let Some(raw) = read_non_empty(self.legacy.as_ref(), LEGACY_CONVERSATIONS_KEY) else {
            return MigrationEstimate::default();
        };

        let conversation_count = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map.len(),
            Ok(_) => 0,
            Err(e) => {
                tracing::error!("Failed to estimate migration time: {}", e);
                return MigrationEstimate::default();
            }
        };

        let estimated_size = raw.len() as u64;
        MigrationEstimate {
            estimated_duration: conversation_count as f64 * 10.0 + estimated_size as f64 / 1000.0,
            conversation_count,
            estimated_size,
        }
    }

    /// Snapshot both legacy blobs into a pretty-printed backup document
    ///
    /// Returns `None` when either legacy key is missing or unreadable.
    pub fn create_backup(&self) -> Option<String> {
        let conversations = read_non_empty(self.legacy.as_ref(), LEGACY_CONVERSATIONS_KEY)?;
        let metadata = read_non_empty(self.legacy.as_ref(), LEGACY_METADATA_KEY)?;

        let build = || -> Result<String> {
            let envelope = BackupEnvelope {
                version: BACKUP_VERSION.to_string(),
                timestamp: now_rfc3339(),
                conversations: serde_json::from_str(&conversations)?,
                metadata: serde_json::from_str(&metadata)?,
            };
            Ok(serde_json::to_string_pretty(&envelope)?)
        };

        match build() {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to create backup: {:#}", e);
                None
            }
        }
    }

    /// Write every conversation in a backup document into the record store
    ///
    /// Parse and format problems fail the whole restore; individual write
    /// failures are collected while the remaining conversations continue.
    pub async fn restore_from_backup(&self, backup_json: &str) -> MigrationResult {
        let metrics = MigrationMetrics::start("restore");
        let mut result = MigrationResult::default();

        let backup: Value = match serde_json::from_str(backup_json) {
            Ok(value) => value,
            Err(e) => {
                result.errors.push(format!("Failed to parse backup: {}", e));
                return self.finish(result, &metrics);
            }
        };

        let conversations = match backup_sections(&backup) {
            Ok(section) => section,
            Err(e) => {
                result.errors.push(e.to_string());
                return self.finish(result, &metrics);
            }
        };

        let conversations = decode_conversation_values(conversations, &mut result.errors);
        result
            .warnings
            .extend(validate_conversations(&conversations));

        for conversation in &conversations {
            match self.store.save_conversation(conversation).await {
                Ok(()) => result.migrated_count += 1,
                Err(e) => result.errors.push(format!(
                    "Failed to restore conversation {}: {}",
                    conversation.id, e
                )),
            }
        }

        self.finish(result, &metrics)
    }

    async fn migrate_batch(&self, batch: &[Conversation]) -> Result<()> {
        for conversation in batch {
            let sanitized = sanitize_conversation(conversation);
            self.store
                .save_conversation(&sanitized)
                .await
                .map_err(|e| {
                    DisaError::Migration(format!(
                        "Failed to save conversation {}: {}",
                        sanitized.id, e
                    ))
                })?;
        }
        Ok(())
    }

    fn clear_legacy(&self) -> Result<()> {
        self.legacy.remove_item(LEGACY_CONVERSATIONS_KEY)?;
        self.legacy.remove_item(LEGACY_METADATA_KEY)?;
        Ok(())
    }

    fn finish(&self, mut result: MigrationResult, metrics: &MigrationMetrics) -> MigrationResult {
        result.success = result.errors.is_empty();
        result.duration = metrics.elapsed_ms();
        metrics.record_result(&result);

        if result.success {
            tracing::info!(
                migrated = result.migrated_count,
                duration_ms = result.duration,
                warnings = result.warnings.len(),
                "Conversation migration finished"
            );
            if !result.warnings.is_empty() {
                tracing::warn!("Migration completed with warnings: {:?}", result.warnings);
            }
        } else {
            tracing::error!("Migration failed with errors: {:?}", result.errors);
        }

        result
    }
}

/// Parse a legacy id-to-conversation map
///
/// Entries that do not decode as conversations are reported into `errors`
/// and skipped.
fn decode_conversation_map(raw: &str, errors: &mut Vec<String>) -> Result<Vec<Conversation>> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(decode_conversation_values(&value, errors))
}

fn decode_conversation_values(value: &Value, errors: &mut Vec<String>) -> Vec<Conversation> {
    let Value::Object(entries) = value else {
        errors.push("Conversations must be a JSON object keyed by id".to_string());
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|(key, entry)| {
            match serde_json::from_value::<Conversation>(entry.clone()) {
                Ok(conversation) => Some(conversation),
                Err(e) => {
                    errors.push(format!("Conversation {} could not be decoded: {}", key, e));
                    None
                }
            }
        })
        .collect()
}

/// The conversation section of a backup, once both required sections exist
fn backup_sections(backup: &Value) -> std::result::Result<&Value, DisaError> {
    let section = |name: &str| -> Option<&Value> {
        backup
            .as_object()
            .and_then(|obj: &Map<String, Value>| obj.get(name))
            .filter(|v| !v.is_null())
    };

    match (section("conversations"), section("metadata")) {
        (Some(conversations), Some(_)) => Ok(conversations),
        (None, _) => Err(DisaError::InvalidBackup(
            "missing \"conversations\" section".to_string(),
        )),
        (_, None) => Err(DisaError::InvalidBackup(
            "missing \"metadata\" section".to_string(),
        )),
    }
}
