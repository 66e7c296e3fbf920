//! Conversation record store
//!
//! [`RecordStore`] is the single source of truth for conversation
//! persistence. It wraps a [`StorageBackend`] holding two tables (full
//! records and a metadata projection) and applies one rule throughout:
//! reads degrade to empty values and log, writes propagate their error.

use crate::error::{DisaError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

pub mod backend;
pub mod memory;
pub mod sqlite;
pub mod types;

pub use backend::StorageBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use types::{
    BulkDeleteResult, BulkUpdateResult, Conversation, ConversationMetadata, ConversationUpdate,
    ExportData, ExportMetadata, ImportOptions, ImportResult, MetadataSyncReport, StorageStats,
    StorageUsage, EXPORT_VERSION,
};

/// Application version stamped into exports when none is configured
pub const DEFAULT_APP_VERSION: &str = "2.0.0";

/// Get current timestamp in RFC-3339 format
///
/// # Examples
///
/// ```
/// use disa_store::storage::now_rfc3339;
///
/// let timestamp = now_rfc3339();
/// assert!(chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok());
/// ```
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Parse a stored timestamp
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) and a
/// bare `YYYY-MM-DD` date. Returns `None` for anything else.
///
/// # Examples
///
/// ```
/// use disa_store::storage::parse_timestamp;
///
/// assert!(parse_timestamp("2024-01-01T00:00:00Z").is_some());
/// assert!(parse_timestamp("2024-01-01").is_some());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Conversation persistence service
///
/// Construct once and share by `Arc`; every consumer talks to the same
/// backend handle.
pub struct RecordStore {
    backend: Arc<dyn StorageBackend>,
    app_version: String,
}

impl RecordStore {
    /// Wrap a backend
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            app_version: DEFAULT_APP_VERSION.to_string(),
        }
    }

    /// Set the application version written into export envelopes
    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = app_version.into();
        self
    }

    /// Store backed by a fresh [`MemoryBackend`]
    ///
    /// # Examples
    ///
    /// ```
    /// use disa_store::storage::RecordStore;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let store = RecordStore::in_memory();
    /// assert!(store.get_all_conversations().await.is_empty());
    /// # }
    /// ```
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Name of the underlying backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Aggregate statistics over every stored conversation
    ///
    /// Never fails; a backend error yields zeroed stats.
    pub async fn get_conversation_stats(&self) -> StorageStats {
        match self.backend.load_conversations().await {
            Ok(conversations) => compute_stats(&conversations),
            Err(e) => {
                tracing::error!("Failed to get conversation stats: {:#}", e);
                StorageStats::default()
            }
        }
    }

    /// Metadata listing, most recently updated first
    pub async fn get_all_conversations(&self) -> Vec<ConversationMetadata> {
        self.backend.load_metadata().await.unwrap_or_else(|e| {
            tracing::error!("Failed to get all conversations: {:#}", e);
            Vec::new()
        })
    }

    /// Full record by id, `None` when absent or unreadable
    pub async fn get_conversation(&self, id: &str) -> Option<Conversation> {
        self.backend.get_conversation(id).await.unwrap_or_else(|e| {
            tracing::error!("Failed to get conversation {}: {:#}", id, e);
            None
        })
    }

    /// Upsert a conversation and its metadata row in one transaction
    pub async fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.backend
            .put_conversation(conversation)
            .await
            .map_err(|e| {
                tracing::error!("Failed to save conversation {}: {:#}", conversation.id, e);
                e
            })
    }

    /// Remove a conversation and its metadata row in one transaction
    pub async fn delete_conversation(&self, id: &str) -> Result<()> {
        self.backend
            .delete_conversations(&[id.to_string()])
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete conversation {}: {:#}", id, e);
                e
            })
    }

    /// Delete every conversation inactive for longer than `days`
    ///
    /// Compares `lastActivity` (or `updatedAt`) against `now - days`; records
    /// whose timestamp cannot be parsed are kept. Returns the number removed,
    /// or 0 when the backend fails.
    pub async fn cleanup_old_conversations(&self, days: u32) -> usize {
        // A cutoff before the earliest representable date matches nothing
        let Some(cutoff) = Utc::now().checked_sub_signed(Duration::days(i64::from(days))) else {
            tracing::debug!("Retention window of {} days reaches past any timestamp", days);
            return 0;
        };

        let conversations = match self.backend.load_conversations().await {
            Ok(conversations) => conversations,
            Err(e) => {
                tracing::error!("Failed to cleanup old conversations: {:#}", e);
                return 0;
            }
        };

        let stale: Vec<String> = conversations
            .iter()
            .filter(|conv| {
                parse_timestamp(conv.activity_timestamp())
                    .map(|ts| ts < cutoff)
                    .unwrap_or(false)
            })
            .map(|conv| conv.id.clone())
            .collect();

        if stale.is_empty() {
            return 0;
        }

        match self.backend.delete_conversations(&stale).await {
            Ok(()) => {
                tracing::info!(
                    removed = stale.len(),
                    days,
                    "Removed conversations past retention"
                );
                stale.len()
            }
            Err(e) => {
                tracing::error!("Failed to cleanup old conversations: {:#}", e);
                0
            }
        }
    }

    /// Snapshot every record into a versioned export envelope
    pub async fn export_conversations(&self) -> ExportData {
        let conversations = self.backend.load_conversations().await.unwrap_or_else(|e| {
            tracing::error!("Failed to export conversations: {:#}", e);
            Vec::new()
        });
        ExportData::new(conversations, &self.app_version)
    }

    /// Load conversations from an export envelope
    ///
    /// Existing ids are skipped unless `overwrite` or `merge` is set. Each
    /// item is written independently; failures are collected and do not
    /// roll back items already written.
    pub async fn import_conversations(
        &self,
        data: &ExportData,
        options: ImportOptions,
    ) -> ImportResult {
        let mut result = ImportResult::default();

        for conversation in &data.conversations {
            let exists = match self.backend.get_conversation(&conversation.id).await {
                Ok(existing) => existing.is_some(),
                Err(e) => {
                    result.errors.push(format!(
                        "Failed to import conversation {}: {}",
                        conversation.id, e
                    ));
                    continue;
                }
            };

            if exists && !options.overwrite && !options.merge {
                tracing::debug!(id = %conversation.id, "Skipping existing conversation");
                continue;
            }

            match self.backend.put_conversation(conversation).await {
                Ok(()) => result.imported_count += 1,
                Err(e) => result.errors.push(format!(
                    "Failed to import conversation {}: {}",
                    conversation.id, e
                )),
            }
        }

        result.success = result.errors.is_empty();
        result
    }

    /// Empty both tables in one transaction
    pub async fn clear_all_data(&self) -> Result<()> {
        self.backend.clear().await.map_err(|e| {
            tracing::error!("Failed to clear all data: {:#}", e);
            e
        })
    }

    /// Storage consumption, zeros when the backend cannot estimate it
    pub async fn get_storage_usage(&self) -> StorageUsage {
        match self.backend.estimate_usage().await {
            Ok(usage) => usage.unwrap_or_default(),
            Err(e) => {
                tracing::error!("Failed to get storage usage: {:#}", e);
                StorageUsage::default()
            }
        }
    }

    /// Case-insensitive substring search over titles and models
    pub async fn search_conversations(&self, query: &str) -> Vec<ConversationMetadata> {
        let needle = query.to_lowercase();
        self.get_all_conversations()
            .await
            .into_iter()
            .filter(|meta| {
                meta.title.to_lowercase().contains(&needle)
                    || meta.model.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Apply a partial update to an existing conversation
    ///
    /// # Errors
    ///
    /// Returns `DisaError::NotFound` when no conversation has `id`, or the
    /// backend error when the write fails.
    pub async fn update_conversation(&self, id: &str, update: &ConversationUpdate) -> Result<()> {
        let mut conversation = self.require(id).await?;
        update.apply_to(&mut conversation);
        self.save_conversation(&conversation).await
    }

    /// Flip the favorite flag of a conversation
    pub async fn toggle_favorite(&self, id: &str) -> Result<()> {
        let mut conversation = self.require(id).await?;
        conversation.is_favorite = Some(!conversation.is_favorite.unwrap_or(false));
        conversation.updated_at = now_rfc3339();
        self.save_conversation(&conversation).await
    }

    /// Delete several conversations, collecting per-id failures
    pub async fn bulk_delete_conversations(&self, ids: &[String]) -> BulkDeleteResult {
        let mut result = BulkDeleteResult::default();
        for id in ids {
            match self.delete_conversation(id).await {
                Ok(()) => result.deleted += 1,
                Err(e) => result
                    .errors
                    .push(format!("Failed to delete conversation {}: {}", id, e)),
            }
        }
        result
    }

    /// Update several conversations, collecting per-id failures
    pub async fn bulk_update_conversations(
        &self,
        updates: &[(String, ConversationUpdate)],
    ) -> BulkUpdateResult {
        let mut result = BulkUpdateResult::default();
        for (id, update) in updates {
            match self.update_conversation(id, update).await {
                Ok(()) => result.updated += 1,
                Err(e) => result
                    .errors
                    .push(format!("Failed to update conversation {}: {}", id, e)),
            }
        }
        result
    }

    /// Rewrite metadata rows that are missing or disagree with their record
    pub async fn sync_metadata_from_conversations(&self) -> MetadataSyncReport {
        let mut report = MetadataSyncReport::default();

        let conversations = match self.backend.load_conversations().await {
            Ok(conversations) => conversations,
            Err(e) => {
                report
                    .errors
                    .push(format!("Failed to load conversations: {}", e));
                return report;
            }
        };

        for conversation in &conversations {
            let expected = ConversationMetadata::from(conversation);
            match self.backend.get_metadata(&conversation.id).await {
                Ok(Some(current)) if current == expected => report.already_synced += 1,
                Ok(_) => match self.backend.put_metadata(&expected).await {
                    Ok(()) => report.synced += 1,
                    Err(e) => report.errors.push(format!(
                        "Failed to sync metadata for {}: {}",
                        conversation.id, e
                    )),
                },
                Err(e) => report.errors.push(format!(
                    "Failed to read metadata for {}: {}",
                    conversation.id, e
                )),
            }
        }

        if report.synced > 0 {
            tracing::info!(synced = report.synced, "Repaired conversation metadata");
        }
        report
    }

    /// Whether the backend answers a full scan
    pub async fn is_storage_ready(&self) -> bool {
        match self.backend.load_conversations().await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Storage not ready: {:#}", e);
                false
            }
        }
    }

    async fn require(&self, id: &str) -> Result<Conversation> {
        match self.backend.get_conversation(id).await? {
            Some(conversation) => Ok(conversation),
            None => Err(DisaError::NotFound(id.to_string()).into()),
        }
    }
}

fn compute_stats(conversations: &[Conversation]) -> StorageStats {
    let total_conversations = conversations.len();
    let total_messages: usize = conversations
        .iter()
        .map(Conversation::actual_message_count)
        .sum();

    let mut seen = HashSet::new();
    let models_used: Vec<String> = conversations
        .iter()
        .filter(|conv| seen.insert(conv.model.as_str()))
        .map(|conv| conv.model.clone())
        .collect();

    let average_messages_per_conversation = if total_conversations > 0 {
        total_messages as f64 / total_conversations as f64
    } else {
        0.0
    };

    let storage_size = match serde_json::to_vec(conversations) {
        Ok(bytes) => bytes.len() as u64,
        Err(e) => {
            tracing::error!("Failed to calculate storage size: {}", e);
            0
        }
    };

    StorageStats {
        total_conversations,
        total_messages,
        average_messages_per_conversation,
        models_used,
        storage_size,
    }
}
