//! Backend abstraction for the two-table conversation store
//!
//! Every method here is fallible; the best-effort read semantics live one
//! level up in [`RecordStore`](super::RecordStore).

use crate::error::Result;
use crate::storage::types::{Conversation, ConversationMetadata, StorageUsage};
use async_trait::async_trait;

/// Transactional storage for conversations and their metadata projection
///
/// Implementations must keep both tables in lockstep: `put_conversation` and
/// `delete_conversations` touch the conversation row and the metadata row in
/// a single atomic unit.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name for log output
    fn name(&self) -> &'static str;

    /// Every conversation record, in primary-key order
    async fn load_conversations(&self) -> Result<Vec<Conversation>>;

    /// Every metadata row, most recently updated first
    async fn load_metadata(&self) -> Result<Vec<ConversationMetadata>>;

    /// Point lookup of a full record
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>>;

    /// Point lookup of a metadata row
    async fn get_metadata(&self, id: &str) -> Result<Option<ConversationMetadata>>;

    /// Upsert the record and its projection atomically
    async fn put_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Rewrite a single metadata row (repair only)
    async fn put_metadata(&self, metadata: &ConversationMetadata) -> Result<()>;

    /// Remove records and projections for every id atomically
    async fn delete_conversations(&self, ids: &[String]) -> Result<()>;

    /// Empty both tables atomically
    async fn clear(&self) -> Result<()>;

    /// Storage consumption estimate, `None` when the backend cannot tell
    async fn estimate_usage(&self) -> Result<Option<StorageUsage>>;
}
