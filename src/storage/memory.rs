//! In-process conversation store
//!
//! Used when no database file is wanted (tests, dry runs) and as the
//! injectable fake for code that depends on a [`StorageBackend`].

use crate::error::{DisaError, Result};
use crate::storage::backend::StorageBackend;
use crate::storage::types::{Conversation, ConversationMetadata, StorageUsage};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    conversations: BTreeMap<String, Conversation>,
    metadata: BTreeMap<String, ConversationMetadata>,
}

/// Two maps guarded by one lock, so paired writes are atomic
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| DisaError::Storage("Memory store lock poisoned".into()).into())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self.tables()?.conversations.values().cloned().collect())
    }

    async fn load_metadata(&self) -> Result<Vec<ConversationMetadata>> {
        let mut rows: Vec<_> = self.tables()?.metadata.values().cloned().collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.tables()?.conversations.get(id).cloned())
    }

    async fn get_metadata(&self, id: &str) -> Result<Option<ConversationMetadata>> {
        Ok(self.tables()?.metadata.get(id).cloned())
    }

    async fn put_conversation(&self, conversation: &Conversation) -> Result<()> {
        let mut tables = self.tables()?;
        tables
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        tables.metadata.insert(
            conversation.id.clone(),
            ConversationMetadata::from(conversation),
        );
        Ok(())
    }

    async fn put_metadata(&self, metadata: &ConversationMetadata) -> Result<()> {
        self.tables()?
            .metadata
            .insert(metadata.id.clone(), metadata.clone());
        Ok(())
    }

    async fn delete_conversations(&self, ids: &[String]) -> Result<()> {
        let mut tables = self.tables()?;
        for id in ids {
            tables.conversations.remove(id);
            tables.metadata.remove(id);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut tables = self.tables()?;
        tables.conversations.clear();
        tables.metadata.clear();
        Ok(())
    }

    async fn estimate_usage(&self) -> Result<Option<StorageUsage>> {
        Ok(None)
    }
}
