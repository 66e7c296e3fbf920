use async_trait::async_trait;
use disa_store::error::{DisaError, Result};
use disa_store::legacy::{MemoryLegacyStore, LEGACY_CONVERSATIONS_KEY, LEGACY_METADATA_KEY};
use disa_store::storage::{
    Conversation, ConversationMetadata, MemoryBackend, RecordStore, SqliteBackend,
    StorageBackend, StorageUsage,
};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Semaphore;

#[allow(dead_code)]
pub fn create_temp_store() -> (RecordStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("conversations.db");
    let backend = SqliteBackend::open(db_path).expect("failed to open sqlite backend");
    (RecordStore::new(Arc::new(backend)), tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Well-formed conversation with `messages` alternating turns
#[allow(dead_code)]
pub fn conversation(id: &str, messages: usize) -> Conversation {
    let messages: Vec<Value> = (0..messages)
        .map(|i| {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            json!({"role": role, "content": format!("message {}", i)})
        })
        .collect();
    Conversation {
        id: id.to_string(),
        title: format!("Conversation {}", id),
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
        model: "gpt-3.5".to_string(),
        message_count: messages.len(),
        messages: Some(messages),
        ..Default::default()
    }
}

/// Legacy conversation map and matching metadata map for `conversations`
#[allow(dead_code)]
pub fn legacy_maps(conversations: &[Value]) -> (String, String) {
    let mut records = Map::new();
    let mut metadata = Map::new();
    for conversation in conversations {
        let id = match &conversation["id"] {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        };
        metadata.insert(
            id.clone(),
            json!({
                "id": conversation["id"],
                "title": conversation["title"],
                "createdAt": conversation["createdAt"],
                "updatedAt": conversation["updatedAt"],
                "model": conversation["model"],
                "messageCount": conversation["messageCount"],
            }),
        );
        records.insert(id, conversation.clone());
    }
    (
        Value::Object(records).to_string(),
        Value::Object(metadata).to_string(),
    )
}

/// Legacy store seeded with both keys for `conversations`
#[allow(dead_code)]
pub fn legacy_with(conversations: &[Value]) -> Arc<MemoryLegacyStore> {
    let (records, metadata) = legacy_maps(conversations);
    Arc::new(MemoryLegacyStore::with_items([
        (LEGACY_CONVERSATIONS_KEY, records),
        (LEGACY_METADATA_KEY, metadata),
    ]))
}

/// Legacy JSON for `count` valid conversations with ids `0..count`
#[allow(dead_code)]
pub fn legacy_conversations(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| serde_json::to_value(conversation(&format!("{:03}", i), 2)).unwrap())
        .collect()
}

/// Backend wrapper that injects failures and can hold writes at a gate
#[allow(dead_code)]
pub struct FaultyBackend {
    inner: MemoryBackend,
    fail_ids: HashSet<String>,
    fail_all: AtomicBool,
    gate: Option<Arc<Semaphore>>,
    puts: AtomicUsize,
}

#[allow(dead_code)]
impl FaultyBackend {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            fail_ids: HashSet::new(),
            fail_all: AtomicBool::new(false),
            gate: None,
            puts: AtomicUsize::new(0),
        }
    }

    /// Fail every write of a conversation with one of `ids`
    pub fn failing_ids<I: IntoIterator<Item = &'static str>>(mut self, ids: I) -> Self {
        self.fail_ids = ids.into_iter().map(str::to_string).collect();
        self
    }

    /// Make every operation fail until reset
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Hold each write until a permit is available on `gate`
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of write attempts observed
    pub fn put_attempts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(DisaError::Storage("injected backend failure".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FaultyBackend {
    fn name(&self) -> &'static str {
        "faulty"
    }

    async fn load_conversations(&self) -> Result<Vec<Conversation>> {
        self.check()?;
        self.inner.load_conversations().await
    }

    async fn load_metadata(&self) -> Result<Vec<ConversationMetadata>> {
        self.check()?;
        self.inner.load_metadata().await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        self.check()?;
        self.inner.get_conversation(id).await
    }

    async fn get_metadata(&self, id: &str) -> Result<Option<ConversationMetadata>> {
        self.check()?;
        self.inner.get_metadata(id).await
    }

    async fn put_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| DisaError::Storage(e.to_string()))?;
        }
        self.check()?;
        if self.fail_ids.contains(&conversation.id) {
            return Err(DisaError::Storage(format!(
                "injected write failure for {}",
                conversation.id
            ))
            .into());
        }
        self.inner.put_conversation(conversation).await
    }

    async fn put_metadata(&self, metadata: &ConversationMetadata) -> Result<()> {
        self.check()?;
        self.inner.put_metadata(metadata).await
    }

    async fn delete_conversations(&self, ids: &[String]) -> Result<()> {
        self.check()?;
        self.inner.delete_conversations(ids).await
    }

    async fn clear(&self) -> Result<()> {
        self.check()?;
        self.inner.clear().await
    }

    async fn estimate_usage(&self) -> Result<Option<StorageUsage>> {
        self.check()?;
        self.inner.estimate_usage().await
    }
}
