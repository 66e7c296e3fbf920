use super::{error_message, Published, QueryState};
use crate::error::Result;
use crate::storage::{
    BulkDeleteResult, Conversation, ConversationMetadata, ConversationUpdate, RecordStore,
    StorageStats,
};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Conversation list, optionally filtered by a search query
pub struct ConversationsHandle {
    store: Arc<RecordStore>,
    state: Published<QueryState<Vec<ConversationMetadata>>>,
    query: Mutex<String>,
}

impl ConversationsHandle {
    /// Create the handle, loading the list immediately when `auto_refresh`
    pub async fn mount(store: Arc<RecordStore>, auto_refresh: bool) -> Self {
        let handle = Self {
            store,
            state: Published::new(QueryState::loading(Vec::new())),
            query: Mutex::new(String::new()),
        };
        if auto_refresh {
            handle.refresh().await;
        }
        handle
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<Vec<ConversationMetadata>>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> QueryState<Vec<ConversationMetadata>> {
        self.state.snapshot()
    }

    /// The active search query, empty when listing everything
    pub fn current_query(&self) -> String {
        self.query.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// Reload using the active search query
    pub async fn refresh(&self) {
        self.state.begin();
        let query = self.current_query();
        let conversations = if query.trim().is_empty() {
            self.store.get_all_conversations().await
        } else {
            self.store.search_conversations(&query).await
        };
        self.state.succeed(conversations);
    }

    /// Set the search query and reload
    pub async fn search(&self, query: &str) {
        self.set_query(query);
        self.refresh().await;
    }

    /// Drop the search query and reload the full list
    pub async fn clear_search(&self) {
        self.set_query("");
        self.refresh().await;
    }

    fn set_query(&self, query: &str) {
        if let Ok(mut current) = self.query.lock() {
            *current = query.to_string();
        }
    }
}

/// A single conversation addressed by id
pub struct ConversationHandle {
    store: Arc<RecordStore>,
    id: Option<String>,
    state: Published<QueryState<Option<Conversation>>>,
}

impl ConversationHandle {
    /// Create the handle and load the conversation when an id is given
    pub async fn mount(store: Arc<RecordStore>, id: Option<String>) -> Self {
        let handle = Self {
            store,
            id,
            state: Published::new(QueryState::idle(None)),
        };
        handle.refresh().await;
        handle
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<Option<Conversation>>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> QueryState<Option<Conversation>> {
        self.state.snapshot()
    }

    /// Reload the conversation; without an id the state resets to empty
    pub async fn refresh(&self) {
        let Some(id) = &self.id else {
            self.state.succeed(None);
            return;
        };
        self.state.begin();
        let conversation = self.store.get_conversation(id).await;
        self.state.succeed(conversation);
    }

    /// Write `conversation` and publish it as the current value
    pub async fn save(&self, conversation: Conversation) -> Result<()> {
        self.mutate("Failed to save conversation", async {
            self.store.save_conversation(&conversation).await?;
            Ok(Some(conversation))
        })
        .await
    }

    /// Delete the conversation this handle points at
    pub async fn remove(&self) -> Result<()> {
        let Some(id) = &self.id else {
            return Ok(());
        };
        self.mutate("Failed to delete conversation", async {
            self.store.delete_conversation(id).await?;
            Ok(None)
        })
        .await
    }

    /// Apply a partial update and publish the stored result
    pub async fn update(&self, update: ConversationUpdate) -> Result<()> {
        let Some(id) = self.loaded_id() else {
            return Ok(());
        };
        self.mutate("Failed to update conversation", async {
            self.store.update_conversation(&id, &update).await?;
            Ok(self.store.get_conversation(&id).await)
        })
        .await
    }

    /// Flip the favorite flag and publish the stored result
    pub async fn toggle_favorite(&self) -> Result<()> {
        let Some(id) = self.loaded_id() else {
            return Ok(());
        };
        self.mutate("Failed to toggle favorite status", async {
            self.store.toggle_favorite(&id).await?;
            Ok(self.store.get_conversation(&id).await)
        })
        .await
    }

    fn loaded_id(&self) -> Option<String> {
        self.state.snapshot().data.map(|c| c.id)
    }

    async fn mutate<F>(&self, fallback: &str, action: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<Option<Conversation>>>,
    {
        self.state.update(|state| state.error = None);
        match action.await {
            Ok(conversation) => {
                self.state.update(|state| state.data = conversation);
                Ok(())
            }
            Err(e) => {
                self.state
                    .update(|state| state.error = Some(error_message(&e, fallback)));
                Err(e)
            }
        }
    }
}

/// Aggregate conversation statistics
pub struct StatsHandle {
    store: Arc<RecordStore>,
    state: Published<QueryState<Option<StorageStats>>>,
}

impl StatsHandle {
    pub async fn mount(store: Arc<RecordStore>) -> Self {
        let handle = Self {
            store,
            state: Published::new(QueryState::loading(None)),
        };
        handle.refresh().await;
        handle
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<Option<StorageStats>>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> QueryState<Option<StorageStats>> {
        self.state.snapshot()
    }

    pub async fn refresh(&self) {
        self.state.begin();
        let stats = self.store.get_conversation_stats().await;
        self.state.succeed(Some(stats));
    }
}

/// Whether the record store is reachable
pub struct StorageHealthHandle {
    store: Arc<RecordStore>,
    state: Published<QueryState<bool>>,
}

impl StorageHealthHandle {
    pub async fn mount(store: Arc<RecordStore>) -> Self {
        let handle = Self {
            store,
            state: Published::new(QueryState::loading(false)),
        };
        handle.check_health().await;
        handle
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<bool>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> QueryState<bool> {
        self.state.snapshot()
    }

    pub async fn check_health(&self) {
        self.state.begin();
        let ready = self.store.is_storage_ready().await;
        if ready {
            self.state.succeed(true);
        } else {
            self.state.succeed(false);
            self.state
                .update(|state| state.error = Some("Storage health check failed".to_string()));
        }
    }
}

/// Multi-conversation mutations
pub struct BulkOperationsHandle {
    store: Arc<RecordStore>,
    state: Published<QueryState<Option<BulkDeleteResult>>>,
}

impl BulkOperationsHandle {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            state: Published::new(QueryState::idle(None)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<Option<BulkDeleteResult>>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> QueryState<Option<BulkDeleteResult>> {
        self.state.snapshot()
    }

    /// Delete `ids`; per-item failures are joined into the published error
    pub async fn bulk_delete(&self, ids: &[String]) -> BulkDeleteResult {
        self.state.begin();
        let result = self.store.bulk_delete_conversations(ids).await;
        if result.errors.is_empty() {
            self.state.succeed(Some(result.clone()));
        } else {
            self.state.fail(result.errors.join(", "));
            self.state.update(|state| state.data = Some(result.clone()));
        }
        result
    }
}
