use chrono::Utc;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A persisted chat session with its messages and metadata
///
/// Decoding is lenient: every field falls back to its empty default when it
/// is absent or `null`, and a numeric id is read as its decimal string, so
/// incomplete legacy records still load and can be reported by validation.
/// Fields this struct does not know about are carried in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Conversation {
    /// Caller-assigned unique identifier
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    /// Human label, may be empty
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    /// Creation timestamp (ISO-8601)
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
    /// Last modification timestamp (ISO-8601)
    #[serde(deserialize_with = "lenient_string")]
    pub updated_at: String,
    /// Last activity timestamp used by retention cleanup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
    /// Identifier of the AI model last used
    #[serde(deserialize_with = "lenient_string")]
    pub model: String,
    /// Expected to match `messages.len()` when messages are present
    #[serde(deserialize_with = "lenient_count")]
    pub message_count: usize,
    /// Opaque message objects (role, content, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Value>>,
    /// Favorite flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    /// Unrecognized fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `null` reads as empty, numbers and booleans as their JSON text
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(scalar @ (Value::Number(_) | Value::Bool(_))) => Ok(scalar.to_string()),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string, found {}",
            other
        ))),
    }
}

/// `null` reads as 0
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| de::Error::custom(format!("invalid message count {}", n))),
        Some(other) => Err(de::Error::custom(format!(
            "expected a message count, found {}",
            other
        ))),
    }
}

impl Conversation {
    /// Timestamp that retention cleanup compares against the cutoff
    pub fn activity_timestamp(&self) -> &str {
        self.last_activity.as_deref().unwrap_or(&self.updated_at)
    }

    /// Number of messages actually attached to the record
    pub fn actual_message_count(&self) -> usize {
        self.messages.as_ref().map(Vec::len).unwrap_or(0)
    }
}

/// Lightweight projection of a [`Conversation`] used for listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationMetadata {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    pub model: String,
    pub message_count: usize,
}

impl From<&Conversation> for ConversationMetadata {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            created_at: conversation.created_at.clone(),
            updated_at: conversation.updated_at.clone(),
            model: conversation.model.clone(),
            message_count: conversation.message_count,
        }
    }
}

/// Envelope header of an export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub exported_at: String,
    pub total_conversations: usize,
    pub app_version: String,
}

/// Versioned export document consumed by `import_conversations`
///
/// Not to be confused with the legacy backup envelope produced by
/// `StorageMigration::create_backup`, which keys conversations by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportData {
    pub version: String,
    pub metadata: ExportMetadata,
    pub conversations: Vec<Conversation>,
}

/// Export format version written by `export_conversations`
pub const EXPORT_VERSION: &str = "2.0";

impl ExportData {
    /// Wrap a conversation snapshot into an export envelope stamped now
    pub fn new(conversations: Vec<Conversation>, app_version: &str) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            metadata: ExportMetadata {
                exported_at: Utc::now().to_rfc3339(),
                total_conversations: conversations.len(),
                app_version: app_version.to_string(),
            },
            conversations,
        }
    }
}

/// Aggregate statistics over the conversation table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_conversations: usize,
    pub total_messages: usize,
    pub average_messages_per_conversation: f64,
    pub models_used: Vec<String>,
    /// Byte length of the JSON serialization of all records
    pub storage_size: u64,
}

/// Options for `import_conversations`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Replace conversations whose id already exists
    pub overwrite: bool,
    /// Merge into existing conversations (same write path as overwrite)
    pub merge: bool,
}

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub imported_count: usize,
    pub errors: Vec<String>,
}

/// Storage consumption in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub used: u64,
    pub quota: u64,
}

/// Partial update applied over an existing conversation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub model: Option<String>,
    pub messages: Option<Vec<Value>>,
    pub message_count: Option<usize>,
    pub last_activity: Option<String>,
    pub is_favorite: Option<bool>,
}

impl ConversationUpdate {
    /// Overlay the set fields onto `conversation` and stamp `updated_at`
    pub fn apply_to(&self, conversation: &mut Conversation) {
        if let Some(title) = &self.title {
            conversation.title = title.clone();
        }
        if let Some(model) = &self.model {
            conversation.model = model.clone();
        }
        if let Some(messages) = &self.messages {
            conversation.messages = Some(messages.clone());
        }
        if let Some(count) = self.message_count {
            conversation.message_count = count;
        }
        if let Some(last_activity) = &self.last_activity {
            conversation.last_activity = Some(last_activity.clone());
        }
        if let Some(favorite) = self.is_favorite {
            conversation.is_favorite = Some(favorite);
        }
        conversation.updated_at = Utc::now().to_rfc3339();
    }
}

/// Outcome of `bulk_delete_conversations`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeleteResult {
    pub deleted: usize,
    pub errors: Vec<String>,
}

/// Outcome of `bulk_update_conversations`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUpdateResult {
    pub updated: usize,
    pub errors: Vec<String>,
}

/// Outcome of `sync_metadata_from_conversations`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSyncReport {
    pub synced: usize,
    pub already_synced: usize,
    pub errors: Vec<String>,
}
