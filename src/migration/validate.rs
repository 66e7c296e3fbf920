//! Advisory validation and repair of legacy conversation records
//!
//! Validation only produces warning strings; it never blocks a migration or
//! restore. Sanitization fills in what validation complains about so the
//! record can be written.

use crate::storage::{now_rfc3339, parse_timestamp, Conversation};
use uuid::Uuid;

/// Title given to conversations that arrive without one
pub const DEFAULT_TITLE: &str = "Untitled conversation";

/// Model recorded for conversations that arrive without one
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Collect warnings for every structural problem in `conversations`
///
/// A record without an id gets a single warning and no further checks.
///
/// # Examples
///
/// ```
/// use disa_store::migration::validate_conversations;
/// use disa_store::storage::Conversation;
///
/// let conv = Conversation { id: "7".into(), ..Default::default() };
/// let warnings = validate_conversations(&[conv]);
/// assert!(warnings.iter().any(|w| w == "Conversation 7 missing title"));
/// ```
pub fn validate_conversations(conversations: &[Conversation]) -> Vec<String> {
    let mut warnings = Vec::new();

    for conversation in conversations {
        if conversation.id.is_empty() {
            warnings.push("Conversation missing ID".to_string());
            continue;
        }
        let id = &conversation.id;

        let required = [
            ("title", &conversation.title),
            ("createdAt", &conversation.created_at),
            ("updatedAt", &conversation.updated_at),
            ("model", &conversation.model),
        ];
        for (field, value) in required {
            if value.is_empty() {
                warnings.push(format!("Conversation {} missing {}", id, field));
            }
        }

        let created = non_empty(&conversation.created_at).map(parse_timestamp);
        let updated = non_empty(&conversation.updated_at).map(parse_timestamp);
        if matches!(created, Some(None)) || matches!(updated, Some(None)) {
            warnings.push(format!("Conversation {} has invalid dates", id));
        }

        if let Some(messages) = &conversation.messages {
            if conversation.message_count != messages.len() {
                warnings.push(format!(
                    "Conversation {} has inconsistent message count: stored {}, actual {}",
                    id,
                    conversation.message_count,
                    messages.len()
                ));
            }
        }

        if let (Some(Some(created)), Some(Some(updated))) = (created, updated) {
            if created > updated {
                warnings.push(format!(
                    "Conversation {} has createdAt timestamp newer than updatedAt",
                    id
                ));
            }
        }
    }

    warnings
}

/// Return a copy of `conversation` with missing or broken fields repaired
///
/// Missing id becomes a fresh UUID, missing title and model get defaults,
/// unusable timestamps are replaced (created with now, updated with
/// created), and the message count is recomputed from the messages.
pub fn sanitize_conversation(conversation: &Conversation) -> Conversation {
    let mut sanitized = conversation.clone();

    if sanitized.id.is_empty() {
        sanitized.id = Uuid::new_v4().to_string();
    }
    if sanitized.title.is_empty() {
        sanitized.title = DEFAULT_TITLE.to_string();
    }
    if sanitized.model.is_empty() {
        sanitized.model = DEFAULT_MODEL.to_string();
    }
    if parse_timestamp(&sanitized.created_at).is_none() {
        sanitized.created_at = now_rfc3339();
    }
    if parse_timestamp(&sanitized.updated_at).is_none() {
        sanitized.updated_at = sanitized.created_at.clone();
    }
    if let Some(messages) = &sanitized.messages {
        sanitized.message_count = messages.len();
    }

    sanitized
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}
