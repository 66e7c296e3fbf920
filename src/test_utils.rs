//! Test utilities for disa-store
//!
//! Temporary directories, conversation fixtures, and assertion helpers
//! shared by unit tests.

use crate::config::Config;
use crate::storage::Conversation;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory that is removed when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a file with the given content inside `dir`
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error's message contains `expected`
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: crate::error::Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// A fully populated conversation with `messages` user/assistant turns
pub fn sample_conversation(id: &str, messages: usize) -> Conversation {
    let messages: Vec<_> = (0..messages)
        .map(|i| {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            json!({"role": role, "content": format!("message {}", i)})
        })
        .collect();
    Conversation {
        id: id.to_string(),
        title: format!("Conversation {}", id),
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-02T00:00:00Z".to_string(),
        model: "gpt-4".to_string(),
        message_count: messages.len(),
        messages: Some(messages),
        ..Default::default()
    }
}

/// Default configuration pointed at paths inside `dir`
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.db_path = Some(dir.path().join("conversations.db"));
    config.storage.legacy_path = Some(dir.path().join("legacy"));
    config
}

/// Configuration YAML exercising every section
pub fn test_config_yaml() -> String {
    r#"
storage:
  app_version: "2.1.0"
migration:
  clear_legacy_after_success: false
  validate_data: true
  batch_size: 10
  skip_on_error: true
retention:
  cleanup_days: 30
"#
    .to_string()
}
