//! Legacy flat key-value storage
//!
//! Before the record store existed, conversations lived as two JSON blobs in
//! a flat string key-value store: one map of id to full conversation and one
//! map of id to metadata. This module gives that store a trait so the
//! migration engine can read and clear it regardless of where it lives.

use crate::error::Result;

pub mod memory;
pub mod sled_store;

pub use memory::MemoryLegacyStore;
pub use sled_store::SledLegacyStore;

/// Key holding the JSON map of id to full conversation
pub const LEGACY_CONVERSATIONS_KEY: &str = "disa:conversations";

/// Key holding the JSON map of id to conversation metadata
pub const LEGACY_METADATA_KEY: &str = "disa:conversations:metadata";

/// Flat string key-value store
pub trait LegacyStore: Send + Sync {
    /// Value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing an absent key is not an error
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Read a key, treating empty strings as absent
///
/// Returns `None` on read errors after logging them.
pub(crate) fn read_non_empty(store: &dyn LegacyStore, key: &str) -> Option<String> {
    match store.get_item(key) {
        Ok(Some(value)) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(e) => {
            tracing::error!("Failed to read legacy key {}: {:#}", key, e);
            None
        }
    }
}
