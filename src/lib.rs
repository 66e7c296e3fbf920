//! disa-store - conversation storage and legacy migration library
//!
//! Persists chat conversations in a dual-table record store and migrates
//! conversations out of the legacy flat key-value format.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `storage`: Record store service, backends, and conversation types
//! - `legacy`: Legacy key-value stores holding pre-migration data
//! - `migration`: One-way migration engine, validation, backup and restore
//! - `observable`: Watch-channel handles publishing `{data, loading, error}`
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and its handlers
//!
//! # Example
//!
//! ```
//! use disa_store::legacy::MemoryLegacyStore;
//! use disa_store::migration::{MigrationOptions, StorageMigration};
//! use disa_store::storage::RecordStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(RecordStore::in_memory());
//!     let engine = StorageMigration::new(store, Arc::new(MemoryLegacyStore::new()));
//!
//!     let result = engine.migrate_from_legacy(MigrationOptions::default()).await?;
//!     assert!(result.success);
//!     assert_eq!(result.migrated_count, 0);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod legacy;
pub mod migration;
pub mod observable;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{DisaError, Result};
pub use migration::{MigrationOptions, MigrationResult, StorageMigration};
pub use storage::{Conversation, ConversationMetadata, RecordStore};

#[cfg(test)]
pub mod test_utils;
