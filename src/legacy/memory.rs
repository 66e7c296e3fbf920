use crate::error::{DisaError, Result};
use crate::legacy::LegacyStore;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Legacy store kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryLegacyStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryLegacyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given key/value pairs
    pub fn with_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            items: Mutex::new(
                items
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn items(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| DisaError::Storage("Legacy store lock poisoned".into()).into())
    }
}

impl LegacyStore for MemoryLegacyStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items()?.remove(key);
        Ok(())
    }
}
