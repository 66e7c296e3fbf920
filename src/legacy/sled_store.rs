use crate::error::{DisaError, Result};
use crate::legacy::LegacyStore;
use sled::Db;
use std::path::Path;

/// Legacy key-value data held in an embedded `sled` database
pub struct SledLegacyStore {
    db: Db,
}

impl SledLegacyStore {
    /// Open or create the legacy store at `path`
    ///
    /// # Errors
    ///
    /// Returns `DisaError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```
    /// use disa_store::legacy::{LegacyStore, SledLegacyStore};
    ///
    /// # fn main() -> disa_store::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = SledLegacyStore::open(dir.path().join("legacy"))?;
    /// store.set_item("disa:conversations", "{}")?;
    /// assert_eq!(store.get_item("disa:conversations")?.as_deref(), Some("{}"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| DisaError::Storage(format!("Failed to open legacy store: {}", e)))?;
        Ok(Self { db })
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| DisaError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

impl LegacyStore for SledLegacyStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| DisaError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    DisaError::Storage(format!("Legacy value for {} is not UTF-8: {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| DisaError::Storage(format!("Insert failed: {}", e)))?;
        self.flush()
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| DisaError::Storage(format!("Remove failed: {}", e)))?;
        self.flush()
    }
}
