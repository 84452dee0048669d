//! In-process key/value store, for tests and throwaway sessions.

use crate::domain::error::FundwatchError;
use crate::ports::store_port::KvStore;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryStoreAdapter {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStoreAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> FundwatchError {
        FundwatchError::Store {
            reason: "memory store lock poisoned".into(),
        }
    }
}

impl KvStore for MemoryStoreAdapter {
    fn get(&self, key: &str) -> Result<Option<String>, FundwatchError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FundwatchError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), FundwatchError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.remove(key);
        Ok(())
    }
}
