//! Key-value backends
//!
//! Dashboard state is a single serialized document stored under one key.
//! Backends only move strings; encoding lives in [`super::Persistence`].

use crate::persist::{PersistError, PersistResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// Minimal string key-value storage
pub trait KeyValueBackend: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> PersistResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> PersistResult<()>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove(&self, key: &str) -> PersistResult<()>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Process-local backend, nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> PersistResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| PersistError::Lock(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PersistResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PersistError::Lock(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PersistResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PersistError::Lock(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
