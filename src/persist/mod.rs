//! Dashboard Persistence
//!
//! Explicit save/load of the widget collection under a single namespace key.
//!
//! - **backend**: the `KeyValueBackend` trait and an in-memory backend
//! - **file**: one JSON file per key
//! - **sqlite**: a `kv` table in `finboard.db`
//!
//! # Stored document
//!
//! ```text
//! {"widgets": [{"id": "...", "config": {"name": ..., "apiUrl": ..., ...}}]}
//! ```
//!
//! There is no schema version; missing config fields fall back to defaults
//! on load. Fetched documents, timestamps, and loading flags are never
//! stored.

pub mod backend;
pub mod error;
pub mod file;
pub mod sqlite;

pub use backend::{KeyValueBackend, MemoryBackend};
pub use error::{PersistError, PersistResult};
pub use file::FileBackend;
pub use sqlite::SqliteBackend;

use crate::config::{StorageBackend, StorageConfig};
use crate::widget::{StoreSnapshot, WidgetStore};
use std::path::Path;

/// Default namespace key for the widget collection
pub const DEFAULT_STATE_KEY: &str = "finboard-storage";

/// Serializes the widget store to a backend and back
pub struct Persistence {
    backend: Box<dyn KeyValueBackend>,
    key: String,
}

impl Persistence {
    /// Wrap a backend, storing state under `key`
    pub fn new(backend: Box<dyn KeyValueBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Open the backend selected by configuration
    pub fn open(config: &StorageConfig) -> PersistResult<Self> {
        let data_dir = Path::new(&config.data_dir);
        let backend: Box<dyn KeyValueBackend> = match config.backend {
            StorageBackend::File => Box::new(FileBackend::new(data_dir)),
            StorageBackend::Sqlite => Box::new(SqliteBackend::open(data_dir)?),
            StorageBackend::Memory => Box::new(MemoryBackend::new()),
        };

        tracing::debug!(
            backend = backend.name(),
            data_dir = %config.data_dir,
            key = %config.key,
            "Opened state backend"
        );

        Ok(Self::new(backend, config.key.clone()))
    }

    /// In-memory persistence, nothing survives the process
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()), DEFAULT_STATE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the widget collection; an absent key yields an empty store
    pub fn load(&self) -> PersistResult<WidgetStore> {
        let Some(content) = self.backend.get(&self.key)? else {
            tracing::debug!(key = %self.key, "No saved dashboard, starting empty");
            return Ok(WidgetStore::new());
        };

        let snapshot: StoreSnapshot = serde_json::from_str(&content)?;
        let store = WidgetStore::from_snapshot(snapshot);

        tracing::info!(widgets = store.len(), "Loaded dashboard");
        Ok(store)
    }

    /// Save ids and configs of every widget
    pub fn save(&self, store: &WidgetStore) -> PersistResult<()> {
        let encoded = serde_json::to_string(&store.snapshot())?;
        self.backend.set(&self.key, &encoded)?;

        tracing::debug!(widgets = store.len(), "Saved dashboard");
        Ok(())
    }

    /// Remove the saved dashboard
    pub fn clear(&self) -> PersistResult<()> {
        self.backend.remove(&self.key)
    }
}
