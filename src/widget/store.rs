//! Widget Store
//!
//! Ordered collection of widgets with their latest documents. All mutations
//! are synchronous and take `&mut self`; callers share the store behind a
//! lock so no partially applied update is ever observable.
//!
//! Only ids and configs survive persistence (see [`StoreSnapshot`]); fetched
//! documents are re-acquired by the refresh loop after a reload.

use crate::widget::{StoreError, StoreResult, WidgetConfig, WidgetData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Ordered widget collection
#[derive(Debug, Clone, Default)]
pub struct WidgetStore {
    widgets: Vec<WidgetData>,
}

/// Persisted form of the store: ordered `{id, config}` pairs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub widgets: Vec<SnapshotEntry>,
}

/// One persisted widget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotEntry {
    pub id: String,
    pub config: WidgetConfig,
}

impl WidgetStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Widgets in display order
    pub fn widgets(&self) -> &[WidgetData] {
        &self.widgets
    }

    /// Get a widget by id
    pub fn get(&self, id: &str) -> Option<&WidgetData> {
        self.widgets.iter().find(|w| w.id == id)
    }

    /// Position of a widget in display order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Append a new widget in its pre-fetch state
    pub fn add(&mut self, config: WidgetConfig) -> StoreResult<&WidgetData> {
        config.validate()?;
        if self.contains(&config.id) {
            return Err(StoreError::DuplicateId(config.id));
        }

        self.widgets.push(WidgetData::new(config));
        let idx = self.widgets.len() - 1;
        Ok(&self.widgets[idx])
    }

    /// Remove a widget, returning it if it existed
    pub fn remove(&mut self, id: &str) -> Option<WidgetData> {
        let idx = self.position(id)?;
        Some(self.widgets.remove(idx))
    }

    /// Replace a widget's config, keeping its last document
    ///
    /// The config's id is forced to `id`. Returns the previous config.
    pub fn update(&mut self, id: &str, mut config: WidgetConfig) -> StoreResult<WidgetConfig> {
        config.id = id.to_string();
        config.validate()?;

        let widget = self
            .widgets
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        Ok(std::mem::replace(&mut widget.config, config))
    }

    /// Record a freshly fetched document
    ///
    /// Returns `false` if the widget no longer exists; nothing is created.
    pub fn refresh(&mut self, id: &str, document: Value, updated_at: impl Into<String>) -> bool {
        match self.widgets.iter_mut().find(|w| w.id == id) {
            Some(widget) => {
                widget.last_data = Some(document);
                widget.last_updated = updated_at.into();
                widget.is_loading = false;
                true
            }
            None => false,
        }
    }

    /// Set the loading flag; returns `false` if the widget no longer exists
    pub fn set_loading(&mut self, id: &str, loading: bool) -> bool {
        match self.widgets.iter_mut().find(|w| w.id == id) {
            Some(widget) => {
                widget.is_loading = loading;
                true
            }
            None => false,
        }
    }

    /// Replace the whole ordering
    ///
    /// The caller supplies the new sequence (normally a permutation of the
    /// current one); only id uniqueness is enforced.
    pub fn reorder(&mut self, widgets: Vec<WidgetData>) -> StoreResult<()> {
        let mut seen = HashSet::new();
        for widget in &widgets {
            if !seen.insert(widget.id.as_str()) {
                return Err(StoreError::DuplicateId(widget.id.clone()));
            }
        }

        self.widgets = widgets;
        Ok(())
    }

    /// Move the widget at `from` to position `to`
    pub fn move_widget(&mut self, from: usize, to: usize) -> StoreResult<()> {
        let len = self.widgets.len();
        for index in [from, to] {
            if index >= len {
                return Err(StoreError::OutOfRange { index, len });
            }
        }

        let mut reordered = self.widgets.clone();
        let dragged = reordered.remove(from);
        reordered.insert(to, dragged);
        self.reorder(reordered)
    }

    /// Persistable view: ids and configs only
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            widgets: self
                .widgets
                .iter()
                .map(|w| SnapshotEntry {
                    id: w.id.clone(),
                    config: w.config.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild a store from a snapshot, every widget in its pre-fetch state
    ///
    /// Entries with an empty or repeated id are skipped; configs are
    /// normalized rather than rejected.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::new();

        for SnapshotEntry { id, mut config } in snapshot.widgets {
            if id.trim().is_empty() {
                tracing::warn!("Skipping persisted widget without id");
                continue;
            }
            if store.contains(&id) {
                tracing::warn!(widget_id = %id, "Skipping duplicate persisted widget");
                continue;
            }

            config.id = id;
            config.normalize();
            store.widgets.push(WidgetData::new(config));
        }

        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{ConfigValidationError, DisplayMode, SelectedField};
    use serde_json::json;

    fn config(id: &str) -> WidgetConfig {
        WidgetConfig::new(format!("Widget {}", id), format!("https://api.test/{}", id))
            .id(id)
            .field(SelectedField::new("data.price"))
    }

    fn ids(store: &WidgetStore) -> Vec<&str> {
        store.widgets().iter().map(|w| w.id.as_str()).collect()
    }

    #[test]
    fn test_add_appends_pre_fetch_widget() {
        let mut store = WidgetStore::new();
        store.add(config("a")).unwrap();
        let added = store.add(config("b")).unwrap();

        assert_eq!(added.id, "b");
        assert!(added.last_data.is_none());
        assert_eq!(added.last_updated, "");
        assert!(!added.is_loading);
        assert_eq!(ids(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_add_rejects_duplicates_and_invalid() {
        let mut store = WidgetStore::new();
        store.add(config("a")).unwrap();

        assert_eq!(
            store.add(config("a")).unwrap_err(),
            StoreError::DuplicateId("a".into())
        );

        let mut bad = config("c");
        bad.selected_fields.clear();
        assert_eq!(
            store.add(bad).unwrap_err(),
            StoreError::Invalid(ConfigValidationError::NoFields)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut store = WidgetStore::new();
        store.add(config("a")).unwrap();
        store.add(config("b")).unwrap();

        assert_eq!(store.remove("a").unwrap().id, "a");
        assert!(store.remove("a").is_none());
        assert_eq!(ids(&store), vec!["b"]);
    }

    #[test]
    fn test_update_keeps_last_data() {
        let mut store = WidgetStore::new();
        store.add(config("a")).unwrap();
        store.refresh("a", json!({"data": {"price": 1}}), "10:00:00");

        let new_config = config("other").display_mode(DisplayMode::Chart);
        let previous = store.update("a", new_config).unwrap();

        assert_eq!(previous.display_mode, DisplayMode::Card);
        let widget = store.get("a").unwrap();
        assert_eq!(widget.config.id, "a");
        assert_eq!(widget.config.display_mode, DisplayMode::Chart);
        assert_eq!(widget.last_data, Some(json!({"data": {"price": 1}})));

        assert_eq!(
            store.update("missing", config("missing")).unwrap_err(),
            StoreError::NotFound("missing".into())
        );
    }

    #[test]
    fn test_refresh_missing_widget_is_noop() {
        let mut store = WidgetStore::new();
        assert!(!store.refresh("ghost", json!({}), "10:00:00"));
        assert!(!store.set_loading("ghost", true));
        assert!(store.is_empty());
    }

    #[test]
    fn test_refresh_clears_loading() {
        let mut store = WidgetStore::new();
        store.add(config("a")).unwrap();
        store.set_loading("a", true);
        assert!(store.get("a").unwrap().is_loading);

        assert!(store.refresh("a", json!({"x": 1}), "12:30:00"));
        let widget = store.get("a").unwrap();
        assert!(!widget.is_loading);
        assert_eq!(widget.last_updated, "12:30:00");
    }

    #[test]
    fn test_reorder_and_move() {
        let mut store = WidgetStore::new();
        for id in ["a", "b", "c"] {
            store.add(config(id)).unwrap();
        }

        store.move_widget(0, 2).unwrap();
        assert_eq!(ids(&store), vec!["b", "c", "a"]);

        let mut reversed = store.widgets().to_vec();
        reversed.reverse();
        store.reorder(reversed).unwrap();
        assert_eq!(ids(&store), vec!["a", "c", "b"]);

        let dup = vec![store.widgets()[0].clone(), store.widgets()[0].clone()];
        assert!(store.reorder(dup).is_err());
        assert_eq!(store.len(), 3);

        assert_eq!(
            store.move_widget(3, 0).unwrap_err(),
            StoreError::OutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn test_snapshot_drops_transient_state() {
        let mut store = WidgetStore::new();
        store.add(config("a")).unwrap();
        store.add(config("b")).unwrap();
        store.refresh("a", json!({"data": {"price": 9}}), "10:00:00");

        let restored = WidgetStore::from_snapshot(store.snapshot());

        assert_eq!(ids(&restored), vec!["a", "b"]);
        let widget = restored.get("a").unwrap();
        assert!(widget.last_data.is_none());
        assert_eq!(widget.last_updated, "");
        assert!(!widget.is_loading);
        assert_eq!(widget.config, store.get("a").unwrap().config);
    }

    #[test]
    fn test_from_snapshot_repairs_entries() {
        let snapshot: StoreSnapshot = serde_json::from_value(json!({
            "widgets": [
                {"id": "a", "config": {"name": "A", "apiUrl": "u", "refreshInterval": 1,
                    "selectedFields": [{"path": "x.y"}]}},
                {"id": "a", "config": {"name": "dup"}},
                {"id": "", "config": {"name": "anonymous"}}
            ]
        }))
        .unwrap();

        let store = WidgetStore::from_snapshot(snapshot);
        assert_eq!(store.len(), 1);

        let config = &store.get("a").unwrap().config;
        assert_eq!(config.id, "a");
        assert_eq!(config.name, "A");
        assert_eq!(config.refresh_interval, 5);
        assert_eq!(config.selected_fields[0].label, "y");
    }
}
