//! Core widget types
//!
//! - `WidgetConfig`: what to fetch, how often, and which fields to show
//! - `SelectedField`: one chosen leaf of the widget's document
//! - `WidgetData`: a config plus its latest fetched document
//! - `DisplayMode`: card, table, or chart presentation
//!
//! Field names serialize in camelCase (`apiUrl`, `refreshInterval`,
//! `selectedFields`) so persisted dashboards stay readable by other tools.

use crate::json::FlattenedField;
use crate::widget::ConfigValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;

/// Shortest allowed refresh interval, in seconds
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 5;

/// Refresh interval for new widgets, in seconds
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// How a widget presents its selected fields
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// One value per line, the first one emphasized
    #[default]
    Card,
    /// An array field as rows, or a label/value list
    Table,
    /// Recent history of the first selected field
    Chart,
}

impl DisplayMode {
    pub fn all() -> &'static [DisplayMode] {
        &[DisplayMode::Card, DisplayMode::Table, DisplayMode::Chart]
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayMode::Card => write!(f, "Card"),
            DisplayMode::Table => write!(f, "Table"),
            DisplayMode::Chart => write!(f, "Chart"),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "card" => Ok(DisplayMode::Card),
            "table" => Ok(DisplayMode::Table),
            "chart" => Ok(DisplayMode::Chart),
            other => Err(format!(
                "unknown display mode '{}' (expected card, table, or chart)",
                other
            )),
        }
    }
}

/// A leaf the user picked for display
///
/// Selections are identified by `path`; `label` defaults to the last
/// path segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedField {
    pub path: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default = "undefined_type")]
    pub field_type: String,
}

fn undefined_type() -> String {
    "undefined".to_string()
}

impl SelectedField {
    /// Select a path with the default label and an unknown type
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            label: default_label(&path),
            path,
            field_type: undefined_type(),
        }
    }

    /// Builder method: set the display label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Builder method: set the type tag
    pub fn field_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = field_type.into();
        self
    }

    /// Label to display, falling back to the path's last segment
    pub fn display_label(&self) -> String {
        if self.label.is_empty() {
            default_label(&self.path)
        } else {
            self.label.clone()
        }
    }
}

impl From<&FlattenedField> for SelectedField {
    fn from(field: &FlattenedField) -> Self {
        SelectedField::new(field.path.clone()).field_type(field.field_type.as_str())
    }
}

/// Last `.`-separated segment of a path, or the whole path if that is empty
pub fn default_label(path: &str) -> String {
    match path.rsplit('.').next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => path.to_string(),
    }
}

/// User-defined widget configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub api_url: String,
    /// Seconds between refreshes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    #[serde(default)]
    pub display_mode: DisplayMode,
    #[serde(default)]
    pub selected_fields: Vec<SelectedField>,
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

impl WidgetConfig {
    /// Create a config with a fresh id and default settings
    pub fn new(name: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            id: new_widget_id(),
            name: name.into(),
            api_url: api_url.into(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL_SECS,
            display_mode: DisplayMode::default(),
            selected_fields: Vec::new(),
        }
    }

    /// Builder method: set the id
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder method: set the refresh interval in seconds
    pub fn refresh_interval(mut self, secs: u64) -> Self {
        self.refresh_interval = secs;
        self
    }

    /// Builder method: set the display mode
    pub fn display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = mode;
        self
    }

    /// Builder method: append a selected field
    pub fn field(mut self, field: SelectedField) -> Self {
        self.selected_fields.push(field);
        self
    }

    /// The field that drives chart history and card emphasis
    pub fn primary_field(&self) -> Option<&SelectedField> {
        self.selected_fields.first()
    }

    /// Refresh interval as a duration
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval)
    }

    /// Check that the config can be saved
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.id.trim().is_empty() {
            return Err(ConfigValidationError::MissingId);
        }
        if self.name.trim().is_empty() {
            return Err(ConfigValidationError::MissingName);
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigValidationError::MissingUrl);
        }
        if self.refresh_interval < MIN_REFRESH_INTERVAL_SECS {
            return Err(ConfigValidationError::IntervalTooShort {
                secs: self.refresh_interval,
                min: MIN_REFRESH_INTERVAL_SECS,
            });
        }
        if self.selected_fields.is_empty() {
            return Err(ConfigValidationError::NoFields);
        }

        let mut seen = HashSet::new();
        for field in &self.selected_fields {
            if !seen.insert(field.path.as_str()) {
                return Err(ConfigValidationError::DuplicateField(field.path.clone()));
            }
        }

        Ok(())
    }

    /// Repair a config read from storage: clamp the interval, drop
    /// duplicate paths (first wins), and fill empty labels
    pub fn normalize(&mut self) {
        if self.refresh_interval < MIN_REFRESH_INTERVAL_SECS {
            self.refresh_interval = MIN_REFRESH_INTERVAL_SECS;
        }

        let mut seen = HashSet::new();
        self.selected_fields.retain(|f| seen.insert(f.path.clone()));

        for field in &mut self.selected_fields {
            if field.label.is_empty() {
                field.label = default_label(&field.path);
            }
        }
    }
}

/// Generate a new unique widget id
pub fn new_widget_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A widget and its most recent fetch result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetData {
    pub id: String,
    pub config: WidgetConfig,
    /// Latest fetched document, absent until the first successful refresh
    pub last_data: Option<Value>,
    /// Local time of the latest successful refresh, empty before it
    pub last_updated: String,
    pub is_loading: bool,
}

impl WidgetData {
    /// A widget in its pre-fetch state
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            id: config.id.clone(),
            config,
            last_data: None,
            last_updated: String::new(),
            is_loading: false,
        }
    }
}
