//! Widgets
//!
//! - **types**: `WidgetConfig`, `SelectedField`, `WidgetData`, `DisplayMode`
//! - **store**: ordered widget collection with its mutation operations
//! - **history**: bounded chart samples per widget
//! - **render**: terminal rendering per display mode
//! - **error**: validation and store errors
//!
//! # Lifecycle
//!
//! ```text
//! add ──► WidgetData { last_data: None }
//!           │ refresh (every refresh_interval seconds)
//!           ▼
//!         last_data / last_updated replaced, history sample appended
//!           │ remove
//!           ▼
//!         gone (timer cancelled, history discarded)
//! ```

pub mod error;
pub mod history;
pub mod render;
pub mod store;
pub mod types;

pub use error::{ConfigValidationError, StoreError, StoreResult};
pub use history::{History, HistorySample, HISTORY_CAPACITY};
pub use render::{render_widget, sparkline};
pub use store::{SnapshotEntry, StoreSnapshot, WidgetStore};
pub use types::{
    default_label, new_widget_id, DisplayMode, SelectedField, WidgetConfig, WidgetData,
    DEFAULT_REFRESH_INTERVAL_SECS, MIN_REFRESH_INTERVAL_SECS,
};
