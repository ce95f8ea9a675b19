//! # Finboard
//!
//! Data-shaping pipeline for a dashboard of JSON widgets. Each widget polls
//! a user-supplied URL, keeps the latest document, and shows a handful of
//! fields picked from it by dotted path.
//!
//! ## Modules
//!
//! - [`json`]: flattening documents into leaf paths and resolving paths back
//! - [`format`]: currency abbreviation and clock formatting
//! - [`fetch`]: the `Fetch` trait and its HTTP implementation
//! - [`widget`]: widget configs, the ordered widget store, chart history
//! - [`persist`]: saving the widget collection under a single key
//! - [`refresh`]: per-widget refresh loops
//! - [`dashboard`]: everything above wired together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use finboard::{Config, Dashboard, SelectedField};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dashboard = Dashboard::open(&Config::load_default())?;
//!
//!     // Pick fields from a sample response
//!     let fields = dashboard.test_api("https://api.coinbase.com/v2/prices/BTC-USD/spot").await?;
//!     for field in &fields {
//!         println!("{} ({})", field.path, field.field_type);
//!     }
//!
//!     let id = dashboard
//!         .add_widget(
//!             dashboard
//!                 .new_widget("Bitcoin", "https://api.coinbase.com/v2/prices/BTC-USD/spot")
//!                 .field(SelectedField::new("data.amount").label("Price")),
//!         )
//!         .await?;
//!
//!     dashboard.refresh(&id).await;
//!     if let Some(view) = dashboard.render(&id).await {
//!         println!("{}", view);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod format;
pub mod json;
pub mod persist;
pub mod refresh;
pub mod widget;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError, LoggingConfig, StorageBackend, StorageConfig};

pub use dashboard::{Dashboard, DashboardError, DashboardResult};

pub use fetch::{Fetch, FetchConfig, FetchError, FetchErrorKind, FetchResult, HttpFetcher};

pub use format::{format_clock, format_currency, format_time, MISSING_PLACEHOLDER};

pub use json::{flatten, resolve, FieldType, FlattenedField};

pub use persist::{KeyValueBackend, PersistError, PersistResult, Persistence};

pub use refresh::{RefreshEvent, RefreshOutcome, RefreshPhase, RefreshScheduler, SharedStore};

pub use widget::{
    DisplayMode, History, SelectedField, StoreError, StoreResult, WidgetConfig, WidgetData,
    WidgetStore,
};
