//! Widget Refresh
//!
//! Periodic fetching of each widget's source and the transient state that
//! goes with it (loading flag, latest error, chart history).

mod scheduler;
mod state;

pub use scheduler::RefreshScheduler;
pub use state::{RefreshEvent, RefreshOutcome, RefreshPhase, WidgetRuntime};

use crate::widget::WidgetStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Widget store shared between the dashboard and the refresh loops
pub type SharedStore = Arc<RwLock<WidgetStore>>;
