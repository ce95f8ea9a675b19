//! Per-widget refresh state
//!
//! Transient, in-memory only: rebuilt from scratch every session.

use crate::fetch::FetchError;
use crate::widget::History;
use serde::Serialize;

/// Where a widget is in its refresh cycle
///
/// `Idle → Fetching → Updated | Failed`, then `Fetching` again on the next
/// tick. `Updated` and `Failed` are resting states that remember how the
/// latest fetch ended.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPhase {
    #[default]
    Idle,
    Fetching,
    Updated,
    Failed,
}

/// Refresh bookkeeping for one widget
#[derive(Debug, Clone)]
pub struct WidgetRuntime {
    pub phase: RefreshPhase,
    /// Message of the latest failure, cleared by the next success
    pub error: Option<String>,
    /// Recent primary-field values
    pub history: History,
    /// Sequence number handed to the most recently started fetch
    pub(crate) issued: u64,
    /// Sequence number of the newest fetch whose result was applied
    pub(crate) applied: u64,
    pub(crate) in_flight: usize,
}

impl WidgetRuntime {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            phase: RefreshPhase::Idle,
            error: None,
            history: History::with_capacity(history_capacity),
            issued: 0,
            applied: 0,
            in_flight: 0,
        }
    }

    /// Fetches started and not yet completed
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Stamp a new fetch and return its sequence number
    pub(crate) fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.in_flight += 1;
        self.phase = RefreshPhase::Fetching;
        self.issued
    }

    /// Record that fetch `seq` finished
    ///
    /// Returns `false` when a newer fetch has already been applied, in
    /// which case the result must be discarded.
    pub(crate) fn finish(&mut self, seq: u64) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if seq < self.applied {
            return false;
        }
        self.applied = seq;
        true
    }
}

/// Broadcast to observers of the refresh loop
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    /// A fetch started
    Fetching { widget_id: String },
    /// A new document was stored; `sample` is the primary value appended to
    /// the history, if it was numeric
    Updated {
        widget_id: String,
        sample: Option<f64>,
    },
    /// A fetch failed; the previous document is kept
    Failed {
        widget_id: String,
        error: FetchError,
    },
}

impl RefreshEvent {
    pub fn widget_id(&self) -> &str {
        match self {
            RefreshEvent::Fetching { widget_id }
            | RefreshEvent::Updated { widget_id, .. }
            | RefreshEvent::Failed { widget_id, .. } => widget_id,
        }
    }
}

/// How a single refresh attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Document stored
    Updated { sample: Option<f64> },
    /// Fetch failed, previous document kept
    Failed(FetchError),
    /// A newer fetch already completed; this result was dropped
    Stale,
    /// The widget no longer exists
    Removed,
}
