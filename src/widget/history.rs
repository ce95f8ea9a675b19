//! Bounded chart history
//!
//! Recent numeric samples of a widget's primary field. In-memory only:
//! history starts empty every session and is dropped with its widget.

use serde::Serialize;
use std::collections::VecDeque;

/// Samples kept per widget
pub const HISTORY_CAPACITY: usize = 20;

/// One chart point
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistorySample {
    /// Local `HH:MM` of the refresh
    pub time: String,
    pub value: f64,
}

/// Fixed-capacity sample buffer, oldest evicted first
#[derive(Debug, Clone, Serialize)]
pub struct History {
    samples: VecDeque<HistorySample>,
    capacity: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// A buffer holding at most `capacity` samples (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest once over capacity
    pub fn push(&mut self, time: impl Into<String>, value: f64) {
        self.samples.push_back(HistorySample {
            time: time.into(),
            value,
        });
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples in chronological order
    pub fn iter(&self) -> impl Iterator<Item = &HistorySample> {
        self.samples.iter()
    }

    /// Values in chronological order
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
