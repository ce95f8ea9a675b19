//! Refresh Scheduler
//!
//! Drives one periodic fetch loop per widget and applies the results to the
//! shared widget store.
//!
//! Every tick starts its own fetch, so a slow endpoint can have several
//! requests in flight. Each fetch is stamped with a per-widget sequence
//! number and a completion older than the newest applied one is dropped.
//! Completions for widgets that have been removed are dropped too.

use super::state::{RefreshEvent, RefreshOutcome, RefreshPhase, WidgetRuntime};
use super::SharedStore;
use crate::fetch::{Fetch, FetchResult};
use crate::format::{format_clock, format_time, numeric_value};
use crate::json::resolve;
use crate::widget::HISTORY_CAPACITY;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const EVENT_CAPACITY: usize = 256;

/// A running refresh loop and the settings it was started with
struct ArmedLoop {
    handle: JoinHandle<()>,
    api_url: String,
    interval: Duration,
}

/// Periodic refresh of every armed widget
pub struct RefreshScheduler {
    store: SharedStore,
    fetcher: Arc<dyn Fetch>,
    loops: Mutex<HashMap<String, ArmedLoop>>,
    runtimes: Mutex<HashMap<String, WidgetRuntime>>,
    events: broadcast::Sender<RefreshEvent>,
    history_capacity: usize,
}

impl RefreshScheduler {
    /// Create a scheduler over `store`
    pub fn new(store: SharedStore, fetcher: Arc<dyn Fetch>) -> Arc<Self> {
        Self::with_history_capacity(store, fetcher, HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(
        store: SharedStore,
        fetcher: Arc<dyn Fetch>,
        history_capacity: usize,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Arc::new(Self {
            store,
            fetcher,
            loops: Mutex::new(HashMap::new()),
            runtimes: Mutex::new(HashMap::new()),
            events,
            history_capacity,
        })
    }

    /// Subscribe to refresh events
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    /// The store this scheduler writes to
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Start (or restart) the refresh loop of a widget
    ///
    /// The first fetch happens immediately. Returns `false` if the widget
    /// is not in the store.
    pub async fn arm(self: &Arc<Self>, id: &str) -> bool {
        let settings = {
            let store = self.store.read().await;
            store
                .get(id)
                .map(|w| (w.config.api_url.clone(), w.config.interval()))
        };
        let Some((api_url, interval)) = settings else {
            return false;
        };

        let handle = self.spawn_loop(id.to_string(), interval);
        let previous = self.loops.lock().await.insert(
            id.to_string(),
            ArmedLoop {
                handle,
                api_url,
                interval,
            },
        );
        if let Some(previous) = previous {
            previous.handle.abort();
        }

        tracing::info!(
            widget_id = %id,
            interval_secs = interval.as_secs(),
            "Armed widget refresh"
        );
        true
    }

    /// Arm every widget in the store, in display order
    pub async fn arm_all(self: &Arc<Self>) -> usize {
        let ids: Vec<String> = {
            let store = self.store.read().await;
            store.widgets().iter().map(|w| w.id.clone()).collect()
        };

        let mut armed = 0;
        for id in ids {
            if self.arm(&id).await {
                armed += 1;
            }
        }
        armed
    }

    /// Re-arm an armed widget whose URL or interval changed
    ///
    /// Returns `true` if the loop was restarted. Unarmed widgets are left
    /// alone; widgets missing from the store are cancelled.
    pub async fn reconfigure(self: &Arc<Self>, id: &str) -> bool {
        let settings = {
            let store = self.store.read().await;
            store
                .get(id)
                .map(|w| (w.config.api_url.clone(), w.config.interval()))
        };
        let Some((api_url, interval)) = settings else {
            self.cancel(id).await;
            return false;
        };

        let changed = match self.loops.lock().await.get(id) {
            Some(armed) => armed.api_url != api_url || armed.interval != interval,
            None => false,
        };

        if changed {
            tracing::debug!(widget_id = %id, "Widget source changed, re-arming");
            self.arm(id).await
        } else {
            false
        }
    }

    /// Stop a widget's loop and forget its refresh state
    ///
    /// Fetches already in flight run to completion but their results are
    /// discarded.
    pub async fn cancel(&self, id: &str) {
        if let Some(armed) = self.loops.lock().await.remove(id) {
            armed.handle.abort();
            tracing::info!(widget_id = %id, "Cancelled widget refresh");
        }
        self.runtimes.lock().await.remove(id);
    }

    /// Stop every loop
    pub async fn shutdown(&self) {
        let mut loops = self.loops.lock().await;
        for (_, armed) in loops.drain() {
            armed.handle.abort();
        }
        tracing::info!("Refresh scheduler stopped");
    }

    /// Whether a loop is running for `id`
    pub async fn is_armed(&self, id: &str) -> bool {
        self.loops.lock().await.contains_key(id)
    }

    pub async fn armed_count(&self) -> usize {
        self.loops.lock().await.len()
    }

    /// Snapshot of a widget's refresh state
    pub async fn runtime(&self, id: &str) -> Option<WidgetRuntime> {
        self.runtimes.lock().await.get(id).cloned()
    }

    /// Fetch a widget once, outside of its schedule
    pub async fn refresh_now(&self, id: &str) -> RefreshOutcome {
        self.execute(id).await
    }

    fn spawn_loop(self: &Arc<Self>, id: String, interval: Duration) -> JoinHandle<()> {
        let scheduler: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(scheduler) = scheduler.upgrade() else {
                    break;
                };
                if !scheduler.store.read().await.contains(&id) {
                    tracing::debug!(widget_id = %id, "Widget gone, stopping refresh loop");
                    break;
                }

                let widget_id = id.clone();
                tokio::spawn(async move {
                    scheduler.execute(&widget_id).await;
                });
            }
        })
    }

    async fn execute(&self, id: &str) -> RefreshOutcome {
        let (api_url, seq) = {
            let mut store = self.store.write().await;
            let Some(widget) = store.get(id) else {
                return RefreshOutcome::Removed;
            };
            let api_url = widget.config.api_url.clone();
            store.set_loading(id, true);

            // Registered under the store lock so a concurrent removal either
            // sees this entry or prevents it.
            let mut runtimes = self.runtimes.lock().await;
            let runtime = runtimes
                .entry(id.to_string())
                .or_insert_with(|| WidgetRuntime::new(self.history_capacity));
            (api_url, runtime.begin())
        };

        let _ = self.events.send(RefreshEvent::Fetching {
            widget_id: id.to_string(),
        });
        tracing::debug!(widget_id = %id, seq, url = %api_url, "Fetching widget data");

        let result = self.fetcher.fetch(&api_url).await;
        let outcome = self.complete(id, seq, result).await;

        match &outcome {
            RefreshOutcome::Updated { sample } => {
                let _ = self.events.send(RefreshEvent::Updated {
                    widget_id: id.to_string(),
                    sample: *sample,
                });
            }
            RefreshOutcome::Failed(error) => {
                tracing::warn!(widget_id = %id, error = %error, "Widget refresh failed");
                let _ = self.events.send(RefreshEvent::Failed {
                    widget_id: id.to_string(),
                    error: error.clone(),
                });
            }
            RefreshOutcome::Stale => {
                tracing::debug!(widget_id = %id, seq, "Discarding stale completion");
            }
            RefreshOutcome::Removed => {
                tracing::debug!(widget_id = %id, "Discarding completion for removed widget");
            }
        }

        outcome
    }

    async fn complete(&self, id: &str, seq: u64, result: FetchResult<Value>) -> RefreshOutcome {
        let mut store = self.store.write().await;
        let mut runtimes = self.runtimes.lock().await;

        let Some(primary_path) = store
            .get(id)
            .map(|w| w.config.primary_field().map(|f| f.path.clone()))
        else {
            runtimes.remove(id);
            return RefreshOutcome::Removed;
        };
        let Some(runtime) = runtimes.get_mut(id) else {
            return RefreshOutcome::Removed;
        };

        let fresh = runtime.finish(seq);
        let still_loading = runtime.in_flight() > 0;
        if !fresh {
            store.set_loading(id, still_loading);
            if !still_loading {
                runtime.phase = if runtime.error.is_some() {
                    RefreshPhase::Failed
                } else {
                    RefreshPhase::Updated
                };
            }
            return RefreshOutcome::Stale;
        }

        let outcome = match result {
            Ok(document) => {
                let now = chrono::Local::now();
                let sample = primary_path
                    .as_deref()
                    .and_then(|path| resolve(&document, path))
                    .and_then(numeric_value);

                store.refresh(id, document, format_clock(&now));
                if let Some(value) = sample {
                    runtime.history.push(format_time(&now), value);
                }
                runtime.error = None;
                runtime.phase = RefreshPhase::Updated;
                RefreshOutcome::Updated { sample }
            }
            Err(error) => {
                runtime.error = Some(error.to_string());
                runtime.phase = RefreshPhase::Failed;
                RefreshOutcome::Failed(error)
            }
        };

        store.set_loading(id, still_loading);
        if still_loading {
            runtime.phase = RefreshPhase::Fetching;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, FetchErrorKind};
    use crate::widget::{SelectedField, WidgetConfig, WidgetStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::RwLock;

    /// Replays scripted responses, each after a delay; once the script runs
    /// out every call answers `{"price": <call number>}` immediately.
    struct ScriptedFetcher {
        script: StdMutex<VecDeque<(Duration, FetchResult<Value>)>>,
        urls: StdMutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<(Duration, FetchResult<Value>)>) -> Arc<Self> {
            Arc::new(Self {
                script: StdMutex::new(script.into()),
                urls: StdMutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.urls.lock().unwrap().len()
        }

        fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetch for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> FetchResult<Value> {
            let call = {
                let mut urls = self.urls.lock().unwrap();
                urls.push(url.to_string());
                urls.len()
            };
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some((delay, result)) => {
                    tokio::time::sleep(delay).await;
                    result
                }
                None => Ok(json!({ "price": call })),
            }
        }
    }

    fn shared_store(interval: u64) -> SharedStore {
        let mut store = WidgetStore::new();
        store
            .add(
                WidgetConfig::new("BTC", "https://api.test/one")
                    .id("w1")
                    .refresh_interval(interval)
                    .field(SelectedField::new("price")),
            )
            .unwrap();
        Arc::new(RwLock::new(store))
    }

    async fn next_completion(rx: &mut broadcast::Receiver<RefreshEvent>) -> RefreshEvent {
        loop {
            match rx.recv().await.unwrap() {
                RefreshEvent::Fetching { .. } => continue,
                event => return event,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_is_immediate() {
        let store = shared_store(10);
        let fetcher = ScriptedFetcher::new(vec![]);
        let scheduler = RefreshScheduler::new(store.clone(), fetcher.clone());
        let mut rx = scheduler.subscribe();

        let started = tokio::time::Instant::now();
        assert!(scheduler.arm("w1").await);
        let event = next_completion(&mut rx).await;

        assert!(matches!(event, RefreshEvent::Updated { sample: Some(v), .. } if v == 1.0));
        assert_eq!(started.elapsed(), Duration::ZERO);
        {
            let store = store.read().await;
            let widget = store.get("w1").unwrap();
            assert_eq!(widget.last_data, Some(json!({"price": 1})));
            assert!(!widget.is_loading);
            assert_eq!(widget.last_updated.len(), 8);
        }

        next_completion(&mut rx).await;
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        assert_eq!(fetcher.calls(), 2);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_keeps_latest_samples() {
        let store = shared_store(5);
        let fetcher = ScriptedFetcher::new(vec![]);
        let scheduler = RefreshScheduler::new(store, fetcher);
        let mut rx = scheduler.subscribe();

        scheduler.arm("w1").await;
        for _ in 0..25 {
            next_completion(&mut rx).await;
        }
        scheduler.shutdown().await;

        let runtime = scheduler.runtime("w1").await.unwrap();
        assert_eq!(runtime.history.len(), 20);
        let expected: Vec<f64> = (6..=25).map(|n| n as f64).collect();
        assert_eq!(runtime.history.values(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_document() {
        let store = shared_store(5);
        let fetcher = ScriptedFetcher::new(vec![
            (Duration::ZERO, Ok(json!({"price": 10}))),
            (Duration::ZERO, Err(FetchError::Status(500))),
            (Duration::ZERO, Ok(json!({"price": 30}))),
        ]);
        let scheduler = RefreshScheduler::new(store.clone(), fetcher);
        let mut rx = scheduler.subscribe();

        scheduler.arm("w1").await;
        next_completion(&mut rx).await;

        let event = next_completion(&mut rx).await;
        assert!(matches!(
            event,
            RefreshEvent::Failed { error: FetchError::Status(500), .. }
        ));
        let runtime = scheduler.runtime("w1").await.unwrap();
        assert_eq!(runtime.phase, RefreshPhase::Failed);
        assert_eq!(runtime.error.as_deref(), Some("HTTP error! status: 500"));
        assert_eq!(
            store.read().await.get("w1").unwrap().last_data,
            Some(json!({"price": 10}))
        );

        // The loop keeps going and the next success clears the error
        next_completion(&mut rx).await;
        let runtime = scheduler.runtime("w1").await.unwrap();
        assert_eq!(runtime.phase, RefreshPhase::Updated);
        assert!(runtime.error.is_none());
        assert_eq!(runtime.history.values(), vec![10.0, 30.0]);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_kinds_are_distinguishable() {
        let store = shared_store(60);
        let fetcher = ScriptedFetcher::new(vec![
            (Duration::ZERO, Err(FetchError::Transport("connection refused".into()))),
            (Duration::ZERO, Err(FetchError::Status(404))),
            (Duration::ZERO, Err(FetchError::Parse("expected value".into()))),
        ]);
        let scheduler = RefreshScheduler::new(store, fetcher);

        let mut kinds = Vec::new();
        for _ in 0..3 {
            match scheduler.refresh_now("w1").await {
                RefreshOutcome::Failed(error) => kinds.push(error.kind()),
                other => panic!("unexpected outcome {:?}", other),
            }
        }

        assert_eq!(
            kinds,
            vec![
                FetchErrorKind::Transport,
                FetchErrorKind::Status,
                FetchErrorKind::Parse
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_widget_is_not_resurrected() {
        let store = shared_store(5);
        let fetcher = ScriptedFetcher::new(vec![(Duration::from_secs(3), Ok(json!({"price": 1})))]);
        let scheduler = RefreshScheduler::new(store.clone(), fetcher.clone());
        let mut rx = scheduler.subscribe();

        scheduler.arm("w1").await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(store.read().await.get("w1").unwrap().is_loading);

        store.write().await.remove("w1");
        scheduler.cancel("w1").await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(store.read().await.is_empty());
        assert!(scheduler.runtime("w1").await.is_none());
        assert!(!scheduler.is_armed("w1").await);
        assert_eq!(fetcher.calls(), 1);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RefreshEvent::Fetching { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_stops_when_widget_leaves_store() {
        let store = shared_store(5);
        let fetcher = ScriptedFetcher::new(vec![]);
        let scheduler = RefreshScheduler::new(store.clone(), fetcher.clone());
        let mut rx = scheduler.subscribe();

        scheduler.arm("w1").await;
        next_completion(&mut rx).await;
        store.write().await.remove("w1");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(scheduler.refresh_now("w1").await, RefreshOutcome::Removed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_completion_discarded() {
        let store = shared_store(60);
        let fetcher = ScriptedFetcher::new(vec![
            (Duration::from_secs(10), Ok(json!({"price": 1}))),
            (Duration::from_secs(1), Ok(json!({"price": 2}))),
        ]);
        let scheduler = RefreshScheduler::new(store.clone(), fetcher);

        let slow = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.refresh_now("w1").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let fast = scheduler.refresh_now("w1").await;
        assert_eq!(fast, RefreshOutcome::Updated { sample: Some(2.0) });
        assert!(store.read().await.get("w1").unwrap().is_loading);

        assert_eq!(slow.await.unwrap(), RefreshOutcome::Stale);

        let store = store.read().await;
        let widget = store.get("w1").unwrap();
        assert_eq!(widget.last_data, Some(json!({"price": 2})));
        assert!(!widget.is_loading);

        let runtime = scheduler.runtime("w1").await.unwrap();
        assert_eq!(runtime.history.values(), vec![2.0]);
        assert_eq!(runtime.in_flight(), 0);
        assert_eq!(runtime.phase, RefreshPhase::Updated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_rearms_on_source_change() {
        let store = shared_store(30);
        let fetcher = ScriptedFetcher::new(vec![]);
        let scheduler = RefreshScheduler::new(store.clone(), fetcher.clone());
        let mut rx = scheduler.subscribe();

        scheduler.arm("w1").await;
        next_completion(&mut rx).await;

        // Cosmetic edits keep the running loop
        {
            let mut store = store.write().await;
            let mut config = store.get("w1").unwrap().config.clone();
            config.name = "Bitcoin".into();
            store.update("w1", config).unwrap();
        }
        assert!(!scheduler.reconfigure("w1").await);

        {
            let mut store = store.write().await;
            let mut config = store.get("w1").unwrap().config.clone();
            config.api_url = "https://api.test/two".into();
            store.update("w1", config).unwrap();
        }
        assert!(scheduler.reconfigure("w1").await);
        next_completion(&mut rx).await;

        assert_eq!(
            fetcher.urls(),
            vec!["https://api.test/one", "https://api.test/two"]
        );
        assert_eq!(scheduler.armed_count().await, 1);
        scheduler.shutdown().await;
        assert_eq!(scheduler.armed_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_widget() {
        let store = Arc::new(RwLock::new(WidgetStore::new()));
        let scheduler = RefreshScheduler::new(store, ScriptedFetcher::new(vec![]));

        assert!(!scheduler.arm("nope").await);
        assert_eq!(scheduler.refresh_now("nope").await, RefreshOutcome::Removed);
        assert!(scheduler.runtime("nope").await.is_none());
    }
}
