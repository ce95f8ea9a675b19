//! Dashboard
//!
//! Ties the widget store, persistence and refresh scheduler together. The
//! saved state is loaded once at startup and written after every mutation;
//! the refresh loops are armed, re-armed and cancelled to follow the store.

use crate::config::Config;
use crate::fetch::{Fetch, FetchError, HttpFetcher};
use crate::json::{flatten, FlattenedField};
use crate::persist::{PersistError, Persistence};
use crate::refresh::{RefreshEvent, RefreshOutcome, RefreshScheduler, SharedStore};
use crate::widget::{
    render_widget, History, StoreError, WidgetConfig, WidgetData, WidgetStore,
    DEFAULT_REFRESH_INTERVAL_SECS, HISTORY_CAPACITY,
};
use futures_util::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

/// Errors surfaced by dashboard operations
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

/// The running dashboard
pub struct Dashboard {
    store: SharedStore,
    persistence: Persistence,
    fetcher: Arc<dyn Fetch>,
    scheduler: Arc<RefreshScheduler>,
    default_interval: u64,
    running: AtomicBool,
}

impl Dashboard {
    /// Load the saved dashboard from `persistence`
    pub fn new(
        persistence: Persistence,
        fetcher: Arc<dyn Fetch>,
        history_capacity: usize,
    ) -> DashboardResult<Self> {
        let store: SharedStore = Arc::new(RwLock::new(persistence.load()?));
        let scheduler = RefreshScheduler::with_history_capacity(
            store.clone(),
            fetcher.clone(),
            history_capacity,
        );

        Ok(Self {
            store,
            persistence,
            fetcher,
            scheduler,
            default_interval: DEFAULT_REFRESH_INTERVAL_SECS,
            running: AtomicBool::new(false),
        })
    }

    /// Open the dashboard described by `config`
    pub fn open(config: &Config) -> DashboardResult<Self> {
        let persistence = Persistence::open(&config.storage)?;
        let fetcher = Arc::new(HttpFetcher::new(config.fetch.to_fetch_config())?);

        let mut dashboard = Self::new(persistence, fetcher, config.refresh.history_capacity)?;
        dashboard.default_interval = config.refresh.default_interval_secs;
        Ok(dashboard)
    }

    /// Start refreshing every widget; widgets added later are armed as they
    /// arrive
    pub async fn start(&self) -> usize {
        self.running.store(true, Ordering::SeqCst);
        let armed = self.scheduler.arm_all().await;
        tracing::info!(widgets = armed, "Dashboard started");
        armed
    }

    /// Stop every refresh loop
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.scheduler.shutdown().await;
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// A new config using the configured default interval
    pub fn new_widget(&self, name: impl Into<String>, api_url: impl Into<String>) -> WidgetConfig {
        WidgetConfig::new(name, api_url).refresh_interval(self.default_interval)
    }

    /// Add a widget and return its id
    pub async fn add_widget(&self, config: WidgetConfig) -> DashboardResult<String> {
        let id = self
            .commit(|store| Ok(store.add(config)?.id.clone()))
            .await?;

        tracing::info!(widget_id = %id, "Widget added");
        if self.is_running() {
            self.scheduler.arm(&id).await;
        }
        Ok(id)
    }

    /// Replace a widget's configuration
    ///
    /// The fetched document is kept; the refresh loop restarts only if the
    /// URL or interval changed.
    pub async fn update_widget(&self, id: &str, config: WidgetConfig) -> DashboardResult<()> {
        self.commit(|store| {
            store.update(id, config)?;
            Ok(())
        })
        .await?;

        tracing::info!(widget_id = %id, "Widget updated");
        self.scheduler.reconfigure(id).await;
        Ok(())
    }

    /// Remove a widget and stop its refresh loop
    pub async fn remove_widget(&self, id: &str) -> DashboardResult<WidgetData> {
        let removed = self
            .commit(|store| {
                store
                    .remove(id)
                    .ok_or_else(|| StoreError::NotFound(id.to_string()).into())
            })
            .await?;

        self.scheduler.cancel(id).await;
        tracing::info!(widget_id = %id, "Widget removed");
        Ok(removed)
    }

    /// Replace the display order with `ids`
    pub async fn reorder(&self, ids: &[&str]) -> DashboardResult<()> {
        self.commit(|store| {
            let widgets = ids
                .iter()
                .map(|id| {
                    store
                        .get(id)
                        .cloned()
                        .ok_or_else(|| StoreError::NotFound(id.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            store.reorder(widgets)?;
            Ok(())
        })
        .await
    }

    /// Move widget `id` to position `to`
    pub async fn move_widget(&self, id: &str, to: usize) -> DashboardResult<()> {
        let from = self
            .commit(|store| {
                let from = store
                    .position(id)
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
                store.move_widget(from, to)?;
                Ok(from)
            })
            .await?;

        tracing::debug!(widget_id = %id, from, to, "Widget moved");
        Ok(())
    }

    /// Apply `change` to a copy of the store and swap it in once saved
    ///
    /// A failed change or a failed save leaves the live store untouched.
    async fn commit<T>(
        &self,
        change: impl FnOnce(&mut WidgetStore) -> DashboardResult<T>,
    ) -> DashboardResult<T> {
        let mut store = self.store.write().await;
        let mut staged = store.clone();
        let result = change(&mut staged)?;
        self.persistence.save(&staged)?;
        *store = staged;
        Ok(result)
    }

    /// Fetch one widget now
    pub async fn refresh(&self, id: &str) -> RefreshOutcome {
        self.scheduler.refresh_now(id).await
    }

    /// Fetch every widget once, concurrently
    pub async fn refresh_all(&self) -> Vec<(String, RefreshOutcome)> {
        let ids: Vec<String> = {
            let store = self.store.read().await;
            store.widgets().iter().map(|w| w.id.clone()).collect()
        };

        let outcomes = join_all(ids.iter().map(|id| self.scheduler.refresh_now(id))).await;
        ids.into_iter().zip(outcomes).collect()
    }

    /// Fetch `url` once and list its leaves, leaving the store untouched
    pub async fn test_api(&self, url: &str) -> DashboardResult<Vec<FlattenedField>> {
        let document = self.fetcher.fetch(url).await?;
        let fields = flatten(&document);
        tracing::debug!(url = %url, fields = fields.len(), "API test fetch");
        Ok(fields)
    }

    /// Widgets in display order
    pub async fn widgets(&self) -> Vec<WidgetData> {
        self.store.read().await.widgets().to_vec()
    }

    pub async fn widget(&self, id: &str) -> Option<WidgetData> {
        self.store.read().await.get(id).cloned()
    }

    /// Text view of one widget, including its latest error and history
    pub async fn render(&self, id: &str) -> Option<String> {
        let widget = self.widget(id).await?;
        Some(self.render_data(&widget).await)
    }

    /// Text view of every widget in display order
    pub async fn render_all(&self) -> Vec<String> {
        let mut views = Vec::new();
        for widget in self.widgets().await {
            views.push(self.render_data(&widget).await);
        }
        views
    }

    async fn render_data(&self, widget: &WidgetData) -> String {
        match self.scheduler.runtime(&widget.id).await {
            Some(runtime) => render_widget(widget, runtime.error.as_deref(), &runtime.history),
            None => render_widget(widget, None, &History::with_capacity(HISTORY_CAPACITY)),
        }
    }

    /// Subscribe to refresh events
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.scheduler.subscribe()
    }

    pub fn scheduler(&self) -> &Arc<RefreshScheduler> {
        &self.scheduler
    }
}
