//! CareService: the facade page-level code talks to.
//!
//! Owns the injected store plus the cache, toggle controller and trend
//! engine, and wires them together: a successful toggle write pokes the
//! debounced refresh, whose callback drops every cache entry so the next
//! status read recomputes. Reads never block on writes; a read during an
//! in-flight write may return pre-write data, bounded by the TTL and the
//! debounce window.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::cache::{SnapshotCache, TtlCache};
use crate::config::CareConfig;
use crate::models::{AlertCandidate, CareCategory, CareEvent, DailyStatusSnapshot, HealthAlert};
use crate::status::compute_statuses;
use crate::store::{DateRange, EventFilter, EventOrder, EventStore, StoreError};
use crate::toggle::{CellKey, CellMeta, CellPhase, ToggleController, ToggleNotice};
use crate::trends::{TrendEngine, TrendReport};

pub struct CareService {
    store: Arc<dyn EventStore>,
    status_cache: Arc<SnapshotCache>,
    category_cache: Arc<TtlCache<Vec<CareEvent>>>,
    toggles: ToggleController,
    trends: TrendEngine,
    /// The kennel roster the status view covers.
    subjects: Mutex<Vec<Uuid>>,
}

impl CareService {
    /// Build the service and the toggle-notice receiver the page layer
    /// drains for confirmations and error toasts.
    pub fn new(
        store: Arc<dyn EventStore>,
        subjects: Vec<Uuid>,
        config: CareConfig,
    ) -> (Self, UnboundedReceiver<ToggleNotice>) {
        let status_cache = Arc::new(SnapshotCache::new(config.status_ttl));
        let category_cache = Arc::new(TtlCache::new(config.category_ttl));

        // The debounced post-toggle refresh: drop every cached view so
        // the next read recomputes from post-write store state.
        let on_refresh: Arc<dyn Fn() + Send + Sync> = {
            let status_cache = Arc::clone(&status_cache);
            let category_cache = Arc::clone(&category_cache);
            Arc::new(move || {
                status_cache.invalidate_all();
                category_cache.invalidate_all();
                tracing::debug!("Caches invalidated after settled toggles");
            })
        };

        let (toggles, notices) =
            ToggleController::new(Arc::clone(&store), config.debounce_window, on_refresh);
        let trends = TrendEngine::new(Arc::clone(&store), &config);

        let service = Self {
            store,
            status_cache,
            category_cache,
            toggles,
            trends,
            subjects: Mutex::new(subjects),
        };
        (service, notices)
    }

    /// Replace the roster (e.g. litter change). Cached views for the old
    /// roster are dropped.
    pub fn set_subjects(&self, subjects: Vec<Uuid>) {
        if let Ok(mut guard) = self.subjects.lock() {
            *guard = subjects;
        }
        self.invalidate_caches();
    }

    // ── Daily status (read path) ─────────────────────────────

    /// Daily snapshots for the roster, served from the cache when fresh.
    /// `force` bypasses freshness and recomputes.
    pub async fn get_statuses(&self, date: NaiveDate, force: bool) -> Vec<DailyStatusSnapshot> {
        let key = SnapshotCache::date_key(date);
        let subjects = self
            .subjects
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        let store = Arc::clone(&self.store);

        let result: Result<_, std::convert::Infallible> = self
            .status_cache
            .refresh(&key, force, || async move {
                Ok(compute_statuses(store.as_ref(), &subjects, date).await)
            })
            .await;
        match result {
            Ok(snapshots) => snapshots,
            Err(never) => match never {},
        }
    }

    /// The day's events of one category across the roster, behind the
    /// short-TTL cache.
    pub async fn recent_category_events(
        &self,
        category: CareCategory,
        date: NaiveDate,
    ) -> Result<Vec<CareEvent>, StoreError> {
        let key = format!("{}:{}", SnapshotCache::date_key(date), category.as_str());
        let store = Arc::clone(&self.store);
        self.category_cache
            .refresh(&key, false, || async move {
                let filter = EventFilter {
                    subject_id: None,
                    category: Some(category),
                    date_range: Some(DateRange::calendar_day(date)),
                };
                store.query(&filter, EventOrder::NewestFirst).await
            })
            .await
    }

    /// Drop every cached view. View teardown / manual reset path.
    pub fn invalidate_caches(&self) {
        self.status_cache.invalidate_all();
        self.category_cache.invalidate_all();
    }

    // ── Care-sheet toggles (write path) ──────────────────────

    /// Fire-and-forget cell toggle; outcome arrives on the notice
    /// channel, and the debounced refresh invalidates the caches.
    pub fn toggle_cell(&self, key: CellKey, meta: CellMeta) {
        self.toggles.toggle_cell(key, meta);
    }

    pub fn is_cell_active(&self, key: &CellKey) -> bool {
        self.toggles.is_cell_active(key)
    }

    pub fn cell_phase(&self, key: &CellKey) -> CellPhase {
        self.toggles.cell_phase(key)
    }

    /// Rebuild the cell/event-id map from the store. Mount and
    /// missed-realtime-update recovery path.
    pub async fn resync(&self, date: NaiveDate) -> Result<(), StoreError> {
        self.toggles.resync(date).await
    }

    // ── Trend alerts ─────────────────────────────────────────

    pub async fn evaluate_alerts(
        &self,
        subject_id: Uuid,
        lookback_days: Option<i64>,
    ) -> Result<TrendReport, StoreError> {
        self.trends.evaluate(subject_id, lookback_days).await
    }

    pub async fn resolve_alert(&self, alert_id: Uuid) -> Result<HealthAlert, StoreError> {
        self.trends.resolve_alert(alert_id).await
    }

    pub async fn create_alert(
        &self,
        subject_id: Uuid,
        candidate: AlertCandidate,
    ) -> Result<HealthAlert, StoreError> {
        self.trends.create_alert(subject_id, candidate).await
    }
}
