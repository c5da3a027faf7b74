//! Optimistic per-cell mutation controller.
//!
//! A cell is a UI-addressable (subject, time-slot) unit on the daily care
//! sheet. Toggling a cell flips its local state immediately, then
//! reconciles against the store asynchronously:
//!
//! - a second toggle on a cell with an in-flight write is dropped, not
//!   queued (prevents duplicate writes from rapid repeated taps);
//! - a failed write rolls the flip back before notifying, so the
//!   displayed state always matches what is believed persisted;
//! - every settled write pokes a shared debounce timer; only the last
//!   poke in a burst fires the downstream refresh callback.
//!
//! Per-cell state machine: `Idle -> Pending -> (Committed | RolledBack)`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::{CareCategory, CareEvent, NewCareEvent};
use crate::store::{DateRange, EventFilter, EventOrder, EventStore, StoreError};

// ─── Public types ────────────────────────────────────────────────────────────

/// Composite id of one toggleable cell on the care sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub subject_id: Uuid,
    /// Slot label, e.g. "Breakfast" or "AM potty". Doubles as the task
    /// name of the event a toggle records.
    pub time_slot: String,
}

impl CellKey {
    pub fn new(subject_id: Uuid, time_slot: impl Into<String>) -> Self {
        Self {
            subject_id,
            time_slot: time_slot.into(),
        }
    }
}

/// Metadata for the event an activating toggle inserts.
#[derive(Debug, Clone)]
pub struct CellMeta {
    pub category: CareCategory,
    pub created_by: String,
    pub notes: Option<String>,
}

/// Lifecycle of a cell's most recent toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellPhase {
    #[default]
    Idle,
    Pending,
    Committed,
    RolledBack,
}

/// Outcome notifications for the page layer. Sends to a closed channel
/// are ignored; in-flight writes are never cancelled, so a late settle
/// after view teardown must be tolerated.
#[derive(Debug, Clone)]
pub enum ToggleNotice {
    Saved { key: CellKey, event_id: Uuid },
    Removed { key: CellKey },
    Failed { key: CellKey, message: String },
}

// ─── Debouncer ───────────────────────────────────────────────────────────────

/// Single shared reset-on-poke timer. Each poke aborts the pending timer
/// task and schedules a new one; only the last poke in a burst fires the
/// callback. The timer is the only cancellable unit in the pipeline.
pub struct Debouncer {
    window: Duration,
    callback: Arc<dyn Fn() + Send + Sync>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration, callback: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self {
            window,
            callback,
            timer: Mutex::new(None),
        }
    }

    /// Reset the timer. Must be called from within a tokio runtime.
    pub fn poke(&self) {
        let Ok(mut timer) = self.timer.lock() else {
            return;
        };
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        let window = self.window;
        let callback = Arc::clone(&self.callback);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            callback();
        }));
    }
}

// ─── Controller ──────────────────────────────────────────────────────────────

/// Local mirror of one cell: the optimistic boolean the UI renders, the
/// cached event id needed for a future delete, and the toggle phase.
#[derive(Debug, Clone, Copy, Default)]
struct CellState {
    active: bool,
    event_id: Option<Uuid>,
    phase: CellPhase,
}

#[derive(Default)]
struct ControllerState {
    cells: HashMap<CellKey, CellState>,
    pending: HashSet<CellKey>,
}

enum WriteOutcome {
    Inserted(Uuid),
    Deleted,
    Failed(String),
}

/// Optimistic toggle controller for the daily care sheet.
///
/// One instance per view. State is process-local and single-writer-per-key;
/// the lock is held only across map operations, never across awaits.
pub struct ToggleController {
    store: Arc<dyn EventStore>,
    state: Arc<Mutex<ControllerState>>,
    debouncer: Arc<Debouncer>,
    notices: mpsc::UnboundedSender<ToggleNotice>,
}

impl ToggleController {
    /// Build a controller and the notice receiver the page layer drains.
    /// `on_refresh` is the debounced downstream refresh (cache
    /// invalidation + re-render trigger).
    pub fn new(
        store: Arc<dyn EventStore>,
        debounce_window: Duration,
        on_refresh: Arc<dyn Fn() + Send + Sync>,
    ) -> (Self, mpsc::UnboundedReceiver<ToggleNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            store,
            state: Arc::new(Mutex::new(ControllerState::default())),
            debouncer: Arc::new(Debouncer::new(debounce_window, on_refresh)),
            notices: tx,
        };
        (controller, rx)
    }

    /// The optimistic boolean the UI renders for `key`.
    pub fn is_cell_active(&self, key: &CellKey) -> bool {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.cells.get(key).map(|c| c.active))
            .unwrap_or(false)
    }

    pub fn cell_phase(&self, key: &CellKey) -> CellPhase {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.cells.get(key).map(|c| c.phase))
            .unwrap_or_default()
    }

    /// Seed a cell's UI state from a status snapshot when the event id is
    /// not yet known. A toggle back to inactive then requires the id
    /// cache to be rebuilt first (`reset_cache`/`resync`).
    pub fn prime_cell(&self, key: CellKey, active: bool) {
        if let Ok(mut state) = self.state.lock() {
            let cell = state.cells.entry(key).or_default();
            cell.active = active;
        }
    }

    /// Rebuild the cell map from a full fetch. The event id for a cell is
    /// only known once the controller has seen the event, so mount/reset
    /// paths feed the day's events through here.
    pub fn reset_cache(&self, events: &[CareEvent]) {
        if let Ok(mut state) = self.state.lock() {
            state.cells.clear();
            for event in events {
                let key = CellKey::new(event.subject_id, event.task_name.clone());
                state.cells.insert(
                    key,
                    CellState {
                        active: true,
                        event_id: Some(event.id),
                        phase: CellPhase::Idle,
                    },
                );
            }
        }
    }

    /// Forced full resync: refetch the day's events and rebuild the cell
    /// map. Recovery path for missed or out-of-order realtime updates.
    pub async fn resync(&self, date: NaiveDate) -> Result<(), StoreError> {
        let filter = EventFilter {
            date_range: Some(DateRange::calendar_day(date)),
            ..Default::default()
        };
        let events = self.store.query(&filter, EventOrder::NewestFirst).await?;
        self.reset_cache(&events);
        tracing::debug!(count = events.len(), "Cell cache resynced");
        Ok(())
    }

    /// Toggle one cell. Fire-and-forget: the local flip happens before
    /// this returns, the store write settles asynchronously.
    pub fn toggle_cell(&self, key: CellKey, meta: CellMeta) {
        let was_active;
        let cached_event_id;
        {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if state.pending.contains(&key) {
                // Conflict/no-op: dropped, not queued.
                tracing::debug!(subject_id = %key.subject_id, slot = %key.time_slot, "Toggle dropped; cell already pending");
                return;
            }

            let cell = state.cells.entry(key.clone()).or_default();
            was_active = cell.active;
            cached_event_id = cell.event_id;

            if was_active && cached_event_id.is_none() {
                // Validation error: nothing to delete by. Rejected before
                // any store call, no flip.
                let _ = self.notices.send(ToggleNotice::Failed {
                    key,
                    message: "no cached event id for active cell; resync required".into(),
                });
                return;
            }

            cell.active = !was_active;
            cell.phase = CellPhase::Pending;
            state.pending.insert(key.clone());
        }

        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let debouncer = Arc::clone(&self.debouncer);
        let notices = self.notices.clone();

        tokio::spawn(async move {
            let outcome = match (was_active, cached_event_id) {
                (true, Some(event_id)) => match store.delete(event_id).await {
                    Ok(true) => WriteOutcome::Deleted,
                    Ok(false) => {
                        WriteOutcome::Failed("event no longer exists; resync required".into())
                    }
                    Err(e) => WriteOutcome::Failed(e.to_string()),
                },
                // Guarded before spawn; kept as a rollback for safety.
                (true, None) => {
                    WriteOutcome::Failed("no cached event id for active cell".into())
                }
                (false, _) => {
                    let new_event = NewCareEvent {
                        subject_id: key.subject_id,
                        category: meta.category,
                        task_name: key.time_slot.clone(),
                        timestamp: Utc::now().naive_utc(),
                        notes: meta.notes,
                        created_by: meta.created_by,
                    };
                    match store.insert(new_event).await {
                        Ok(event) => WriteOutcome::Inserted(event.id),
                        Err(e) => WriteOutcome::Failed(e.to_string()),
                    }
                }
            };

            // Settle: reconcile local state and clear the pending guard
            // in every path before anything else can observe the cell.
            if let Ok(mut state) = state.lock() {
                if let Some(cell) = state.cells.get_mut(&key) {
                    match &outcome {
                        WriteOutcome::Inserted(event_id) => {
                            cell.active = true;
                            cell.event_id = Some(*event_id);
                            cell.phase = CellPhase::Committed;
                        }
                        WriteOutcome::Deleted => {
                            cell.active = false;
                            cell.event_id = None;
                            cell.phase = CellPhase::Committed;
                        }
                        WriteOutcome::Failed(_) => {
                            // Roll the optimistic flip back; keep the
                            // cached id so a retry can still delete.
                            cell.active = was_active;
                            cell.phase = CellPhase::RolledBack;
                        }
                    }
                }
                state.pending.remove(&key);
            }

            let notice = match outcome {
                WriteOutcome::Inserted(event_id) => ToggleNotice::Saved { key, event_id },
                WriteOutcome::Deleted => ToggleNotice::Removed { key },
                WriteOutcome::Failed(message) => {
                    tracing::warn!(error = %message, "Toggle write failed; rolled back");
                    ToggleNotice::Failed { key, message }
                }
            };
            let _ = notices.send(notice);

            debouncer.poke();
        });
    }
}
