//! Event store seam.
//!
//! The pipeline is transport-agnostic: everything talks to an injected
//! [`EventStore`]. Two implementations ship with the crate: a SQLite
//! store ([`sqlite::SqliteEventStore`]) and an in-memory store with
//! failure injection for tests ([`memory::MemoryEventStore`]).

pub mod memory;
pub mod sqlite;

pub use memory::MemoryEventStore;
pub use sqlite::SqliteEventStore;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CareCategory, CareEvent, HealthAlert, IndicatorRecord, NewCareEvent, NewHealthAlert,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal lock poisoned")]
    LockPoisoned,
}

/// Closed timestamp interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// The whole calendar day: `[00:00:00, 23:59:59.999...]`.
    pub fn calendar_day(date: NaiveDate) -> Self {
        Self {
            start: date.and_hms_opt(0, 0, 0).unwrap_or_default(),
            end: date
                .and_hms_micro_opt(23, 59, 59, 999_999)
                .unwrap_or_default(),
        }
    }

    /// The trailing `days` days ending at `now` (inclusive).
    pub fn last_days(now: NaiveDateTime, days: i64) -> Self {
        Self {
            start: now - chrono::Duration::days(days),
            end: now,
        }
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Query filter over the care-event log. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    pub subject_id: Option<Uuid>,
    pub category: Option<CareCategory>,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrder {
    NewestFirst,
    OldestFirst,
}

/// Append-only query/insert interface over care events, indicator
/// readings and health alerts.
///
/// Events are immutable once created and deletable by id; alerts only
/// ever transition `unresolved -> resolved`.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn query(
        &self,
        filter: &EventFilter,
        order: EventOrder,
    ) -> Result<Vec<CareEvent>, StoreError>;

    /// Latest event timestamp per category for one subject, over the full
    /// history. One indexed lookup per store call, not a scan client-side.
    async fn latest_per_category(
        &self,
        subject_id: Uuid,
    ) -> Result<Vec<(CareCategory, NaiveDateTime)>, StoreError>;

    /// Insert a care event; the store assigns `id` and `created_at`.
    async fn insert(&self, event: NewCareEvent) -> Result<CareEvent, StoreError>;

    /// Delete a care event by id. `Ok(false)` when no such event exists.
    async fn delete(&self, event_id: Uuid) -> Result<bool, StoreError>;

    async fn query_indicators(
        &self,
        subject_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<IndicatorRecord>, StoreError>;

    async fn query_alerts(
        &self,
        subject_id: Uuid,
        resolved: bool,
    ) -> Result<Vec<HealthAlert>, StoreError>;

    async fn insert_alert(&self, alert: NewHealthAlert) -> Result<HealthAlert, StoreError>;

    /// Mark an alert resolved, stamping `resolved_at`. Resolving an
    /// already-resolved alert is a no-op that returns the stored row.
    async fn resolve_alert(&self, alert_id: Uuid) -> Result<HealthAlert, StoreError>;
}
