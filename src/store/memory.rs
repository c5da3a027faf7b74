//! In-memory event store.
//!
//! Backs tests and UI previews. Exposes failure-injection switches so the
//! rollback/dedup paths of the mutation controller can be exercised
//! without a flaky transport, and write counters so tests can assert
//! "exactly one store write".

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use super::{DateRange, EventFilter, EventOrder, EventStore, StoreError};
use crate::models::{
    CareEvent, HealthAlert, IndicatorRecord, NewCareEvent, NewHealthAlert,
};

#[derive(Default)]
struct Inner {
    events: Vec<CareEvent>,
    indicators: Vec<IndicatorRecord>,
    alerts: Vec<HealthAlert>,
    fail_next_insert: bool,
    fail_next_delete: bool,
    fail_queries: bool,
    insert_count: usize,
    delete_count: usize,
}

/// In-memory implementation of [`EventStore`].
#[derive(Default)]
pub struct MemoryEventStore {
    inner: Mutex<Inner>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Insert an event directly, bypassing counters and failure switches.
    /// Test seeding: the caller controls id and timestamps.
    pub fn seed_event(&self, event: CareEvent) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.events.push(event);
        }
    }

    pub fn seed_indicator(&self, record: IndicatorRecord) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.indicators.push(record);
        }
    }

    /// Make the next `insert` fail with [`StoreError::Unavailable`].
    pub fn fail_next_insert(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_next_insert = true;
        }
    }

    /// Make the next `delete` fail with [`StoreError::Unavailable`].
    pub fn fail_next_delete(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_next_delete = true;
        }
    }

    /// Fail every query (aggregator degradation tests).
    pub fn set_fail_queries(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_queries = fail;
        }
    }

    /// Number of `insert` calls that reached the store (including failed).
    pub fn insert_count(&self) -> usize {
        self.inner.lock().map(|i| i.insert_count).unwrap_or(0)
    }

    /// Number of `delete` calls that reached the store (including failed).
    pub fn delete_count(&self) -> usize {
        self.inner.lock().map(|i| i.delete_count).unwrap_or(0)
    }

    pub fn event_count(&self) -> usize {
        self.inner.lock().map(|i| i.events.len()).unwrap_or(0)
    }
}

fn matches(event: &CareEvent, filter: &EventFilter) -> bool {
    if let Some(subject_id) = filter.subject_id {
        if event.subject_id != subject_id {
            return false;
        }
    }
    if let Some(category) = filter.category {
        if event.category != category {
            return false;
        }
    }
    if let Some(range) = filter.date_range {
        if !range.contains(event.timestamp) {
            return false;
        }
    }
    true
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn query(
        &self,
        filter: &EventFilter,
        order: EventOrder,
    ) -> Result<Vec<CareEvent>, StoreError> {
        let inner = self.lock()?;
        if inner.fail_queries {
            return Err(StoreError::Unavailable("injected query failure".into()));
        }
        let mut events: Vec<CareEvent> = inner
            .events
            .iter()
            .filter(|e| matches(e, filter))
            .cloned()
            .collect();
        match order {
            EventOrder::NewestFirst => events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
            EventOrder::OldestFirst => events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        }
        Ok(events)
    }

    async fn latest_per_category(
        &self,
        subject_id: Uuid,
    ) -> Result<Vec<(crate::models::CareCategory, NaiveDateTime)>, StoreError> {
        let inner = self.lock()?;
        if inner.fail_queries {
            return Err(StoreError::Unavailable("injected query failure".into()));
        }
        let mut latest: std::collections::BTreeMap<crate::models::CareCategory, NaiveDateTime> =
            std::collections::BTreeMap::new();
        for event in inner.events.iter().filter(|e| e.subject_id == subject_id) {
            let entry = latest.entry(event.category).or_insert(event.timestamp);
            if event.timestamp > *entry {
                *entry = event.timestamp;
            }
        }
        Ok(latest.into_iter().collect())
    }

    async fn insert(&self, event: NewCareEvent) -> Result<CareEvent, StoreError> {
        let mut inner = self.lock()?;
        inner.insert_count += 1;
        if inner.fail_next_insert {
            inner.fail_next_insert = false;
            return Err(StoreError::Unavailable("injected insert failure".into()));
        }
        let stored = CareEvent {
            id: Uuid::new_v4(),
            subject_id: event.subject_id,
            category: event.category,
            task_name: event.task_name,
            timestamp: event.timestamp,
            notes: event.notes,
            created_by: event.created_by,
            created_at: Utc::now().naive_utc(),
        };
        inner.events.push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, event_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        inner.delete_count += 1;
        if inner.fail_next_delete {
            inner.fail_next_delete = false;
            return Err(StoreError::Unavailable("injected delete failure".into()));
        }
        let before = inner.events.len();
        inner.events.retain(|e| e.id != event_id);
        Ok(inner.events.len() < before)
    }

    async fn query_indicators(
        &self,
        subject_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<IndicatorRecord>, StoreError> {
        let inner = self.lock()?;
        if inner.fail_queries {
            return Err(StoreError::Unavailable("injected query failure".into()));
        }
        Ok(inner
            .indicators
            .iter()
            .filter(|r| r.subject_id == subject_id && range.contains(r.recorded_at))
            .cloned()
            .collect())
    }

    async fn query_alerts(
        &self,
        subject_id: Uuid,
        resolved: bool,
    ) -> Result<Vec<HealthAlert>, StoreError> {
        let inner = self.lock()?;
        if inner.fail_queries {
            return Err(StoreError::Unavailable("injected query failure".into()));
        }
        Ok(inner
            .alerts
            .iter()
            .filter(|a| a.subject_id == subject_id && a.resolved == resolved)
            .cloned()
            .collect())
    }

    async fn insert_alert(&self, alert: NewHealthAlert) -> Result<HealthAlert, StoreError> {
        let mut inner = self.lock()?;
        let stored = HealthAlert {
            id: Uuid::new_v4(),
            subject_id: alert.subject_id,
            alert_type: alert.alert_type,
            description: alert.description,
            level: alert.level,
            resolved: false,
            created_at: Utc::now().naive_utc(),
            resolved_at: None,
        };
        inner.alerts.push(stored.clone());
        Ok(stored)
    }

    async fn resolve_alert(&self, alert_id: Uuid) -> Result<HealthAlert, StoreError> {
        let mut inner = self.lock()?;
        let alert = inner
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| StoreError::NotFound {
                entity_type: "health_alert".into(),
                id: alert_id.to_string(),
            })?;
        if !alert.resolved {
            alert.resolved = true;
            alert.resolved_at = Some(Utc::now().naive_utc());
        }
        Ok(alert.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CareCategory;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn new_event(subject_id: Uuid, category: CareCategory, ts: NaiveDateTime) -> NewCareEvent {
        NewCareEvent {
            subject_id,
            category,
            task_name: "Task".into(),
            timestamp: ts,
            notes: None,
            created_by: "staff".into(),
        }
    }

    #[tokio::test]
    async fn injected_insert_failure_fires_once() {
        let store = MemoryEventStore::new();
        let subject = Uuid::new_v4();
        store.fail_next_insert();

        let first = store.insert(new_event(subject, CareCategory::Feeding, at(10, 8))).await;
        assert!(matches!(first, Err(StoreError::Unavailable(_))));

        let second = store.insert(new_event(subject, CareCategory::Feeding, at(10, 9))).await;
        assert!(second.is_ok());
        assert_eq!(store.insert_count(), 2);
        assert_eq!(store.event_count(), 1);
    }

    #[tokio::test]
    async fn injected_delete_failure_keeps_event() {
        let store = MemoryEventStore::new();
        let subject = Uuid::new_v4();
        let stored = store
            .insert(new_event(subject, CareCategory::Feeding, at(10, 8)))
            .await
            .unwrap();

        store.fail_next_delete();
        assert!(store.delete(stored.id).await.is_err());
        assert_eq!(store.event_count(), 1);

        assert!(store.delete(stored.id).await.unwrap());
        assert_eq!(store.event_count(), 0);
    }

    #[tokio::test]
    async fn latest_per_category_matches_sqlite_semantics() {
        let store = MemoryEventStore::new();
        let subject = Uuid::new_v4();
        store.insert(new_event(subject, CareCategory::Feeding, at(9, 8))).await.unwrap();
        store.insert(new_event(subject, CareCategory::Feeding, at(10, 18))).await.unwrap();
        store.insert(new_event(subject, CareCategory::Weight, at(8, 9))).await.unwrap();

        let latest = store.latest_per_category(subject).await.unwrap();
        assert_eq!(
            latest,
            vec![
                (CareCategory::Feeding, at(10, 18)),
                (CareCategory::Weight, at(8, 9)),
            ]
        );
    }

    #[tokio::test]
    async fn fail_queries_switch_covers_all_reads() {
        let store = MemoryEventStore::new();
        let subject = Uuid::new_v4();
        store.set_fail_queries(true);

        assert!(store.query(&EventFilter::default(), EventOrder::NewestFirst).await.is_err());
        assert!(store.latest_per_category(subject).await.is_err());
        assert!(store
            .query_indicators(subject, &DateRange::last_days(at(10, 12), 3))
            .await
            .is_err());
        assert!(store.query_alerts(subject, false).await.is_err());

        store.set_fail_queries(false);
        assert!(store.query(&EventFilter::default(), EventOrder::NewestFirst).await.is_ok());
    }
}
