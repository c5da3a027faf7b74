//! Health trend detection engine.
//!
//! Pulls a lookback window (care-event log + indicator readings) for one
//! subject, runs a set of independent [`Detector`]s over it, and returns
//! the generated candidates alongside the persisted unresolved alerts.
//! The two lists are deliberately not merged; callers reconcile via
//! [`TrendReport::is_candidate_open`] before offering "create alert".
//!
//! Detectors are pure and order-insensitive; a detector with insufficient
//! data evaluates to "not firing" rather than erroring.

pub mod elimination;
pub mod indicators;
pub mod meals;
pub mod weight;

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CareConfig;
use crate::models::{AlertCandidate, CareCategory, CareEvent, HealthAlert, IndicatorRecord};
use crate::store::{DateRange, EventFilter, EventOrder, EventStore, StoreError};

// ─── Window ──────────────────────────────────────────────────────────────────

/// The fetched lookback window one evaluation runs over.
pub struct EventWindow {
    pub subject_id: Uuid,
    /// Evaluation instant; the "last N days" sub-windows end here.
    pub now: NaiveDateTime,
    pub lookback_days: i64,
    pub events: Vec<CareEvent>,
    pub indicators: Vec<IndicatorRecord>,
}

impl EventWindow {
    /// Events of one category within the trailing `days` days, sorted
    /// oldest first. Detectors narrow the fetched window through this.
    pub fn category_events_since(&self, category: CareCategory, days: i64) -> Vec<&CareEvent> {
        let range = DateRange::last_days(self.now, days);
        let mut events: Vec<&CareEvent> = self
            .events
            .iter()
            .filter(|e| e.category == category && range.contains(e.timestamp))
            .collect();
        events.sort_by_key(|e| e.timestamp);
        events
    }
}

// ─── Detector seam ───────────────────────────────────────────────────────────

/// One per trend condition. Self-contained, independently testable.
pub trait Detector: Send + Sync {
    fn trend_type(&self) -> crate::models::TrendType;

    /// `Some(candidate)` when the condition holds over the window.
    fn evaluate(&self, window: &EventWindow) -> Option<AlertCandidate>;
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// Evaluation result: ephemeral candidates plus persisted unresolved
/// alerts, presented side by side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub generated: Vec<AlertCandidate>,
    pub existing: Vec<HealthAlert>,
}

impl TrendReport {
    /// Whether `candidate` has no matching unresolved persisted alert of
    /// the same type, meaning "create alert" should be offered for it.
    pub fn is_candidate_open(&self, candidate: &AlertCandidate) -> bool {
        !self
            .existing
            .iter()
            .any(|a| !a.resolved && a.alert_type == candidate.trend_type)
    }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Rule-based health trend engine for one kennel.
pub struct TrendEngine {
    store: Arc<dyn EventStore>,
    detectors: Vec<Box<dyn Detector>>,
    default_lookback_days: i64,
}

impl TrendEngine {
    pub fn new(store: Arc<dyn EventStore>, config: &CareConfig) -> Self {
        Self {
            store,
            detectors: vec![
                Box::new(indicators::AbnormalIndicatorsDetector),
                Box::new(weight::WeightLossDetector::new(config.weight_drop_ratio)),
                Box::new(elimination::AbnormalEliminationDetector),
                Box::new(meals::MissedMealsDetector),
            ],
            default_lookback_days: config.default_lookback_days,
        }
    }

    /// Fetch the lookback window and run every detector. Store failures
    /// propagate as a rejected evaluation; detectors themselves never
    /// fail.
    pub async fn evaluate(
        &self,
        subject_id: Uuid,
        lookback_days: Option<i64>,
    ) -> Result<TrendReport, StoreError> {
        let lookback_days = lookback_days.unwrap_or(self.default_lookback_days);
        let now = Utc::now().naive_utc();
        let range = DateRange::last_days(now, lookback_days);

        let filter = EventFilter {
            subject_id: Some(subject_id),
            category: None,
            date_range: Some(range),
        };
        let events = self.store.query(&filter, EventOrder::NewestFirst).await?;
        let indicators = self.store.query_indicators(subject_id, &range).await?;
        let existing = self.store.query_alerts(subject_id, false).await?;

        let window = EventWindow {
            subject_id,
            now,
            lookback_days,
            events,
            indicators,
        };

        let generated: Vec<AlertCandidate> = self
            .detectors
            .iter()
            .filter_map(|d| d.evaluate(&window))
            .collect();

        tracing::debug!(
            subject_id = %subject_id,
            lookback_days,
            generated = generated.len(),
            existing = existing.len(),
            "Trend evaluation complete"
        );

        Ok(TrendReport {
            generated,
            existing,
        })
    }

    /// Mark a persisted alert resolved. A deliberate user action; the
    /// engine never resolves automatically when a condition clears.
    pub async fn resolve_alert(&self, alert_id: Uuid) -> Result<HealthAlert, StoreError> {
        self.store.resolve_alert(alert_id).await
    }

    /// Persist a candidate as a new unresolved alert.
    pub async fn create_alert(
        &self,
        subject_id: Uuid,
        candidate: AlertCandidate,
    ) -> Result<HealthAlert, StoreError> {
        self.store.insert_alert(candidate.into_new(subject_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertLevel, NewHealthAlert, TrendType};
    use crate::store::MemoryEventStore;
    use chrono::Duration;

    fn seed_event(
        store: &MemoryEventStore,
        subject_id: Uuid,
        category: CareCategory,
        task_name: &str,
        notes: Option<&str>,
        hours_ago: i64,
    ) {
        let ts = Utc::now().naive_utc() - Duration::hours(hours_ago);
        store.seed_event(CareEvent {
            id: Uuid::new_v4(),
            subject_id,
            category,
            task_name: task_name.into(),
            timestamp: ts,
            notes: notes.map(|n| n.into()),
            created_by: "staff".into(),
            created_at: ts,
        });
    }

    fn engine(store: Arc<MemoryEventStore>) -> TrendEngine {
        TrendEngine::new(store, &CareConfig::default())
    }

    #[tokio::test]
    async fn empty_window_generates_nothing() {
        let store = Arc::new(MemoryEventStore::new());
        let report = engine(Arc::clone(&store))
            .evaluate(Uuid::new_v4(), None)
            .await
            .unwrap();
        assert!(report.generated.is_empty());
        assert!(report.existing.is_empty());
    }

    #[tokio::test]
    async fn weight_drop_over_five_percent_fires() {
        let store = Arc::new(MemoryEventStore::new());
        let subject = Uuid::new_v4();
        // Readings oldest -> newest: 100, 100, 94. 94 < 100 * 0.95.
        seed_event(&store, subject, CareCategory::Weight, "100", None, 72);
        seed_event(&store, subject, CareCategory::Weight, "100", None, 48);
        seed_event(&store, subject, CareCategory::Weight, "94", None, 2);

        let report = engine(Arc::clone(&store)).evaluate(subject, None).await.unwrap();
        assert!(report
            .generated
            .iter()
            .any(|c| c.trend_type == TrendType::WeightLoss));
    }

    #[tokio::test]
    async fn weight_drop_under_five_percent_does_not_fire() {
        let store = Arc::new(MemoryEventStore::new());
        let subject = Uuid::new_v4();
        seed_event(&store, subject, CareCategory::Weight, "100", None, 72);
        seed_event(&store, subject, CareCategory::Weight, "100", None, 48);
        seed_event(&store, subject, CareCategory::Weight, "96", None, 2);

        let report = engine(Arc::clone(&store)).evaluate(subject, None).await.unwrap();
        assert!(!report
            .generated
            .iter()
            .any(|c| c.trend_type == TrendType::WeightLoss));
    }

    #[tokio::test]
    async fn two_refused_meals_fire_one_does_not() {
        let store = Arc::new(MemoryEventStore::new());
        let subject = Uuid::new_v4();
        seed_event(
            &store,
            subject,
            CareCategory::Feeding,
            "Breakfast",
            Some("Refused the whole bowl"),
            20,
        );

        let report = engine(Arc::clone(&store)).evaluate(subject, None).await.unwrap();
        assert!(!report
            .generated
            .iter()
            .any(|c| c.trend_type == TrendType::MissedMeals));

        seed_event(
            &store,
            subject,
            CareCategory::Feeding,
            "Dinner",
            Some("refused again"),
            4,
        );
        let report = engine(Arc::clone(&store)).evaluate(subject, None).await.unwrap();
        assert!(report
            .generated
            .iter()
            .any(|c| c.trend_type == TrendType::MissedMeals));
    }

    #[tokio::test]
    async fn candidates_and_persisted_alerts_are_not_merged() {
        let store = Arc::new(MemoryEventStore::new());
        let subject = Uuid::new_v4();
        seed_event(&store, subject, CareCategory::Weight, "100", None, 48);
        seed_event(&store, subject, CareCategory::Weight, "90", None, 2);

        store
            .insert_alert(NewHealthAlert {
                subject_id: subject,
                alert_type: TrendType::WeightLoss,
                description: "Weight loss: dropped earlier".into(),
                level: AlertLevel::Warning,
            })
            .await
            .unwrap();

        let report = engine(Arc::clone(&store)).evaluate(subject, None).await.unwrap();
        // Both lists carry the weight-loss condition; dedup is the
        // caller's job via is_candidate_open.
        let candidate = report
            .generated
            .iter()
            .find(|c| c.trend_type == TrendType::WeightLoss)
            .unwrap();
        assert_eq!(report.existing.len(), 1);
        assert!(!report.is_candidate_open(candidate));
    }

    #[tokio::test]
    async fn resolved_alert_reopens_the_candidate() {
        let store = Arc::new(MemoryEventStore::new());
        let subject = Uuid::new_v4();
        seed_event(&store, subject, CareCategory::Weight, "100", None, 48);
        seed_event(&store, subject, CareCategory::Weight, "90", None, 2);

        let engine = engine(Arc::clone(&store));
        let report = engine.evaluate(subject, None).await.unwrap();
        let candidate = report.generated[0].clone();
        assert!(report.is_candidate_open(&candidate));

        let alert = engine.create_alert(subject, candidate.clone()).await.unwrap();
        let report = engine.evaluate(subject, None).await.unwrap();
        assert!(!report.is_candidate_open(&candidate));

        // Resolving clears it from the unresolved list; the condition
        // still holds, so the candidate is offered again.
        engine.resolve_alert(alert.id).await.unwrap();
        let report = engine.evaluate(subject, None).await.unwrap();
        assert!(report.existing.is_empty());
        assert!(report.is_candidate_open(&candidate));
    }

    #[tokio::test]
    async fn store_failure_rejects_the_evaluation() {
        let store = Arc::new(MemoryEventStore::new());
        store.set_fail_queries(true);
        let result = engine(Arc::clone(&store)).evaluate(Uuid::new_v4(), None).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn caller_lookback_narrows_the_window() {
        let store = Arc::new(MemoryEventStore::new());
        let subject = Uuid::new_v4();
        // Abnormal indicator 5 days ago: inside the default window,
        // outside a 2-day one.
        store.seed_indicator(IndicatorRecord {
            id: Uuid::new_v4(),
            subject_id: subject,
            name: "temperature".into(),
            value: "103.8F".into(),
            abnormal: true,
            recorded_at: Utc::now().naive_utc() - Duration::days(5),
        });

        let engine = engine(Arc::clone(&store));
        let wide = engine.evaluate(subject, None).await.unwrap();
        assert!(wide
            .generated
            .iter()
            .any(|c| c.trend_type == TrendType::AbnormalIndicators));

        let narrow = engine.evaluate(subject, Some(2)).await.unwrap();
        assert!(narrow.generated.is_empty());
    }
}
