//! Daily status aggregation.
//!
//! Computes one [`DailyStatusSnapshot`] per subject for a calendar date:
//! the store's latest event per category (full history) plus the day's
//! events bucketed per category, newest first. Pure with respect to store
//! state: no side effects, recomputed on every pass.
//!
//! Partial-failure policy: a fetch failure for one subject degrades that
//! subject's snapshot to the empty form instead of aborting the batch.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::DailyStatusSnapshot;
use crate::store::{DateRange, EventFilter, EventOrder, EventStore, StoreError};

/// Compute daily snapshots for a set of subjects. Never fails the batch;
/// per-subject failures are logged and degrade to empty snapshots.
pub async fn compute_statuses(
    store: &dyn EventStore,
    subjects: &[Uuid],
    date: NaiveDate,
) -> Vec<DailyStatusSnapshot> {
    let mut snapshots = Vec::with_capacity(subjects.len());
    for &subject_id in subjects {
        match subject_snapshot(store, subject_id, date).await {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                tracing::warn!(subject_id = %subject_id, error = %e, "Status fetch failed; degrading to empty snapshot");
                snapshots.push(DailyStatusSnapshot::empty(subject_id));
            }
        }
    }
    snapshots
}

/// One subject's snapshot: two store calls, no scan.
async fn subject_snapshot(
    store: &dyn EventStore,
    subject_id: Uuid,
    date: NaiveDate,
) -> Result<DailyStatusSnapshot, StoreError> {
    let mut snapshot = DailyStatusSnapshot::empty(subject_id);

    for (category, timestamp) in store.latest_per_category(subject_id).await? {
        if let Some(status) = snapshot.categories.get_mut(&category) {
            status.last_timestamp = Some(timestamp);
        }
    }

    let filter = EventFilter {
        subject_id: Some(subject_id),
        category: None,
        date_range: Some(DateRange::calendar_day(date)),
    };
    // NewestFirst keeps each category bucket in descending order.
    for event in store.query(&filter, EventOrder::NewestFirst).await? {
        if let Some(status) = snapshot.categories.get_mut(&event.category) {
            status.todays_events.push(event);
        }
    }

    snapshot.recompute_last_care();
    Ok(snapshot)
}
