use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::care_event::CareEvent;
use super::enums::CareCategory;

/// Per-category slice of a daily snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryStatus {
    /// Most recent event of this category, possibly before the day.
    pub last_timestamp: Option<NaiveDateTime>,
    /// The day's events for this category, newest first.
    pub todays_events: Vec<CareEvent>,
}

/// The single most recent care action across all categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCare {
    pub category: CareCategory,
    pub timestamp: NaiveDateTime,
}

/// Derived, read-only daily status for one animal.
///
/// Recomputed from raw events on every aggregation pass; never mutated
/// directly. A subject with no events at all is still a valid snapshot
/// (`last_care: None`, every `todays_events` empty).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStatusSnapshot {
    pub subject_id: Uuid,
    /// Every category is present, even when empty. BTreeMap keeps the
    /// categories in their stable tie-break order.
    pub categories: BTreeMap<CareCategory, CategoryStatus>,
    pub last_care: Option<LastCare>,
}

impl DailyStatusSnapshot {
    /// An empty-but-valid snapshot: the degraded form used when a fetch
    /// for this subject fails, and the base every aggregation starts from.
    pub fn empty(subject_id: Uuid) -> Self {
        let categories = CareCategory::ALL
            .into_iter()
            .map(|c| (c, CategoryStatus::default()))
            .collect();
        Self {
            subject_id,
            categories,
            last_care: None,
        }
    }

    pub fn category(&self, category: CareCategory) -> &CategoryStatus {
        // `empty()` seeds every category, so the key always exists.
        &self.categories[&category]
    }

    /// Whether anything has ever been recorded for this subject.
    pub fn has_data(&self) -> bool {
        self.last_care.is_some()
            || self.categories.values().any(|c| !c.todays_events.is_empty())
    }

    /// Recompute `last_care` from the per-category last timestamps.
    ///
    /// The maximum wins; ties go to the earliest category in declaration
    /// order (deterministic, arbitrary but stable).
    pub fn recompute_last_care(&mut self) {
        let mut best: Option<LastCare> = None;
        for (&category, status) in &self.categories {
            let Some(ts) = status.last_timestamp else {
                continue;
            };
            // Strict `>` keeps the first (lowest) category on ties.
            if best.map(|b| ts > b.timestamp).unwrap_or(true) {
                best = Some(LastCare {
                    category,
                    timestamp: ts,
                });
            }
        }
        self.last_care = best;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn empty_snapshot_has_all_categories() {
        let snap = DailyStatusSnapshot::empty(Uuid::new_v4());
        assert_eq!(snap.categories.len(), CareCategory::ALL.len());
        assert!(snap.last_care.is_none());
        assert!(!snap.has_data());
        for category in CareCategory::ALL {
            assert!(snap.category(category).todays_events.is_empty());
            assert!(snap.category(category).last_timestamp.is_none());
        }
    }

    #[test]
    fn last_care_takes_maximum_timestamp() {
        let mut snap = DailyStatusSnapshot::empty(Uuid::new_v4());
        snap.categories.get_mut(&CareCategory::Feeding).unwrap().last_timestamp = Some(at(8));
        snap.categories.get_mut(&CareCategory::Exercise).unwrap().last_timestamp = Some(at(15));
        snap.recompute_last_care();

        let last = snap.last_care.unwrap();
        assert_eq!(last.category, CareCategory::Exercise);
        assert_eq!(last.timestamp, at(15));
        assert!(snap.has_data());
    }

    #[test]
    fn last_care_tie_breaks_by_category_order() {
        let mut snap = DailyStatusSnapshot::empty(Uuid::new_v4());
        // Weight comes after Elimination in declaration order.
        snap.categories.get_mut(&CareCategory::Weight).unwrap().last_timestamp = Some(at(9));
        snap.categories.get_mut(&CareCategory::Elimination).unwrap().last_timestamp = Some(at(9));
        snap.recompute_last_care();

        assert_eq!(snap.last_care.unwrap().category, CareCategory::Elimination);
    }

    #[test]
    fn last_care_none_without_events() {
        let mut snap = DailyStatusSnapshot::empty(Uuid::new_v4());
        snap.recompute_last_care();
        assert!(snap.last_care.is_none());
    }
}
