//! Abnormal elimination trend detector.
//!
//! Over the last 3 days: fires when at least two elimination events exist
//! and at least half of them carry abnormality keywords in their notes.
//! Keyword matching is a case-insensitive substring check over free text;
//! the list lives here so a future structured-field migration is a local
//! change.

use super::{Detector, EventWindow};
use crate::models::{AlertCandidate, AlertLevel, CareCategory, TrendType};

const WINDOW_DAYS: i64 = 3;
const MIN_EVENTS: usize = 2;
const KEYWORDS: &[&str] = &["loose", "diarrhea", "blood", "abnormal"];

pub struct AbnormalEliminationDetector;

impl Detector for AbnormalEliminationDetector {
    fn trend_type(&self) -> TrendType {
        TrendType::AbnormalElimination
    }

    fn evaluate(&self, window: &EventWindow) -> Option<AlertCandidate> {
        let events = window.category_events_since(CareCategory::Elimination, WINDOW_DAYS);
        if events.len() < MIN_EVENTS {
            return None;
        }

        let flagged = events
            .iter()
            .filter(|e| e.notes_contain_any(KEYWORDS))
            .count();
        // At least 50% of the window's events flagged.
        if flagged * 2 < events.len() {
            return None;
        }

        Some(AlertCandidate {
            trend_type: TrendType::AbnormalElimination,
            title: "Abnormal elimination".into(),
            description: format!(
                "{flagged} of {} elimination events in the last {WINDOW_DAYS} days flagged abnormal",
                events.len()
            ),
            level: AlertLevel::Warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CareEvent;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn window(entries: &[(i64, Option<&str>)]) -> EventWindow {
        let subject_id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let events = entries
            .iter()
            .map(|(hours_ago, notes)| {
                let ts = now - Duration::hours(*hours_ago);
                CareEvent {
                    id: Uuid::new_v4(),
                    subject_id,
                    category: CareCategory::Elimination,
                    task_name: "Potty break".into(),
                    timestamp: ts,
                    notes: notes.map(|n| n.into()),
                    created_by: "staff".into(),
                    created_at: ts,
                }
            })
            .collect();
        EventWindow {
            subject_id,
            now,
            lookback_days: 14,
            events,
            indicators: vec![],
        }
    }

    #[test]
    fn fires_when_half_are_flagged() {
        let detector = AbnormalEliminationDetector;
        let candidate = detector
            .evaluate(&window(&[
                (4, Some("Very loose stool")),
                (10, Some("normal")),
                (20, Some("some blood present")),
                (30, None),
            ]))
            .unwrap();
        assert_eq!(candidate.trend_type, TrendType::AbnormalElimination);
        assert!(candidate.description.contains("2 of 4"));
    }

    #[test]
    fn does_not_fire_below_half() {
        let detector = AbnormalEliminationDetector;
        assert!(detector
            .evaluate(&window(&[
                (4, Some("Diarrhea")),
                (10, None),
                (20, None),
            ]))
            .is_none());
    }

    #[test]
    fn needs_at_least_two_events() {
        let detector = AbnormalEliminationDetector;
        assert!(detector.evaluate(&window(&[(4, Some("diarrhea"))])).is_none());
    }

    #[test]
    fn events_older_than_three_days_are_ignored() {
        let detector = AbnormalEliminationDetector;
        assert!(detector
            .evaluate(&window(&[
                (100, Some("loose")),
                (110, Some("loose")),
            ]))
            .is_none());
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let detector = AbnormalEliminationDetector;
        assert!(detector
            .evaluate(&window(&[
                (4, Some("LOOSE again")),
                (10, Some("Abnormal color")),
            ]))
            .is_some());
    }
}
