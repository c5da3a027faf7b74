//! Missed-meals trend detector.
//!
//! Over the last 2 days: fires when at least two feeding events carry
//! appetite-problem keywords in their notes. Threshold is on the flagged
//! count, not the total.

use super::{Detector, EventWindow};
use crate::models::{AlertCandidate, AlertLevel, CareCategory, TrendType};

const WINDOW_DAYS: i64 = 2;
const MIN_FLAGGED: usize = 2;
const KEYWORDS: &[&str] = &["refused", "did not eat", "partial", "low appetite"];

pub struct MissedMealsDetector;

impl Detector for MissedMealsDetector {
    fn trend_type(&self) -> TrendType {
        TrendType::MissedMeals
    }

    fn evaluate(&self, window: &EventWindow) -> Option<AlertCandidate> {
        let flagged = window
            .category_events_since(CareCategory::Feeding, WINDOW_DAYS)
            .iter()
            .filter(|e| e.notes_contain_any(KEYWORDS))
            .count();
        if flagged < MIN_FLAGGED {
            return None;
        }

        Some(AlertCandidate {
            trend_type: TrendType::MissedMeals,
            title: "Missed meals".into(),
            description: format!(
                "{flagged} feedings with appetite problems in the last {WINDOW_DAYS} days"
            ),
            level: AlertLevel::Warning,
        })
    }
}
