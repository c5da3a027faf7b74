//! Abnormal indicator count detector.
//!
//! Fires when any indicator reading in the window carries the abnormal
//! flag, summarizing the count in one warning.

use super::{Detector, EventWindow};
use crate::models::{AlertCandidate, AlertLevel, TrendType};

pub struct AbnormalIndicatorsDetector;

impl Detector for AbnormalIndicatorsDetector {
    fn trend_type(&self) -> TrendType {
        TrendType::AbnormalIndicators
    }

    fn evaluate(&self, window: &EventWindow) -> Option<AlertCandidate> {
        let abnormal = window.indicators.iter().filter(|r| r.abnormal).count();
        if abnormal == 0 {
            return None;
        }

        Some(AlertCandidate {
            trend_type: TrendType::AbnormalIndicators,
            title: "Abnormal indicators".into(),
            description: format!(
                "{abnormal} abnormal indicator reading(s) in the last {} days",
                window.lookback_days
            ),
            level: AlertLevel::Warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IndicatorRecord;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn window(abnormal_flags: &[bool]) -> EventWindow {
        let subject_id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let indicators = abnormal_flags
            .iter()
            .enumerate()
            .map(|(i, &abnormal)| IndicatorRecord {
                id: Uuid::new_v4(),
                subject_id,
                name: "temperature".into(),
                value: "103.1F".into(),
                abnormal,
                recorded_at: now - Duration::hours(i as i64),
            })
            .collect();
        EventWindow {
            subject_id,
            now,
            lookback_days: 14,
            events: vec![],
            indicators,
        }
    }

    #[test]
    fn any_abnormal_reading_fires_with_count() {
        let detector = AbnormalIndicatorsDetector;
        let candidate = detector.evaluate(&window(&[true, false, true])).unwrap();
        assert_eq!(candidate.trend_type, TrendType::AbnormalIndicators);
        assert_eq!(candidate.level, AlertLevel::Warning);
        assert!(candidate.description.starts_with('2'));
    }

    #[test]
    fn all_normal_readings_do_not_fire() {
        let detector = AbnormalIndicatorsDetector;
        assert!(detector.evaluate(&window(&[false, false])).is_none());
        assert!(detector.evaluate(&window(&[])).is_none());
    }
}
