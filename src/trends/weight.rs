//! Weight-loss trend detector.
//!
//! Compares the two most recent weight readings; fires when the latest
//! drops below `drop_ratio` of the previous one (default 0.95, a >=5%
//! drop between consecutive readings). Not a multi-point regression.

use super::{Detector, EventWindow};
use crate::models::{AlertCandidate, AlertLevel, CareCategory, TrendType};

pub struct WeightLossDetector {
    drop_ratio: f64,
}

impl WeightLossDetector {
    pub fn new(drop_ratio: f64) -> Self {
        Self { drop_ratio }
    }
}

impl Detector for WeightLossDetector {
    fn trend_type(&self) -> TrendType {
        TrendType::WeightLoss
    }

    fn evaluate(&self, window: &EventWindow) -> Option<AlertCandidate> {
        let readings: Vec<f64> = window
            .category_events_since(CareCategory::Weight, window.lookback_days)
            .iter()
            .filter_map(|e| e.numeric_reading())
            .collect();

        // Need two readings to compare; fewer means not firing.
        let [.., previous, latest] = readings.as_slice() else {
            return None;
        };
        if *latest >= previous * self.drop_ratio {
            return None;
        }

        let drop_pct = (1.0 - latest / previous) * 100.0;
        Some(AlertCandidate {
            trend_type: TrendType::WeightLoss,
            title: "Weight loss".into(),
            description: format!(
                "Weight dropped {drop_pct:.1}% between the last two readings ({previous} to {latest})"
            ),
            level: AlertLevel::Warning,
        })
    }
}
