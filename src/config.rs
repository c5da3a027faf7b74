//! Tunable parameters for the care pipeline.
//!
//! All cache/debounce/detector state lives in structs constructed from a
//! [`CareConfig`]; no module-level singletons. Defaults match the
//! human-paced UI the pipeline serves.

use std::time::Duration;

/// Full-roster status snapshots stay fresh for 5 minutes.
pub const DEFAULT_STATUS_TTL_SECS: u64 = 300;

/// Single-category lookups are cheaper and staler-sensitive: 30 seconds.
pub const DEFAULT_CATEGORY_TTL_SECS: u64 = 30;

/// A burst of cell toggles collapses into one refresh after 1 second.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Trend detectors look back two weeks unless the caller narrows it.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 14;

/// Weight-loss fires when the latest reading drops below 95% of the
/// previous one (a >=5% drop between consecutive readings).
pub const DEFAULT_WEIGHT_DROP_RATIO: f64 = 0.95;

/// Configuration for [`crate::service::CareService`] and its subsystems.
#[derive(Debug, Clone)]
pub struct CareConfig {
    /// TTL for the full-roster daily status cache.
    pub status_ttl: Duration,
    /// TTL for per-category event lookups.
    pub category_ttl: Duration,
    /// Debounce window for the post-toggle refresh.
    pub debounce_window: Duration,
    /// Lookback applied by `evaluate_alerts` when the caller passes none.
    pub default_lookback_days: i64,
    /// Consecutive-reading ratio below which the weight detector fires.
    pub weight_drop_ratio: f64,
}

impl Default for CareConfig {
    fn default() -> Self {
        Self {
            status_ttl: Duration::from_secs(DEFAULT_STATUS_TTL_SECS),
            category_ttl: Duration::from_secs(DEFAULT_CATEGORY_TTL_SECS),
            debounce_window: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            default_lookback_days: DEFAULT_LOOKBACK_DAYS,
            weight_drop_ratio: DEFAULT_WEIGHT_DROP_RATIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = CareConfig::default();
        assert_eq!(cfg.status_ttl, Duration::from_secs(300));
        assert_eq!(cfg.category_ttl, Duration::from_secs(30));
        assert_eq!(cfg.debounce_window, Duration::from_millis(1000));
        assert_eq!(cfg.default_lookback_days, 14);
        assert!((cfg.weight_drop_ratio - 0.95).abs() < f64::EPSILON);
    }
}
