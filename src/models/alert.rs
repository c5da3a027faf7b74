use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AlertLevel, TrendType};

/// A persisted health alert for one animal.
///
/// Transitions only `unresolved -> resolved`; never deleted, never
/// re-opened. A recurring condition gets a new alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthAlert {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub alert_type: TrendType,
    pub description: String,
    pub level: AlertLevel,
    pub resolved: bool,
    pub created_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

/// Insert payload for a health alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHealthAlert {
    pub subject_id: Uuid,
    pub alert_type: TrendType,
    pub description: String,
    pub level: AlertLevel,
}

/// Ephemeral detector output, recomputed every evaluation and never
/// persisted automatically. Becomes a [`HealthAlert`] only through an
/// explicit "create alert" action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub trend_type: TrendType,
    pub title: String,
    pub description: String,
    pub level: AlertLevel,
}

impl AlertCandidate {
    /// Build the insert payload for persisting this candidate.
    pub fn into_new(self, subject_id: Uuid) -> NewHealthAlert {
        NewHealthAlert {
            subject_id,
            alert_type: self.trend_type,
            description: format!("{}: {}", self.title, self.description),
            level: self.level,
        }
    }
}
