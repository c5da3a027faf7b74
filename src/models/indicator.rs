use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A health indicator reading (temperature, gum color, hydration, ...)
/// recorded during a wellness check, with an abnormal flag set by the
/// person recording it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub name: String,
    pub value: String,
    pub abnormal: bool,
    pub recorded_at: NaiveDateTime,
}
