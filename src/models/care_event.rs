use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::CareCategory;

/// One recorded care action for one animal.
///
/// Immutable once created; corrections are delete + reinsert. The store
/// assigns `id` and `created_at` on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareEvent {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub category: CareCategory,
    /// What was done, e.g. "Breakfast", "Nail trim". Weight checks record
    /// the reading as the leading number here (e.g. "14.2 lb").
    pub task_name: String,
    pub timestamp: NaiveDateTime,
    /// Free text. Keyword flags ("refused", "loose", ...) are read by the
    /// trend detectors.
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

/// Insert payload for a care event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCareEvent {
    pub subject_id: Uuid,
    pub category: CareCategory,
    pub task_name: String,
    pub timestamp: NaiveDateTime,
    pub notes: Option<String>,
    pub created_by: String,
}

impl CareEvent {
    /// Case-insensitive substring check over the free-text notes.
    pub fn notes_contain_any(&self, keywords: &[&str]) -> bool {
        let Some(notes) = &self.notes else {
            return false;
        };
        let haystack = notes.to_lowercase();
        keywords.iter().any(|kw| haystack.contains(&kw.to_lowercase()))
    }

    /// Parse a numeric reading from the event, for weight checks.
    ///
    /// Takes the leading decimal number of `task_name`, falling back to
    /// the notes. Returns `None` when neither holds a number.
    pub fn numeric_reading(&self) -> Option<f64> {
        leading_number(&self.task_name)
            .or_else(|| self.notes.as_deref().and_then(leading_number))
    }
}

/// Extract the first decimal number appearing in `text`.
fn leading_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}
