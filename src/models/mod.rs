pub mod alert;
pub mod care_event;
pub mod enums;
pub mod indicator;
pub mod snapshot;

pub use alert::{AlertCandidate, HealthAlert, NewHealthAlert};
pub use care_event::{CareEvent, NewCareEvent};
pub use enums::{AlertLevel, CareCategory, TrendType};
pub use indicator::IndicatorRecord;
pub use snapshot::{CategoryStatus, DailyStatusSnapshot, LastCare};
