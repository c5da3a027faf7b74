use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

// Declaration order is the stable tie-break for `last_care` (derived Ord).
str_enum!(CareCategory {
    Feeding => "feeding",
    Elimination => "elimination",
    Medication => "medication",
    Grooming => "grooming",
    Exercise => "exercise",
    Wellness => "wellness",
    Training => "training",
    Weight => "weight",
    Observation => "observation",
    Note => "note",
});

impl CareCategory {
    /// All categories, in tie-break order.
    pub const ALL: [CareCategory; 10] = [
        CareCategory::Feeding,
        CareCategory::Elimination,
        CareCategory::Medication,
        CareCategory::Grooming,
        CareCategory::Exercise,
        CareCategory::Wellness,
        CareCategory::Training,
        CareCategory::Weight,
        CareCategory::Observation,
        CareCategory::Note,
    ];
}

str_enum!(TrendType {
    WeightLoss => "weight_loss",
    AbnormalElimination => "abnormal_elimination",
    MissedMeals => "missed_meals",
    AbnormalIndicators => "abnormal_indicators",
});

str_enum!(AlertLevel {
    Warning => "warning",
    Info => "info",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn care_category_round_trip() {
        for category in CareCategory::ALL {
            let s = category.as_str();
            assert_eq!(CareCategory::from_str(s).unwrap(), category);
        }
    }

    #[test]
    fn care_category_all_covers_every_variant() {
        // ALL is the tie-break order; duplicates or gaps would corrupt it.
        let mut seen = std::collections::HashSet::new();
        for category in CareCategory::ALL {
            assert!(seen.insert(category.as_str()));
        }
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn care_category_ordering_is_declaration_order() {
        assert!(CareCategory::Feeding < CareCategory::Elimination);
        assert!(CareCategory::Weight < CareCategory::Note);
        let mut sorted = CareCategory::ALL;
        sorted.sort();
        assert_eq!(sorted, CareCategory::ALL);
    }

    #[test]
    fn trend_type_round_trip() {
        for (variant, s) in [
            (TrendType::WeightLoss, "weight_loss"),
            (TrendType::AbnormalElimination, "abnormal_elimination"),
            (TrendType::MissedMeals, "missed_meals"),
            (TrendType::AbnormalIndicators, "abnormal_indicators"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(TrendType::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn alert_level_round_trip() {
        for (variant, s) in [(AlertLevel::Warning, "warning"), (AlertLevel::Info, "info")] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(AlertLevel::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(CareCategory::from_str("petting").is_err());
        assert!(TrendType::from_str("unknown").is_err());
        assert!(AlertLevel::from_str("").is_err());
    }
}
