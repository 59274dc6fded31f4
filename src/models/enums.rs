use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The serde form is the stored form.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        $(#[$meta])*
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Administrator => "administrator",
    Pharmacist => "pharmacist",
    Technician => "technician",
    Nurse => "nurse",
});

// Variant order is the severity ranking used for thresholds.
str_enum!(#[derive(PartialOrd, Ord)] InteractionSeverity {
    None => "none",
    Low => "low",
    Moderate => "moderate",
    High => "high",
});

str_enum!(#[derive(PartialOrd, Ord)] AllergySeverity {
    Mild => "Mild",
    Moderate => "Moderate",
    Severe => "Severe",
});

str_enum!(RecallStatus {
    Active => "active",
    Closed => "closed",
});

str_enum!(PrescriptionStatus {
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(StorageKind {
    Ambient => "ambient",
    Refrigerated => "refrigerated",
    Frozen => "frozen",
    Controlled => "controlled",
});

str_enum!(WasteReason {
    Expired => "expired",
    Damaged => "damaged",
    Contaminated => "contaminated",
    Recalled => "recalled",
    Other => "other",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn severity_ranking_follows_variant_order() {
        assert!(InteractionSeverity::High > InteractionSeverity::Moderate);
        assert!(InteractionSeverity::Moderate > InteractionSeverity::Low);
        assert!(InteractionSeverity::Low > InteractionSeverity::None);
        assert!(AllergySeverity::Severe > AllergySeverity::Mild);
    }

    #[test]
    fn allergy_severity_keeps_capitalized_storage_form() {
        assert_eq!(AllergySeverity::Severe.as_str(), "Severe");
        assert_eq!(AllergySeverity::from_str("Mild").unwrap(), AllergySeverity::Mild);
        assert!(AllergySeverity::from_str("mild").is_err());
    }

    #[test]
    fn unknown_value_reports_enum_name() {
        let err = WasteReason::from_str("stolen").unwrap_err();
        match err {
            DatabaseError::InvalidEnum { field, value } => {
                assert_eq!(field, "WasteReason");
                assert_eq!(value, "stolen");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn serializes_as_stored_form() {
        let json = serde_json::to_string(&StorageKind::Refrigerated).unwrap();
        assert_eq!(json, "\"refrigerated\"");
        let json = serde_json::to_string(&InteractionSeverity::High).unwrap();
        assert_eq!(json, "\"high\"");
    }

    #[test]
    fn allergy_severity_json_matches_storage_form() {
        assert_eq!(serde_json::to_string(&AllergySeverity::Severe).unwrap(), "\"Severe\"");
        let parsed: AllergySeverity = serde_json::from_str("\"Moderate\"").unwrap();
        assert_eq!(parsed, AllergySeverity::Moderate);
        assert!(serde_json::from_str::<AllergySeverity>("\"severe\"").is_err());

        use AllergySeverity::*;
        for severity in [Mild, Moderate, Severe] {
            let json = serde_json::to_string(&severity).unwrap();
            assert_eq!(json, format!("\"{}\"", severity.as_str()));
        }
    }
}
