use serde::{Deserialize, Serialize};

use super::enums::AllergySeverity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allergen {
    pub id: i64,
    pub name: String,
    pub category: String,
}

/// A patient's registered allergy, joined with its allergen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientAllergy {
    pub id: i64,
    pub patient_id: i64,
    pub allergen_id: i64,
    pub allergen_name: String,
    pub category: String,
    pub severity: AllergySeverity,
    pub reaction: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatientAllergy {
    pub allergen_id: i64,
    pub severity: AllergySeverity,
    pub reaction: Option<String>,
    pub notes: Option<String>,
}
