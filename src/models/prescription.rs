use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::PrescriptionStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    pub prescriber_id: i64,
    pub prescribed_date: NaiveDate,
    pub status: PrescriptionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub id: i64,
    pub prescription_id: i64,
    pub drug_id: i64,
    pub dose: String,
    pub frequency: String,
    pub duration_days: Option<i64>,
}

/// Where a prescription item stands. Derived from the dispensing and
/// administration rows that exist for it, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Prescribed,
    Dispensed,
    Administered,
}

impl ItemState {
    pub fn from_records(dispensing_count: i64, administration_count: i64) -> Self {
        if administration_count > 0 {
            Self::Administered
        } else if dispensing_count > 0 {
            Self::Dispensed
        } else {
            Self::Prescribed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispensing {
    pub id: i64,
    pub item_id: i64,
    pub quantity: i64,
    pub pharmacist_id: i64,
    pub storage_id: Option<i64>,
    pub dispensed_at: NaiveDateTime,
}

/// A distinct drug a patient was prescribed within a lookup window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescribedDrug {
    pub drug_id: i64,
    pub commercial_name: String,
    pub active_ingredient: String,
}

/// An item of one of the patient's active prescriptions, with its drug names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePrescription {
    pub prescription_id: i64,
    pub item_id: i64,
    pub drug_id: i64,
    pub commercial_name: String,
    pub active_ingredient: String,
    pub dose: String,
    pub frequency: String,
    pub prescribed_date: NaiveDate,
}
