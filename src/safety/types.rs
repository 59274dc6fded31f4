use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::enums::InteractionSeverity;
use crate::models::{ActivePrescription, Patient, PatientAllergy, PrescribedDrug};

// ---------------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------------

/// One interacting pair found among a patient's drugs. `drug_a_id < drug_b_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConflict {
    pub drug_a_id: i64,
    pub drug_a_name: String,
    pub drug_b_id: i64,
    pub drug_b_name: String,
    pub severity: InteractionSeverity,
    pub description: String,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientInteractionReport {
    pub patient: Patient,
    /// Start of the prescription window that was examined.
    pub window_start: NaiveDate,
    pub drugs: Vec<PrescribedDrug>,
    pub pairs_checked: usize,
    pub conflicts: Vec<InteractionConflict>,
}

// ---------------------------------------------------------------------------
// Allergies
// ---------------------------------------------------------------------------

/// Which drug name the allergen was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    CommercialName,
    ActiveIngredient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllergyConflict {
    pub prescription: ActivePrescription,
    pub allergy: PatientAllergy,
    pub matched_on: MatchBasis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllergyVerification {
    pub patient: Patient,
    pub allergies: Vec<PatientAllergy>,
    pub prescriptions: Vec<ActivePrescription>,
    pub conflicts: Vec<AllergyConflict>,
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// Units taken from one lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotDraw {
    pub lot_id: i64,
    pub lot_code: String,
    pub expiration_date: NaiveDate,
    pub quantity: i64,
    /// Lot quantity left after this draw.
    pub remaining: i64,
}

/// How a request will be satisfied, lot by lot, soonest expiration first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub drug_id: i64,
    pub requested: i64,
    pub draws: Vec<LotDraw>,
    /// Storage location of the first lot drawn from.
    pub storage_id: Option<i64>,
}

impl AllocationPlan {
    pub fn total_drawn(&self) -> i64 {
        self.draws.iter().map(|d| d.quantity).sum()
    }
}
