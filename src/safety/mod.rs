//! Medication safety checks.
//!
//! Three pure detectors over already-fetched rows, each with a thin
//! database-facing entry point:
//! - [`interactions`]: drug-drug interactions across a patient's recent drugs
//! - [`allergies`]: prescriptions whose names contain a registered allergen
//! - [`allocation`]: earliest-expiration-first lot depletion for dispensation

pub mod allergies;
pub mod allocation;
pub mod interactions;
pub mod types;

pub use allergies::{
    add_patient_allergy, verify_allergies, AllergenMatcher, AllergyConflictDetector,
    NameContainmentMatcher,
};
pub use allocation::LotAllocator;
pub use interactions::{
    check_drug_pair, check_patient_interactions, InteractionChecker, InteractionSource,
    InteractionTable,
};
pub use types::*;
