use rusqlite::Connection;

use crate::context::{Permission, RequestContext};
use crate::db;
use crate::error::PharmacyError;
use crate::models::{ActivePrescription, NewPatientAllergy, PatientAllergy};

use super::types::{AllergyConflict, AllergyVerification, MatchBasis};

/// Decides whether an allergen name matches a prescribed drug.
pub trait AllergenMatcher {
    /// Returns which drug name matched, or `None`.
    fn matches(&self, allergen: &str, prescription: &ActivePrescription) -> Option<MatchBasis>;
}

/// Case-insensitive substring match of the allergen name against the drug's
/// commercial name first, then its active ingredient. Blank allergen names
/// never match.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameContainmentMatcher;

impl AllergenMatcher for NameContainmentMatcher {
    fn matches(&self, allergen: &str, prescription: &ActivePrescription) -> Option<MatchBasis> {
        let needle = allergen.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        if prescription.commercial_name.to_lowercase().contains(&needle) {
            Some(MatchBasis::CommercialName)
        } else if prescription.active_ingredient.to_lowercase().contains(&needle) {
            Some(MatchBasis::ActiveIngredient)
        } else {
            None
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct AllergyConflictDetector<M = NameContainmentMatcher> {
    matcher: M,
}

impl<M: AllergenMatcher> AllergyConflictDetector<M> {
    pub fn new(matcher: M) -> Self {
        Self { matcher }
    }

    /// One conflict per (prescription item, allergy) pair that matches,
    /// ordered by prescription then allergy as given.
    pub fn detect(
        &self,
        allergies: &[PatientAllergy],
        prescriptions: &[ActivePrescription],
    ) -> Vec<AllergyConflict> {
        let mut conflicts = Vec::new();
        for prescription in prescriptions {
            for allergy in allergies {
                if let Some(matched_on) = self.matcher.matches(&allergy.allergen_name, prescription)
                {
                    conflicts.push(AllergyConflict {
                        prescription: prescription.clone(),
                        allergy: allergy.clone(),
                        matched_on,
                    });
                }
            }
        }
        conflicts
    }
}

/// Cross-check a patient's registered allergies against their active prescriptions.
pub fn verify_allergies(
    conn: &Connection,
    patient_id: i64,
) -> Result<AllergyVerification, PharmacyError> {
    let patient = db::get_patient(conn, patient_id)?
        .ok_or_else(|| PharmacyError::not_found("patient", patient_id))?;

    let allergies = db::get_patient_allergies(conn, patient_id)?;
    let prescriptions = db::get_active_prescriptions(conn, patient_id)?;
    let conflicts = AllergyConflictDetector::<NameContainmentMatcher>::default()
        .detect(&allergies, &prescriptions);

    if !conflicts.is_empty() {
        tracing::warn!(
            patient_id,
            conflicts = conflicts.len(),
            "Allergy conflicts on active prescriptions"
        );
    }

    Ok(AllergyVerification {
        patient,
        allergies,
        prescriptions,
        conflicts,
    })
}

/// Register an allergy for a patient and return the stored record.
pub fn add_patient_allergy(
    ctx: &RequestContext,
    patient_id: i64,
    allergy: &NewPatientAllergy,
) -> Result<PatientAllergy, PharmacyError> {
    ctx.authorize(Permission::RecordAllergies)?;
    let conn = &ctx.conn;

    if db::get_patient(conn, patient_id)?.is_none() {
        return Err(PharmacyError::not_found("patient", patient_id));
    }
    if db::get_allergen(conn, allergy.allergen_id)?.is_none() {
        return Err(PharmacyError::not_found("allergen", allergy.allergen_id));
    }

    let id = db::insert_patient_allergy(conn, patient_id, allergy)?;
    tracing::info!(
        patient_id,
        allergy_id = id,
        recorded_by = ctx.user.id,
        "Patient allergy registered"
    );

    db::get_patient_allergies(conn, patient_id)?
        .into_iter()
        .find(|a| a.id == id)
        .ok_or_else(|| PharmacyError::not_found("patient allergy", id))
}
