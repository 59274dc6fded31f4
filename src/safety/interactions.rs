use std::collections::{BTreeMap, HashMap};

use chrono::{Months, NaiveDate};
use rusqlite::Connection;

use crate::config::INTERACTION_WINDOW_MONTHS;
use crate::db::{self, DatabaseError};
use crate::error::PharmacyError;
use crate::models::enums::InteractionSeverity;
use crate::models::{InteractionRule, PrescribedDrug};

use super::types::{InteractionConflict, PatientInteractionReport};

/// Where interaction rules are looked up. Implementations must treat the pair
/// as unordered.
pub trait InteractionSource {
    fn find_rule(&self, drug_a_id: i64, drug_b_id: i64)
        -> Result<Option<InteractionRule>, DatabaseError>;
}

impl InteractionSource for Connection {
    fn find_rule(
        &self,
        drug_a_id: i64,
        drug_b_id: i64,
    ) -> Result<Option<InteractionRule>, DatabaseError> {
        db::find_interaction(self, drug_a_id, drug_b_id)
    }
}

/// In-memory rule set keyed by the ordered pair `(min, max)`.
#[derive(Debug, Default, Clone)]
pub struct InteractionTable {
    rules: HashMap<(i64, i64), InteractionRule>,
}

impl InteractionTable {
    pub fn new(rules: impl IntoIterator<Item = InteractionRule>) -> Self {
        let mut table = Self::default();
        for rule in rules {
            table.insert(rule);
        }
        table
    }

    /// The first rule stored for a pair wins, matching the database lookup.
    pub fn insert(&mut self, rule: InteractionRule) {
        self.rules
            .entry(pair_key(rule.drug_a_id, rule.drug_b_id))
            .or_insert(rule);
    }
}

impl InteractionSource for InteractionTable {
    fn find_rule(
        &self,
        drug_a_id: i64,
        drug_b_id: i64,
    ) -> Result<Option<InteractionRule>, DatabaseError> {
        Ok(self.rules.get(&pair_key(drug_a_id, drug_b_id)).cloned())
    }
}

fn pair_key(a: i64, b: i64) -> (i64, i64) {
    (a.min(b), a.max(b))
}

/// Checks every unordered pair of a drug set against an [`InteractionSource`].
#[derive(Debug, Clone, Copy)]
pub struct InteractionChecker {
    min_severity: InteractionSeverity,
}

impl Default for InteractionChecker {
    fn default() -> Self {
        Self::new(InteractionSeverity::Low)
    }
}

impl InteractionChecker {
    /// Report rules at or above `min_severity`. Rules recorded as `none`
    /// are never reported, whatever the threshold.
    pub fn new(min_severity: InteractionSeverity) -> Self {
        Self { min_severity }
    }

    /// Returns the conflicts and the number of pairs examined.
    ///
    /// Drugs are de-duplicated by id and visited in id order, so each pair is
    /// looked up once as `(lower id, higher id)` and no drug is paired with itself.
    pub fn check<S: InteractionSource + ?Sized>(
        &self,
        drugs: &[PrescribedDrug],
        source: &S,
    ) -> Result<(Vec<InteractionConflict>, usize), DatabaseError> {
        let distinct: Vec<&PrescribedDrug> = drugs
            .iter()
            .map(|d| (d.drug_id, d))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect();

        let mut conflicts = Vec::new();
        let mut pairs_checked = 0;

        for (i, first) in distinct.iter().enumerate() {
            for second in &distinct[i + 1..] {
                pairs_checked += 1;
                let Some(rule) = source.find_rule(first.drug_id, second.drug_id)? else {
                    continue;
                };
                if rule.severity == InteractionSeverity::None || rule.severity < self.min_severity
                {
                    continue;
                }
                conflicts.push(InteractionConflict {
                    drug_a_id: first.drug_id,
                    drug_a_name: first.commercial_name.clone(),
                    drug_b_id: second.drug_id,
                    drug_b_name: second.commercial_name.clone(),
                    severity: rule.severity,
                    description: rule.description,
                    recommendation: rule.recommendation,
                });
            }
        }

        Ok((conflicts, pairs_checked))
    }
}

/// Check the drugs a patient was prescribed in the trailing window ending `today`.
pub fn check_patient_interactions(
    conn: &Connection,
    patient_id: i64,
    today: NaiveDate,
    min_severity: InteractionSeverity,
) -> Result<PatientInteractionReport, PharmacyError> {
    let patient = db::get_patient(conn, patient_id)?
        .ok_or_else(|| PharmacyError::not_found("patient", patient_id))?;

    let window_start = today
        .checked_sub_months(Months::new(INTERACTION_WINDOW_MONTHS))
        .unwrap_or(NaiveDate::MIN);
    let drugs = db::get_prescribed_drugs_since(conn, patient_id, window_start)?;

    let (conflicts, pairs_checked) = InteractionChecker::new(min_severity).check(&drugs, conn)?;

    tracing::debug!(
        patient_id,
        drugs = drugs.len(),
        pairs_checked,
        conflicts = conflicts.len(),
        "Interaction check complete"
    );

    Ok(PatientInteractionReport {
        patient,
        window_start,
        drugs,
        pairs_checked,
        conflicts,
    })
}

/// Look up a single pair of drugs by id.
pub fn check_drug_pair(
    conn: &Connection,
    drug_a_id: i64,
    drug_b_id: i64,
) -> Result<Option<InteractionRule>, PharmacyError> {
    if drug_a_id == drug_b_id {
        return Err(PharmacyError::Validation(
            "an interaction check needs two different drugs".into(),
        ));
    }
    for id in [drug_a_id, drug_b_id] {
        if db::get_drug(conn, id)?.is_none() {
            return Err(PharmacyError::not_found("drug", id));
        }
    }
    Ok(db::find_interaction(conn, drug_a_id, drug_b_id)?)
}
