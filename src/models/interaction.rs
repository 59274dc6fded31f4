use serde::{Deserialize, Serialize};

use super::enums::InteractionSeverity;

/// A known interaction between two drugs. The pair is unordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRule {
    pub id: i64,
    pub drug_a_id: i64,
    pub drug_b_id: i64,
    pub severity: InteractionSeverity,
    pub description: String,
    pub recommendation: Option<String>,
}

impl InteractionRule {
    pub fn involves(&self, a: i64, b: i64) -> bool {
        (self.drug_a_id == a && self.drug_b_id == b) || (self.drug_a_id == b && self.drug_b_id == a)
    }
}

/// Interaction rule joined with both drugs' names, for lookup screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionListing {
    #[serde(flatten)]
    pub rule: InteractionRule,
    pub drug_a_name: String,
    pub drug_b_name: String,
}
