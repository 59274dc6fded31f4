use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::RecallStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recall {
    pub id: i64,
    pub drug_id: i64,
    pub lot_code: String,
    pub reason: String,
    pub status: RecallStatus,
    pub recall_date: NaiveDate,
    pub closed_date: Option<NaiveDate>,
    pub registered_by: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecall {
    pub drug_id: i64,
    pub lot_code: String,
    pub reason: String,
}
