use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    /// Medical record number.
    pub mrn: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
}
