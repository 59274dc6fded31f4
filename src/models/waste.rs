use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::WasteReason;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteEntry {
    pub id: i64,
    pub lot_id: i64,
    pub drug_id: i64,
    pub quantity: i64,
    pub reason: WasteReason,
    pub recorded_by: i64,
    pub recorded_at: NaiveDateTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWaste {
    pub lot_id: i64,
    pub quantity: i64,
    pub reason: WasteReason,
    pub notes: Option<String>,
}
