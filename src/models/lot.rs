use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: i64,
    pub drug_id: i64,
    pub lot_code: String,
    pub expiration_date: NaiveDate,
    pub quantity: i64,
    pub storage_id: Option<i64>,
    pub received_date: NaiveDate,
}

/// A lot together with its recall state, as seen by stock views and the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotStock {
    #[serde(flatten)]
    pub lot: Lot,
    /// At least one active recall references this lot code.
    pub recalled: bool,
}

impl LotStock {
    /// A lot expires at the end of its expiration date.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.lot.expiration_date < today
    }

    /// Eligible for allocation: in stock, not expired, not recalled.
    pub fn is_available(&self, today: NaiveDate) -> bool {
        self.lot.quantity > 0 && !self.recalled && !self.is_expired(today)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLot {
    pub drug_id: i64,
    pub lot_code: String,
    pub expiration_date: NaiveDate,
    pub quantity: i64,
    pub storage_id: Option<i64>,
    pub received_date: NaiveDate,
}
