use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drug {
    pub id: i64,
    pub commercial_name: String,
    pub active_ingredient: String,
    /// ATC classification code, e.g. `J01CA04`.
    pub atc_code: Option<String>,
    pub unit_price: f64,
    /// Cached on-hand total, recomputed from lots after every stock mutation.
    pub actual_inventory: i64,
    pub minimum_stock: i64,
    pub maximum_stock: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDrug {
    pub commercial_name: String,
    pub active_ingredient: String,
    pub atc_code: Option<String>,
    pub unit_price: f64,
    pub minimum_stock: i64,
    pub maximum_stock: i64,
}
