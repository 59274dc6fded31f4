use serde::{Deserialize, Serialize};

use super::enums::StorageKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub id: i64,
    pub name: String,
    pub kind: StorageKind,
    pub capacity: Option<i64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub notes: Option<String>,
}

/// Storage location fields as submitted on create/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageLocationInput {
    pub name: String,
    pub kind: StorageKind,
    pub capacity: Option<i64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub notes: Option<String>,
}
