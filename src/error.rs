//! Service-level error type shared by every pharmacy operation.

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum PharmacyError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(
        "Insufficient stock for drug {drug_id}: requested {requested}, available {available} \
         (short by {shortfall})"
    )]
    InsufficientStock {
        drug_id: i64,
        requested: i64,
        available: i64,
        shortfall: i64,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] DatabaseError),
}

impl PharmacyError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        PharmacyError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn insufficient_stock(drug_id: i64, requested: i64, available: i64) -> Self {
        PharmacyError::InsufficientStock {
            drug_id,
            requested,
            available,
            shortfall: requested - available,
        }
    }
}

impl From<rusqlite::Error> for PharmacyError {
    fn from(e: rusqlite::Error) -> Self {
        PharmacyError::Persistence(DatabaseError::Sqlite(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_names_shortfall() {
        let err = PharmacyError::insufficient_stock(7, 12, 9);
        match &err {
            PharmacyError::InsufficientStock { shortfall, .. } => assert_eq!(*shortfall, 3),
            other => panic!("unexpected: {other}"),
        }
        assert!(err.to_string().contains("short by 3"));
    }

    #[test]
    fn not_found_message() {
        let err = PharmacyError::not_found("patient", 42);
        assert_eq!(err.to_string(), "patient not found: 42");
    }

    #[test]
    fn sqlite_error_is_persistence_failure() {
        let err: PharmacyError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, PharmacyError::Persistence(_)));
    }
}
