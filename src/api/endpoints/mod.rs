//! API endpoint handlers.
//!
//! Each module corresponds to a back-office page. Handlers open a connection
//! per request and delegate to the service modules.

pub mod account;
pub mod alerts;
pub mod dispensation;
pub mod health;
pub mod interactions;
pub mod inventory;
pub mod patients;
pub mod storage;
pub mod waste;
