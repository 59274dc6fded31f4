//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Identity — resolves `X-User-Id` to an active user
//! 2. Audit logger — logs after identity, has the user id

pub mod audit;
pub mod identity;
