//! Repository layer — entity-scoped database operations.
//!
//! One sub-module per table family; all public functions are re-exported here.

mod allergy;
mod drug;
mod interaction;
mod lot;
mod patient;
mod prescription;
mod recall;
mod storage;
mod user;
mod waste;

pub use allergy::*;
pub use drug::*;
pub use interaction::*;
pub use lot::*;
pub use patient::*;
pub use prescription::*;
pub use recall::*;
pub use storage::*;
pub use user::*;
pub use waste::*;

/// Build a `LIKE` pattern matching `term` anywhere, with `%`, `_` and `\`
/// escaped. Queries using it must declare `ESCAPE '\'`.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
