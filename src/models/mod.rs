pub mod enums;

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
