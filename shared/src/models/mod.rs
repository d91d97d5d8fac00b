//! Domain models for the Field Service Management Platform

mod allocation;
mod part;
mod transaction;

pub use allocation::*;
pub use part::*;
pub use transaction::*;
