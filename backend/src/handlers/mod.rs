//! HTTP handlers for the Field Service Management Platform

mod advisory;
mod allocation;
mod health;
mod inventory;
mod part;

pub use advisory::*;
pub use allocation::*;
pub use health::*;
pub use inventory::*;
pub use part::*;
