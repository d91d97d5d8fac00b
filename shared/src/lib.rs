//! Shared types and domain logic for the Field Service Management Platform
//!
//! This crate contains the models and pure computation shared between the
//! backend and other components: the parts catalog and ledger models, the
//! stock/cost projection fold, the FIFO cost allocator, and the stocking
//! advisory heuristics. Nothing in here performs I/O.

pub mod advisory;
pub mod costing;
pub mod models;
pub mod types;
pub mod validation;

pub use advisory::*;
pub use costing::*;
pub use models::*;
pub use types::*;
pub use validation::*;
