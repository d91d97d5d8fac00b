//! Advisory heuristics derived from ledger and job history
//!
//! These produce recommendations, never mutations: the stocking-priority
//! score and the recommended-minimum-stock estimate.

mod min_stock;
mod stocking;

pub use min_stock::*;
pub use stocking::*;
