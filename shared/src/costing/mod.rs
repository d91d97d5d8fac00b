//! Pure costing computations over ledger history
//!
//! Both the stock projection and the FIFO allocator are folds over an
//! ordered slice of transactions. They hold no state of their own, so the
//! same history always produces the same answer.

mod fifo;
mod projection;

pub use fifo::*;
pub use projection::*;
