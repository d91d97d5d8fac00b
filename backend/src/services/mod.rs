//! Business logic services for the Field Service Management Platform

pub mod advisory;
pub mod allocation;
pub mod costing;
pub mod ledger;
pub mod part;
pub mod stock;

pub use advisory::AdvisoryService;
pub use allocation::AllocationService;
pub use costing::CostingService;
pub use ledger::LedgerService;
pub use part::PartService;
pub use stock::StockService;
