//! Job part allocation models
//!
//! An allocation is the job-facing record of parts consumed on a job,
//! distinct from the ledger entry that backs it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an allocated part came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationSource {
    /// Drawn from inventory via FIFO; backed by exactly one consuming
    /// ledger transaction
    Stock,
    /// Ordered for this job specifically; never touches inventory
    DirectOrder,
}

impl AllocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationSource::Stock => "stock",
            AllocationSource::DirectOrder => "direct_order",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "stock" => Some(AllocationSource::Stock),
            "direct_order" => Some(AllocationSource::DirectOrder),
            _ => None,
        }
    }
}

/// Parts consumed on a specific job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPartAllocation {
    pub id: Uuid,
    pub job_ref: Uuid,
    pub part_code: String,
    pub qty: Decimal,
    /// Unit cost locked in at allocation time
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    /// Markup applied; may override the part's default
    pub markup_percent: Decimal,
    pub sell_price: Decimal,
    pub source: AllocationSource,
    /// The consuming ledger transaction; present exactly when source = Stock
    pub transaction_ref: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Sell price for a quantity of parts: `unit_cost × qty × (1 + markup/100)`
pub fn sell_price(unit_cost: Decimal, qty: Decimal, markup_percent: Decimal) -> Decimal {
    unit_cost * qty * (Decimal::ONE + markup_percent / Decimal::ONE_HUNDRED)
}

/// Job-level aggregate over all allocations, recomputed from scratch after
/// every mutation (never incremented in place)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPartTotals {
    pub job_ref: Uuid,
    pub parts_cost: Decimal,
    pub parts_total: Decimal,
    pub updated_at: DateTime<Utc>,
}
