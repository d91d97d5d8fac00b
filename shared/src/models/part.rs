//! Parts catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stocked part in the catalog
///
/// `code` is the part's identity: stored uppercase, immutable after creation.
/// The usage counters (`times_used`, `first_used_at`, `last_used_at`) and the
/// derived stock/cost/price fields are read caches recomputable from the
/// transaction ledger; the ledger is always the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub category: Option<String>,
    pub brand: Option<String>,
    /// Percentage applied to average cost to derive the sell price
    pub markup_percent: Decimal,
    /// System-computed minimum stock level
    pub min_stock: i32,
    /// Explicit override of the computed minimum; requires a reason
    pub min_stock_override: Option<i32>,
    pub min_stock_override_reason: Option<String>,
    pub auto_replenish: bool,
    /// Archived parts keep their ledger history but are hidden from search
    pub archived: bool,
    /// Cached net stock on hand, refreshed from the ledger on every append
    pub stock: Decimal,
    /// Cached weighted average purchase cost; `None` until a costed
    /// purchase exists
    pub avg_cost: Option<Decimal>,
    /// Cached sell price derived from `avg_cost` and the current markup
    pub sell_price: Option<Decimal>,
    pub times_used: i32,
    pub first_used_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Part {
    /// Minimum stock level in effect (override wins over the computed value)
    pub fn effective_min_stock(&self) -> i32 {
        self.min_stock_override.unwrap_or(self.min_stock)
    }
}
