//! Inventory ledger models
//!
//! Every physical movement of a stocked part is one signed-quantity
//! transaction. Transactions are immutable once written; corrections append
//! a new, oppositely-signed entry rather than mutating history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of ledger transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Stock received from a supplier; carries the unit cost used in
    /// average-cost and FIFO calculations
    Purchase,
    /// Consumed on a job
    Used,
    /// Job-specific purchase that never enters stock
    DirectOrder,
    ReturnToSupplier,
    CustomerReturn,
    DamagedOrLost,
    Transfer,
    Adjustment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Used => "used",
            TransactionKind::DirectOrder => "direct_order",
            TransactionKind::ReturnToSupplier => "return_to_supplier",
            TransactionKind::CustomerReturn => "customer_return",
            TransactionKind::DamagedOrLost => "damaged_or_lost",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Adjustment => "adjustment",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(TransactionKind::Purchase),
            "used" => Some(TransactionKind::Used),
            "direct_order" => Some(TransactionKind::DirectOrder),
            "return_to_supplier" => Some(TransactionKind::ReturnToSupplier),
            "customer_return" => Some(TransactionKind::CustomerReturn),
            "damaged_or_lost" => Some(TransactionKind::DamagedOrLost),
            "transfer" => Some(TransactionKind::Transfer),
            "adjustment" => Some(TransactionKind::Adjustment),
            _ => None,
        }
    }

    /// Purchases must carry a unit cost; it feeds cost averaging and FIFO
    pub fn requires_unit_cost(&self) -> bool {
        matches!(self, TransactionKind::Purchase)
    }

    /// Required sign of the quantity for this kind, if fixed.
    /// `None` means either sign is allowed (adjustments, transfers).
    pub fn required_sign(&self) -> Option<QuantitySign> {
        match self {
            TransactionKind::Purchase | TransactionKind::CustomerReturn => {
                Some(QuantitySign::Positive)
            }
            TransactionKind::Used
            | TransactionKind::ReturnToSupplier
            | TransactionKind::DamagedOrLost => Some(QuantitySign::Negative),
            TransactionKind::DirectOrder
            | TransactionKind::Transfer
            | TransactionKind::Adjustment => None,
        }
    }
}

/// Sign constraint on a transaction quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantitySign {
    Positive,
    Negative,
}

/// A ledger entry: one signed stock movement for one part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartTransaction {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub part_code: String,
    /// Positive = stock added, negative = stock removed
    pub qty: Decimal,
    pub kind: TransactionKind,
    /// Required for Purchase entries, optional elsewhere
    pub unit_cost: Option<Decimal>,
    /// Job that consumed the part, when applicable
    pub job_ref: Option<Uuid>,
    /// Receiving order, when applicable
    pub order_ref: Option<Uuid>,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub note: Option<String>,
    pub actor: String,
    /// Ledger insertion order; tie-break for FIFO lots sharing a timestamp
    pub seq: i64,
}

impl PartTransaction {
    /// True when this entry removes stock
    pub fn is_consumption(&self) -> bool {
        self.qty < Decimal::ZERO
    }

    /// True when this entry participates in average-cost and FIFO lot maths
    pub fn is_costed_purchase(&self) -> bool {
        self.kind == TransactionKind::Purchase && self.unit_cost.is_some()
    }
}
