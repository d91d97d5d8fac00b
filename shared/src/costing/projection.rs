//! Stock, average cost and sell price derived from ledger history

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::PartTransaction;

/// Derived state for one part, computed purely from its transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockProjection {
    /// Net quantity on hand: sum of signed quantities over every kind
    pub stock: Decimal,
    /// Weighted average purchase cost, `None` when no costed purchases exist
    pub avg_cost: Option<Decimal>,
    /// `avg_cost` with the part's current markup applied; `None` with it
    pub sell_price: Option<Decimal>,
}

/// Fold a part's full transaction history into its derived state.
///
/// The average cost is weighted over Purchase transactions with a unit cost
/// only; no other kind ever moves it. With no qualifying purchases the cost
/// (and therefore the sell price) is undefined rather than zero. The markup
/// is the part's policy at read time, not at purchase time.
pub fn project(transactions: &[PartTransaction], markup_percent: Decimal) -> StockProjection {
    let mut stock = Decimal::ZERO;
    let mut cost_weighted = Decimal::ZERO;
    let mut cost_qty = Decimal::ZERO;

    for txn in transactions {
        stock += txn.qty;
        if txn.is_costed_purchase() {
            let qty = txn.qty.abs();
            // unit_cost is present by is_costed_purchase
            let unit_cost = txn.unit_cost.unwrap_or(Decimal::ZERO);
            cost_weighted += unit_cost * qty;
            cost_qty += qty;
        }
    }

    let avg_cost = if cost_qty > Decimal::ZERO {
        Some(cost_weighted / cost_qty)
    } else {
        None
    };
    let sell_price =
        avg_cost.map(|c| c * (Decimal::ONE + markup_percent / Decimal::ONE_HUNDRED));

    StockProjection {
        stock,
        avg_cost,
        sell_price,
    }
}
