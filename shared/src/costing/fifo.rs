//! FIFO lot walk for costing stock consumption
//!
//! Purchase lots are consumed oldest-first. Quantity already consumed by
//! earlier transactions is subtracted from the front of the lot list before
//! the requested quantity is drawn.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One purchase lot: the quantity and unit cost of a Purchase transaction.
/// Lots must be supplied in ledger order (occurred_at ascending, insertion
/// order as the tie-break).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLot {
    pub transaction_id: Uuid,
    pub qty: Decimal,
    pub unit_cost: Decimal,
}

/// Quantity drawn from a single lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotDraw {
    pub transaction_id: Uuid,
    pub qty: Decimal,
    pub unit_cost: Decimal,
    pub subtotal: Decimal,
}

/// Result of a FIFO cost allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FifoAllocation {
    pub lots: Vec<LotDraw>,
    pub total_cost: Decimal,
    pub weighted_unit_cost: Decimal,
    /// True when lot history ran out and the remainder was priced at the
    /// last lot's unit cost. Callers should warn the user.
    pub extrapolated: bool,
}

/// Errors from the FIFO allocator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CostingError {
    /// No purchase history exists, so no cost can be derived. Whether to
    /// proceed with a default cost is the caller's decision.
    #[error("no purchase history to derive a unit cost from")]
    NoPurchaseHistory,
    #[error("requested quantity must be positive")]
    NonPositiveQuantity,
}

/// Walk purchase lots oldest-first and price `requested` units.
///
/// `already_consumed` is the total absolute quantity of all consuming
/// (negative) transactions for the part; it is clamped against each lot in
/// order to find what each lot still has available. Insufficient physical
/// stock is not an error here: the remainder is priced at the last lot's
/// unit cost and the result is flagged `extrapolated`.
pub fn allocate(
    lots: &[PurchaseLot],
    already_consumed: Decimal,
    requested: Decimal,
) -> Result<FifoAllocation, CostingError> {
    if requested <= Decimal::ZERO {
        return Err(CostingError::NonPositiveQuantity);
    }
    if lots.is_empty() {
        return Err(CostingError::NoPurchaseHistory);
    }

    let mut consumed_left = already_consumed.max(Decimal::ZERO);
    let mut remaining = requested;
    let mut draws: Vec<LotDraw> = Vec::new();

    for lot in lots {
        let eaten = consumed_left.min(lot.qty.max(Decimal::ZERO));
        consumed_left -= eaten;
        let available = lot.qty - eaten;
        if available <= Decimal::ZERO {
            continue;
        }

        let take = available.min(remaining);
        if take > Decimal::ZERO {
            draws.push(LotDraw {
                transaction_id: lot.transaction_id,
                qty: take,
                unit_cost: lot.unit_cost,
                subtotal: take * lot.unit_cost,
            });
            remaining -= take;
        }
        if remaining <= Decimal::ZERO {
            break;
        }
    }

    let mut extrapolated = false;
    if remaining > Decimal::ZERO {
        // Lot history exhausted: price the rest at the newest known cost.
        if let Some(last) = lots.last() {
            extrapolated = true;
            match draws.last_mut() {
                Some(draw) if draw.transaction_id == last.transaction_id => {
                    draw.qty += remaining;
                    draw.subtotal = draw.qty * draw.unit_cost;
                }
                _ => draws.push(LotDraw {
                    transaction_id: last.transaction_id,
                    qty: remaining,
                    unit_cost: last.unit_cost,
                    subtotal: remaining * last.unit_cost,
                }),
            }
        }
    }

    let total_cost: Decimal = draws.iter().map(|d| d.subtotal).sum();
    let weighted_unit_cost = total_cost / requested;

    Ok(FifoAllocation {
        lots: draws,
        total_cost,
        weighted_unit_cost,
        extrapolated,
    })
}
