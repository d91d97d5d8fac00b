//! Validation utilities for the Field Service Management Platform
//!
//! Domain rules for the parts catalog and the transaction ledger. These are
//! the synchronous checks applied before anything is written; they never
//! partially apply.

use rust_decimal::Decimal;

use crate::models::{QuantitySign, TransactionKind};

// ============================================================================
// Part Catalog Validations
// ============================================================================

/// Normalize a part code for storage and comparison: trimmed, uppercase
pub fn normalize_part_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Validate a (normalized) part code: 2-32 uppercase alphanumeric or dash
pub fn validate_part_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 {
        return Err("Part code must be at least 2 characters");
    }
    if code.len() > 32 {
        return Err("Part code must be at most 32 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Part code must be uppercase alphanumeric or dash");
    }
    Ok(())
}

/// Validate a markup percentage (0-1000%)
pub fn validate_markup_percent(markup: Decimal) -> Result<(), &'static str> {
    if markup < Decimal::ZERO {
        return Err("Markup percentage cannot be negative");
    }
    if markup > Decimal::from(1000) {
        return Err("Markup percentage out of range");
    }
    Ok(())
}

/// A minimum-stock override must carry a reason
pub fn validate_min_stock_override(
    value: Option<i32>,
    reason: Option<&str>,
) -> Result<(), &'static str> {
    match (value, reason) {
        (Some(v), _) if v < 0 => Err("Minimum stock override cannot be negative"),
        (Some(_), None) => Err("Minimum stock override requires a reason"),
        (Some(_), Some(r)) if r.trim().is_empty() => {
            Err("Minimum stock override requires a reason")
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Ledger Validations
// ============================================================================

/// Validate a ledger transaction's quantity and unit cost against its kind.
/// Violations carry the offending field name alongside the message.
pub fn validate_transaction(
    kind: TransactionKind,
    qty: Decimal,
    unit_cost: Option<Decimal>,
) -> Result<(), (&'static str, &'static str)> {
    if qty == Decimal::ZERO {
        return Err(("qty", "Quantity cannot be zero"));
    }
    match kind.required_sign() {
        Some(QuantitySign::Positive) if qty < Decimal::ZERO => {
            return Err(("qty", "Quantity must be positive for this transaction kind"));
        }
        Some(QuantitySign::Negative) if qty > Decimal::ZERO => {
            return Err(("qty", "Quantity must be negative for this transaction kind"));
        }
        _ => {}
    }
    if kind.requires_unit_cost() {
        match unit_cost {
            None => return Err(("unit_cost", "Unit cost is required for purchase transactions")),
            Some(c) if c <= Decimal::ZERO => {
                return Err(("unit_cost", "Unit cost must be positive"));
            }
            _ => {}
        }
    }
    if let Some(c) = unit_cost {
        if c < Decimal::ZERO {
            return Err(("unit_cost", "Unit cost cannot be negative"));
        }
    }
    Ok(())
}

/// Validate an allocation quantity (must be strictly positive)
pub fn validate_allocation_qty(qty: Decimal) -> Result<(), &'static str> {
    if qty <= Decimal::ZERO {
        return Err("Allocation quantity must be positive");
    }
    Ok(())
}
