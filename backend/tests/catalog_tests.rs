//! Parts catalog and ledger validation tests
//!
//! Tests for the write-path rules:
//! - Part code normalization and format
//! - Markup and minimum-stock-override constraints
//! - Quantity sign and unit-cost rules per transaction kind

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{QuantitySign, TransactionKind};
use shared::validation::{
    normalize_part_code, validate_allocation_qty, validate_markup_percent,
    validate_min_stock_override, validate_part_code, validate_transaction,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Part Code Tests
// ============================================================================

#[cfg(test)]
mod part_code_tests {
    use super::*;

    /// Codes are stored trimmed and uppercase; lookups normalize the same way
    #[test]
    fn test_normalize() {
        assert_eq!(normalize_part_code("  belt-v42 "), "BELT-V42");
        assert_eq!(normalize_part_code("FILTER-01"), "FILTER-01");
    }

    #[test]
    fn test_valid_codes() {
        for code in ["AB", "BELT-V42", "A1-B2-C3", "X-9"] {
            assert!(validate_part_code(code).is_ok(), "rejected {code}");
        }
    }

    #[test]
    fn test_invalid_codes() {
        assert!(validate_part_code("A").is_err());
        assert!(validate_part_code(&"X".repeat(33)).is_err());
        assert!(validate_part_code("belt-v42").is_err());
        assert!(validate_part_code("BELT V42").is_err());
        assert!(validate_part_code("BELT_V42").is_err());
        assert!(validate_part_code("").is_err());
    }

    /// Normalization always produces a code that passes the format check,
    /// for inputs that differ only in case and surrounding whitespace
    #[test]
    fn test_normalize_then_validate() {
        for raw in [" ab ", "Belt-V42", "filter-01  "] {
            assert!(validate_part_code(&normalize_part_code(raw)).is_ok());
        }
    }
}

// ============================================================================
// Pricing Policy Tests
// ============================================================================

#[cfg(test)]
mod pricing_tests {
    use super::*;

    #[test]
    fn test_markup_bounds() {
        assert!(validate_markup_percent(dec("0")).is_ok());
        assert!(validate_markup_percent(dec("20")).is_ok());
        assert!(validate_markup_percent(dec("1000")).is_ok());
        assert!(validate_markup_percent(dec("-1")).is_err());
        assert!(validate_markup_percent(dec("1001")).is_err());
    }

    /// An override without a reason is rejected; clearing the override
    /// needs no reason
    #[test]
    fn test_min_stock_override_requires_reason() {
        assert!(validate_min_stock_override(Some(5), Some("seasonal demand")).is_ok());
        assert!(validate_min_stock_override(Some(5), None).is_err());
        assert!(validate_min_stock_override(Some(5), Some("   ")).is_err());
        assert!(validate_min_stock_override(Some(-1), Some("reason")).is_err());
        assert!(validate_min_stock_override(None, None).is_ok());
        assert!(validate_min_stock_override(None, Some("stale reason")).is_ok());
    }
}

// ============================================================================
// Ledger Rule Tests
// ============================================================================

#[cfg(test)]
mod ledger_rule_tests {
    use super::*;

    const ALL_KINDS: [TransactionKind; 8] = [
        TransactionKind::Purchase,
        TransactionKind::Used,
        TransactionKind::DirectOrder,
        TransactionKind::ReturnToSupplier,
        TransactionKind::CustomerReturn,
        TransactionKind::DamagedOrLost,
        TransactionKind::Transfer,
        TransactionKind::Adjustment,
    ];

    /// Zero quantity is rejected for every kind
    #[test]
    fn test_zero_qty_rejected() {
        for kind in ALL_KINDS {
            assert!(validate_transaction(kind, Decimal::ZERO, Some(dec("1"))).is_err());
        }
    }

    /// Purchases and customer returns add stock; consumption kinds remove it
    #[test]
    fn test_sign_per_kind() {
        assert!(validate_transaction(TransactionKind::Purchase, dec("5"), Some(dec("10"))).is_ok());
        assert!(
            validate_transaction(TransactionKind::Purchase, dec("-5"), Some(dec("10"))).is_err()
        );

        assert!(validate_transaction(TransactionKind::CustomerReturn, dec("1"), None).is_ok());
        assert!(validate_transaction(TransactionKind::CustomerReturn, dec("-1"), None).is_err());

        assert!(validate_transaction(TransactionKind::Used, dec("-3"), None).is_ok());
        assert!(validate_transaction(TransactionKind::Used, dec("3"), None).is_err());

        assert!(validate_transaction(TransactionKind::DamagedOrLost, dec("-1"), None).is_ok());
        assert!(validate_transaction(TransactionKind::ReturnToSupplier, dec("2"), None).is_err());
    }

    /// Adjustments and transfers go either way
    #[test]
    fn test_free_sign_kinds() {
        for kind in [TransactionKind::Adjustment, TransactionKind::Transfer] {
            assert!(validate_transaction(kind, dec("4"), None).is_ok());
            assert!(validate_transaction(kind, dec("-4"), None).is_ok());
        }
    }

    /// A purchase without a positive unit cost is rejected
    #[test]
    fn test_purchase_requires_cost() {
        assert!(validate_transaction(TransactionKind::Purchase, dec("5"), None).is_err());
        assert!(validate_transaction(TransactionKind::Purchase, dec("5"), Some(dec("0"))).is_err());
        assert!(
            validate_transaction(TransactionKind::Purchase, dec("5"), Some(dec("-1"))).is_err()
        );
        assert!(
            validate_transaction(TransactionKind::Purchase, dec("5"), Some(dec("0.01"))).is_ok()
        );
    }

    /// Negative unit cost is rejected everywhere it can appear
    #[test]
    fn test_negative_cost_rejected() {
        assert!(
            validate_transaction(TransactionKind::Adjustment, dec("1"), Some(dec("-5"))).is_err()
        );
    }

    /// Violations name the offending field, so cost problems are never
    /// reported against the quantity
    #[test]
    fn test_violation_names_field() {
        let (field, _) =
            validate_transaction(TransactionKind::Purchase, dec("5"), None).unwrap_err();
        assert_eq!(field, "unit_cost");

        let (field, _) =
            validate_transaction(TransactionKind::Purchase, dec("5"), Some(dec("0"))).unwrap_err();
        assert_eq!(field, "unit_cost");

        let (field, _) = validate_transaction(TransactionKind::Adjustment, dec("1"), Some(dec("-5")))
            .unwrap_err();
        assert_eq!(field, "unit_cost");

        let (field, _) = validate_transaction(TransactionKind::Used, dec("3"), None).unwrap_err();
        assert_eq!(field, "qty");

        let (field, _) =
            validate_transaction(TransactionKind::Purchase, Decimal::ZERO, Some(dec("1")))
                .unwrap_err();
        assert_eq!(field, "qty");
    }

    #[test]
    fn test_allocation_qty() {
        assert!(validate_allocation_qty(dec("0.5")).is_ok());
        assert!(validate_allocation_qty(Decimal::ZERO).is_err());
        assert!(validate_allocation_qty(dec("-1")).is_err());
    }

    /// Kind strings round-trip
    #[test]
    fn test_kind_strings() {
        for kind in ALL_KINDS {
            assert_eq!(TransactionKind::from_str_opt(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::from_str_opt("restock"), None);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
        prop_oneof![
            Just(TransactionKind::Purchase),
            Just(TransactionKind::Used),
            Just(TransactionKind::DirectOrder),
            Just(TransactionKind::ReturnToSupplier),
            Just(TransactionKind::CustomerReturn),
            Just(TransactionKind::DamagedOrLost),
            Just(TransactionKind::Transfer),
            Just(TransactionKind::Adjustment),
        ]
    }

    proptest! {
        /// Normalization is idempotent
        #[test]
        fn prop_normalize_idempotent(raw in "[a-zA-Z0-9 -]{0,40}") {
            let once = normalize_part_code(&raw);
            prop_assert_eq!(normalize_part_code(&once), once);
        }

        /// A transaction that validates never violates its kind's sign rule
        #[test]
        fn prop_valid_txn_respects_sign(
            kind in kind_strategy(),
            qty_units in -100i64..100,
            cost_cents in proptest::option::of(1u32..10_000)
        ) {
            let qty = Decimal::from(qty_units);
            let unit_cost = cost_cents.map(|c| Decimal::from(c) / Decimal::from(100));
            if validate_transaction(kind, qty, unit_cost).is_ok() {
                match kind.required_sign() {
                    Some(QuantitySign::Positive) => prop_assert!(qty > Decimal::ZERO),
                    Some(QuantitySign::Negative) => prop_assert!(qty < Decimal::ZERO),
                    None => prop_assert!(qty != Decimal::ZERO),
                }
                if kind.requires_unit_cost() {
                    prop_assert!(unit_cost.is_some());
                }
            }
        }
    }
}
