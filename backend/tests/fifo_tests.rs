//! FIFO cost allocator tests
//!
//! Tests for oldest-lot-first cost allocation including:
//! - Per-lot cost breakdown and weighted unit cost
//! - Already-consumed clamping across lots
//! - Insertion-order tie-break for same-timestamp lots
//! - Extrapolation when lot history is exhausted

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::costing::{allocate, CostingError, PurchaseLot};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn lot(qty: &str, unit_cost: &str) -> PurchaseLot {
    PurchaseLot {
        transaction_id: Uuid::new_v4(),
        qty: dec(qty),
        unit_cost: dec(unit_cost),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// 5 units @ $10 (oldest) then 5 @ $20: allocating 7 draws 5 from the
    /// first lot and 2 from the second
    #[test]
    fn test_fifo_spans_lots() {
        let lots = vec![lot("5", "10"), lot("5", "20")];
        let result = allocate(&lots, Decimal::ZERO, dec("7")).unwrap();

        assert_eq!(result.lots.len(), 2);
        assert_eq!(result.lots[0].qty, dec("5"));
        assert_eq!(result.lots[0].unit_cost, dec("10"));
        assert_eq!(result.lots[1].qty, dec("2"));
        assert_eq!(result.lots[1].unit_cost, dec("20"));

        assert_eq!(result.total_cost, dec("90"));
        // 90 / 7 ≈ 12.857
        let expected = dec("90") / dec("7");
        assert_eq!(result.weighted_unit_cost, expected);
        assert!(!result.extrapolated);
    }

    /// A single lot covers the whole request
    #[test]
    fn test_single_lot() {
        let lots = vec![lot("10", "25")];
        let result = allocate(&lots, Decimal::ZERO, dec("4")).unwrap();

        assert_eq!(result.lots.len(), 1);
        assert_eq!(result.lots[0].qty, dec("4"));
        assert_eq!(result.total_cost, dec("100"));
        assert_eq!(result.weighted_unit_cost, dec("25"));
    }

    /// Prior consumption is clamped off the oldest lots first
    #[test]
    fn test_already_consumed_skips_oldest() {
        let lots = vec![lot("5", "10"), lot("5", "20")];
        // 5 already used: the $10 lot is gone
        let result = allocate(&lots, dec("5"), dec("3")).unwrap();

        assert_eq!(result.lots.len(), 1);
        assert_eq!(result.lots[0].qty, dec("3"));
        assert_eq!(result.lots[0].unit_cost, dec("20"));
        assert!(!result.extrapolated);
    }

    /// Partial prior consumption leaves the remainder of the oldest lot
    #[test]
    fn test_partial_consumption() {
        let lots = vec![lot("5", "10"), lot("5", "20")];
        let result = allocate(&lots, dec("3"), dec("4")).unwrap();

        assert_eq!(result.lots.len(), 2);
        assert_eq!(result.lots[0].qty, dec("2"));
        assert_eq!(result.lots[0].unit_cost, dec("10"));
        assert_eq!(result.lots[1].qty, dec("2"));
        assert_eq!(result.lots[1].unit_cost, dec("20"));
    }

    /// No purchase history: cost cannot be determined
    #[test]
    fn test_no_history_fails() {
        let result = allocate(&[], Decimal::ZERO, dec("1"));
        assert_eq!(result.unwrap_err(), CostingError::NoPurchaseHistory);
    }

    /// Zero or negative request is rejected
    #[test]
    fn test_non_positive_qty_fails() {
        let lots = vec![lot("5", "10")];
        assert_eq!(
            allocate(&lots, Decimal::ZERO, Decimal::ZERO).unwrap_err(),
            CostingError::NonPositiveQuantity
        );
        assert_eq!(
            allocate(&lots, Decimal::ZERO, dec("-2")).unwrap_err(),
            CostingError::NonPositiveQuantity
        );
    }

    /// Requesting more than history covers extrapolates at the last lot's
    /// cost instead of failing, and says so
    #[test]
    fn test_exhausted_lots_extrapolate() {
        let lots = vec![lot("5", "10"), lot("5", "20")];
        let result = allocate(&lots, Decimal::ZERO, dec("12")).unwrap();

        assert!(result.extrapolated);
        // 5 @ 10 + 7 @ 20 (5 real + 2 extrapolated, merged into one draw)
        assert_eq!(result.lots.len(), 2);
        assert_eq!(result.lots[1].qty, dec("7"));
        assert_eq!(result.lots[1].unit_cost, dec("20"));
        assert_eq!(result.total_cost, dec("190"));
    }

    /// Everything already consumed: the whole request is extrapolated
    #[test]
    fn test_fully_consumed_extrapolates() {
        let lots = vec![lot("5", "10"), lot("5", "20")];
        let result = allocate(&lots, dec("10"), dec("3")).unwrap();

        assert!(result.extrapolated);
        assert_eq!(result.lots.len(), 1);
        assert_eq!(result.lots[0].unit_cost, dec("20"));
        assert_eq!(result.total_cost, dec("60"));
    }

    /// Same-timestamp lots are consumed in ledger insertion order; the
    /// caller supplies them in that order and the walk preserves it
    #[test]
    fn test_insertion_order_preserved() {
        let first = lot("2", "10");
        let second = lot("2", "30");
        let first_id = first.transaction_id;
        let lots = vec![first, second];

        let result = allocate(&lots, Decimal::ZERO, dec("3")).unwrap();
        assert_eq!(result.lots[0].transaction_id, first_id);
        assert_eq!(result.lots[0].qty, dec("2"));
        assert_eq!(result.lots[1].qty, dec("1"));
    }

    /// Weighted unit cost times quantity reproduces the total when the
    /// division is exact
    #[test]
    fn test_weighted_cost_consistency() {
        // 5 @ 10 + 3 @ 20 = 110 over 8 units = 13.75 exactly
        let lots = vec![lot("5", "10"), lot("5", "20")];
        let result = allocate(&lots, Decimal::ZERO, dec("8")).unwrap();
        assert_eq!(result.weighted_unit_cost, dec("13.75"));
        assert_eq!(result.weighted_unit_cost * dec("8"), result.total_cost);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn qty_strategy() -> impl Strategy<Value = Decimal> {
        (1u32..500).prop_map(|n| Decimal::from(n))
    }

    fn cost_strategy() -> impl Strategy<Value = Decimal> {
        (1u32..10_000).prop_map(|cents| Decimal::from(cents) / Decimal::from(100))
    }

    fn lots_strategy() -> impl Strategy<Value = Vec<PurchaseLot>> {
        prop::collection::vec((qty_strategy(), cost_strategy()), 1..8).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(qty, unit_cost)| PurchaseLot {
                    transaction_id: Uuid::new_v4(),
                    qty,
                    unit_cost,
                })
                .collect()
        })
    }

    proptest! {
        /// Total cost is always the sum of per-lot subtotals
        #[test]
        fn prop_total_is_sum_of_subtotals(
            lots in lots_strategy(),
            consumed in 0u32..200,
            requested in 1u32..200
        ) {
            let result = allocate(&lots, Decimal::from(consumed), Decimal::from(requested)).unwrap();
            let sum: Decimal = result.lots.iter().map(|d| d.subtotal).sum();
            prop_assert_eq!(result.total_cost, sum);
        }

        /// The drawn quantity always equals the requested quantity
        /// (extrapolation tops up the shortfall)
        #[test]
        fn prop_draws_cover_request(
            lots in lots_strategy(),
            consumed in 0u32..200,
            requested in 1u32..200
        ) {
            let result = allocate(&lots, Decimal::from(consumed), Decimal::from(requested)).unwrap();
            let drawn: Decimal = result.lots.iter().map(|d| d.qty).sum();
            prop_assert_eq!(drawn, Decimal::from(requested));
        }

        /// Weighted unit cost is bounded by the cheapest and priciest lot
        #[test]
        fn prop_weighted_cost_within_lot_bounds(
            lots in lots_strategy(),
            requested in 1u32..200
        ) {
            let result = allocate(&lots, Decimal::ZERO, Decimal::from(requested)).unwrap();
            let min = lots.iter().map(|l| l.unit_cost).min().unwrap();
            let max = lots.iter().map(|l| l.unit_cost).max().unwrap();
            prop_assert!(result.weighted_unit_cost >= min);
            prop_assert!(result.weighted_unit_cost <= max);
        }

        /// Draws appear in the same order as the supplied lots (FIFO)
        #[test]
        fn prop_draws_follow_lot_order(
            lots in lots_strategy(),
            requested in 1u32..200
        ) {
            let result = allocate(&lots, Decimal::ZERO, Decimal::from(requested)).unwrap();
            let lot_order: Vec<Uuid> = lots.iter().map(|l| l.transaction_id).collect();
            let mut last_idx = 0;
            for draw in &result.lots {
                let idx = lot_order.iter().position(|id| *id == draw.transaction_id).unwrap();
                prop_assert!(idx >= last_idx);
                last_idx = idx;
            }
        }

        /// Extrapolation happens exactly when the request exceeds what is
        /// left in the lots
        #[test]
        fn prop_extrapolation_flag_correct(
            lots in lots_strategy(),
            consumed in 0u32..200,
            requested in 1u32..200
        ) {
            let consumed = Decimal::from(consumed);
            let requested = Decimal::from(requested);
            let total: Decimal = lots.iter().map(|l| l.qty).sum();
            let available = (total - consumed).max(Decimal::ZERO);

            let result = allocate(&lots, consumed, requested).unwrap();
            prop_assert_eq!(result.extrapolated, requested > available);
        }
    }
}
