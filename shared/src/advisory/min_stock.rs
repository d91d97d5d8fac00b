//! Recommended minimum stock level
//!
//! Estimates a minimum stock from the historical usage rate and an assumed
//! replenishment lead time. Confidence grows with the number of qualifying
//! usage transactions and never regresses for the same data plus more
//! history.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fewer qualifying usage transactions than this is Low confidence
const CONFIDENCE_MEDIUM_AT: usize = 5;
/// This many or more is High confidence
const CONFIDENCE_HIGH_AT: usize = 20;

/// One consuming transaction, reduced to what the estimator needs
#[derive(Debug, Clone)]
pub struct UsagePoint {
    pub occurred_at: DateTime<Utc>,
    /// Absolute quantity consumed
    pub qty: Decimal,
}

/// How much history backs the recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// The numbers behind the recommendation, surfaced for inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinStockReasoning {
    pub usage_rate_per_day: Decimal,
    pub lead_time_days: u32,
    pub data_points: usize,
}

/// A recommended minimum stock level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinStockRecommendation {
    /// Always at least 1
    pub value: i32,
    pub confidence: Confidence,
    pub reasoning: MinStockReasoning,
}

/// Estimate the minimum stock to hold so that usage over one replenishment
/// lead time is covered. Floors at 1 even with no history.
pub fn recommend(
    usage: &[UsagePoint],
    lead_time_days: u32,
    as_of: DateTime<Utc>,
) -> MinStockRecommendation {
    let data_points = usage.len();

    let usage_rate_per_day = match usage.iter().map(|u| u.occurred_at).min() {
        Some(earliest) => {
            let span_days = Decimal::from((as_of - earliest).num_days().max(1));
            let total: Decimal = usage.iter().map(|u| u.qty.abs()).sum();
            total / span_days
        }
        None => Decimal::ZERO,
    };

    let raw = usage_rate_per_day * Decimal::from(lead_time_days);
    let value = raw.ceil().to_i32().unwrap_or(i32::MAX).max(1);

    let confidence = if data_points >= CONFIDENCE_HIGH_AT {
        Confidence::High
    } else if data_points >= CONFIDENCE_MEDIUM_AT {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    MinStockRecommendation {
        value,
        confidence,
        reasoning: MinStockReasoning {
            usage_rate_per_day,
            lead_time_days,
            data_points,
        },
    }
}
