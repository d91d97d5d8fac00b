//! Stocking-priority score
//!
//! Combines usage frequency, recency, first-call-complete impact and cost
//! into a 0-10 priority per part. The weights are tunable policy; the four
//! factors are the contract and stay independently inspectable in the
//! breakdown.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Factor weights; must sum to 1.0
const WEIGHT_FREQUENCY: f64 = 0.35;
const WEIGHT_RECENCY: f64 = 0.25;
const WEIGHT_FCC: f64 = 0.20;
const WEIGHT_COST: f64 = 0.20;

/// Recency half-life in days: a part last used this many days ago scores
/// half the recency of one used today
const RECENCY_HALF_LIFE_DAYS: f64 = 45.0;

/// Uses per month that saturate the frequency factor at 10
const FREQUENCY_SATURATION_PER_MONTH: f64 = 5.0;

/// Average cost at which the cost factor drops to half weight
const COST_MIDPOINT: f64 = 50.0;

/// Snapshot of the inputs the score is computed from
#[derive(Debug, Clone)]
pub struct ScoreInputs {
    pub times_used: i32,
    pub first_used_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    /// Jobs that consumed this part
    pub consuming_jobs: u32,
    /// Of those, jobs completed on the first visit
    pub fcc_jobs: u32,
    pub avg_cost: Option<Decimal>,
    pub as_of: DateTime<Utc>,
}

/// Per-factor contributions, each in [0, 10]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub frequency: f64,
    pub recency: f64,
    pub fcc_impact: f64,
    pub cost: f64,
}

/// What to do with a part at this score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockingRecommendation {
    AlwaysStock,
    Recommended,
    Optional,
    SpecialOrder,
}

/// A stocking-priority score with its inspectable factor breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockingScore {
    pub value: f64,
    pub breakdown: ScoreBreakdown,
    pub recommendation: StockingRecommendation,
}

/// Score a part's stocking priority. Deterministic for a given snapshot.
pub fn score(inputs: &ScoreInputs) -> StockingScore {
    let frequency = frequency_factor(inputs);
    let recency = recency_factor(inputs);
    let fcc_impact = fcc_factor(inputs);
    let cost = cost_factor(inputs);

    let value = (frequency * WEIGHT_FREQUENCY
        + recency * WEIGHT_RECENCY
        + fcc_impact * WEIGHT_FCC
        + cost * WEIGHT_COST)
        .clamp(0.0, 10.0);

    let recommendation = if value >= 7.5 {
        StockingRecommendation::AlwaysStock
    } else if value >= 5.0 {
        StockingRecommendation::Recommended
    } else if value >= 2.5 {
        StockingRecommendation::Optional
    } else {
        StockingRecommendation::SpecialOrder
    };

    StockingScore {
        value,
        breakdown: ScoreBreakdown {
            frequency,
            recency,
            fcc_impact,
            cost,
        },
        recommendation,
    }
}

/// Times used per month since first use, saturating at
/// `FREQUENCY_SATURATION_PER_MONTH`
fn frequency_factor(inputs: &ScoreInputs) -> f64 {
    let Some(first) = inputs.first_used_at else {
        return 0.0;
    };
    let age_days = (inputs.as_of - first).num_days().max(1) as f64;
    let months = (age_days / 30.0).max(1.0);
    let per_month = inputs.times_used.max(0) as f64 / months;
    (per_month / FREQUENCY_SATURATION_PER_MONTH * 10.0).clamp(0.0, 10.0)
}

/// Exponential decay from days since last use
fn recency_factor(inputs: &ScoreInputs) -> f64 {
    let Some(last) = inputs.last_used_at else {
        return 0.0;
    };
    let days = (inputs.as_of - last).num_days().max(0) as f64;
    10.0 * 0.5f64.powf(days / RECENCY_HALF_LIFE_DAYS)
}

/// Fraction of consuming jobs that were first-call-complete
fn fcc_factor(inputs: &ScoreInputs) -> f64 {
    if inputs.consuming_jobs == 0 {
        return 0.0;
    }
    let fraction = inputs.fcc_jobs.min(inputs.consuming_jobs) as f64 / inputs.consuming_jobs as f64;
    fraction * 10.0
}

/// Inverse cost weight: cheap high-turnover parts are easy to always stock
fn cost_factor(inputs: &ScoreInputs) -> f64 {
    match inputs.avg_cost.and_then(|c| c.to_f64()) {
        // No cost history: neutral
        None => 5.0,
        Some(cost) if cost <= 0.0 => 10.0,
        Some(cost) => 10.0 * COST_MIDPOINT / (COST_MIDPOINT + cost),
    }
}
