//! Advisory service: stocking-priority score and recommended minimum stock
//!
//! Read-only over the ledger and catalog apart from two narrow writes:
//! applying a computed minimum back to the part row, and recording job
//! outcomes reported by the external job module (the first-call-complete
//! signal the score consumes).

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{ledger, stock};
use shared::{
    advisory, normalize_part_code, MinStockRecommendation, ScoreInputs, StockingScore, UsagePoint,
};

/// Advisory service
#[derive(Clone)]
pub struct AdvisoryService {
    db: PgPool,
    /// Replenishment lead time assumed when the caller supplies none
    default_lead_time_days: u32,
}

/// Input for reporting a job outcome (from the job module)
#[derive(Debug, Deserialize)]
pub struct JobOutcomeInput {
    pub first_call_complete: bool,
}

impl AdvisoryService {
    /// Create a new AdvisoryService instance
    pub fn new(db: PgPool, default_lead_time_days: u32) -> Self {
        Self {
            db,
            default_lead_time_days,
        }
    }

    /// Stocking-priority score for a part, with its factor breakdown
    pub async fn stocking_score(&self, part_code: &str) -> AppResult<StockingScore> {
        let code = normalize_part_code(part_code);
        let mut conn = self.db.acquire().await?;
        ledger::ensure_part_exists(&mut conn, &code).await?;

        let projection = stock::project_in_conn(&mut conn, &code).await?;

        let usage: Option<(i32, Option<chrono::DateTime<Utc>>, Option<chrono::DateTime<Utc>>)> =
            sqlx::query_as(
                "SELECT times_used, first_used_at, last_used_at FROM parts WHERE code = $1",
            )
            .bind(&code)
            .fetch_optional(&mut *conn)
            .await?;
        let (times_used, first_used_at, last_used_at) =
            usage.ok_or_else(|| AppError::NotFound("Part".to_string()))?;

        let (consuming_jobs, fcc_jobs): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(DISTINCT t.job_ref), \
                    COUNT(DISTINCT t.job_ref) FILTER (WHERE o.first_call_complete) \
             FROM part_transactions t \
             LEFT JOIN job_outcomes o ON o.job_ref = t.job_ref \
             WHERE t.part_code = $1 AND t.qty < 0 AND t.job_ref IS NOT NULL",
        )
        .bind(&code)
        .fetch_one(&mut *conn)
        .await?;

        Ok(advisory::score(&ScoreInputs {
            times_used,
            first_used_at,
            last_used_at,
            consuming_jobs: consuming_jobs as u32,
            fcc_jobs: fcc_jobs as u32,
            avg_cost: projection.avg_cost,
            as_of: Utc::now(),
        }))
    }

    /// Recommended minimum stock from historical usage rate and lead time
    pub async fn min_stock(
        &self,
        part_code: &str,
        lead_time_days: Option<u32>,
    ) -> AppResult<MinStockRecommendation> {
        let code = normalize_part_code(part_code);
        let mut conn = self.db.acquire().await?;
        ledger::ensure_part_exists(&mut conn, &code).await?;

        let rows: Vec<(chrono::DateTime<Utc>, Decimal)> = sqlx::query_as(
            "SELECT occurred_at, ABS(qty) FROM part_transactions \
             WHERE part_code = $1 AND kind = 'used' \
             ORDER BY occurred_at ASC, seq ASC",
        )
        .bind(&code)
        .fetch_all(&mut *conn)
        .await?;

        let usage: Vec<UsagePoint> = rows
            .into_iter()
            .map(|(occurred_at, qty)| UsagePoint { occurred_at, qty })
            .collect();

        Ok(advisory::recommend(
            &usage,
            lead_time_days.unwrap_or(self.default_lead_time_days),
            Utc::now(),
        ))
    }

    /// Compute the recommendation and persist it as the part's
    /// system-computed minimum stock (overrides still win at read time)
    pub async fn apply_min_stock(
        &self,
        part_code: &str,
        lead_time_days: Option<u32>,
    ) -> AppResult<MinStockRecommendation> {
        let code = normalize_part_code(part_code);
        let recommendation = self.min_stock(&code, lead_time_days).await?;

        sqlx::query("UPDATE parts SET min_stock = $1, updated_at = NOW() WHERE code = $2")
            .bind(recommendation.value)
            .bind(&code)
            .execute(&self.db)
            .await?;

        tracing::info!(
            part = %code,
            min_stock = recommendation.value,
            "applied recommended minimum stock"
        );
        Ok(recommendation)
    }

    /// Record whether a job was completed on the first visit. Reported by
    /// the job module; consumed by the stocking score.
    pub async fn record_job_outcome(
        &self,
        job_ref: Uuid,
        input: JobOutcomeInput,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO job_outcomes (job_ref, first_call_complete, reported_at) \
             VALUES ($1, $2, NOW()) \
             ON CONFLICT (job_ref) DO UPDATE \
             SET first_call_complete = EXCLUDED.first_call_complete, \
                 reported_at = EXCLUDED.reported_at",
        )
        .bind(job_ref)
        .bind(input.first_call_complete)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
