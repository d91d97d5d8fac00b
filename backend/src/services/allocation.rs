//! Job part allocation service
//!
//! Orchestrates consuming stock for a job: FIFO costing, the consuming
//! ledger entry, and the job-facing allocation record are written in one
//! database transaction, so no reader can observe stock reduced without an
//! owning allocation or vice versa. Concurrent consumers of the same part
//! serialize on a per-part advisory lock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{costing, ledger, stock};
use shared::{
    normalize_part_code, sell_price, validate_allocation_qty, AllocationSource, FifoAllocation,
    JobPartAllocation, JobPartTotals, TransactionKind,
};

/// Allocation service for adding and removing parts on jobs
#[derive(Clone)]
pub struct AllocationService {
    db: PgPool,
    /// Bounded retries for serialization/deadlock failures before a
    /// concurrency conflict is surfaced
    retry_attempts: u32,
}

/// Database row for an allocation
#[derive(Debug, FromRow)]
struct AllocationRow {
    id: Uuid,
    job_ref: Uuid,
    part_code: String,
    qty: Decimal,
    unit_cost: Decimal,
    total_cost: Decimal,
    markup_percent: Decimal,
    sell_price: Decimal,
    source: String,
    transaction_ref: Option<Uuid>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AllocationRow> for JobPartAllocation {
    type Error = AppError;

    // An allocation row with a source outside the enum is corrupt; surface
    // it rather than guess which pricing path produced it
    fn try_from(row: AllocationRow) -> Result<Self, Self::Error> {
        let source = AllocationSource::from_str_opt(&row.source).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "allocation {} has unknown source {:?}",
                row.id,
                row.source
            ))
        })?;
        Ok(JobPartAllocation {
            id: row.id,
            job_ref: row.job_ref,
            part_code: row.part_code,
            qty: row.qty,
            unit_cost: row.unit_cost,
            total_cost: row.total_cost,
            markup_percent: row.markup_percent,
            sell_price: row.sell_price,
            source,
            transaction_ref: row.transaction_ref,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

/// Input for allocating parts from stock
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddFromStockInput {
    #[validate(length(min = 1, message = "Part code is required"))]
    pub part_code: String,
    pub qty: Decimal,
    /// Overrides the part's default markup when present
    pub markup_override: Option<Decimal>,
    pub note: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Actor is required"))]
    pub actor: String,
}

/// Input for a job-specific direct order (never enters inventory)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddDirectOrderInput {
    #[validate(length(min = 1, message = "Part code is required"))]
    pub part_code: String,
    pub qty: Decimal,
    pub unit_cost: Decimal,
    pub markup_override: Option<Decimal>,
    pub note: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Actor is required"))]
    pub actor: String,
}

/// A stock allocation together with the FIFO breakdown it was priced from.
/// `fifo.extrapolated` tells the caller the lot history ran out and the
/// remainder was priced at the last known cost.
#[derive(Debug, Clone, Serialize)]
pub struct StockAllocationOutcome {
    pub allocation: JobPartAllocation,
    pub fifo: FifoAllocation,
}

const ALLOCATION_COLUMNS: &str = "id, job_ref, part_code, qty, unit_cost, total_cost, \
     markup_percent, sell_price, source, transaction_ref, note, created_at";

impl AllocationService {
    /// Create a new AllocationService instance
    pub fn new(db: PgPool, retry_attempts: u32) -> Self {
        Self { db, retry_attempts }
    }

    /// Consume parts from stock for a job: FIFO-cost the quantity, then
    /// append the consuming ledger entry and record the allocation in one
    /// database transaction.
    ///
    /// Serialization failures are retried against updated history a bounded
    /// number of times before surfacing a conflict.
    pub async fn add_from_stock(
        &self,
        job_ref: Uuid,
        input: AddFromStockInput,
    ) -> AppResult<StockAllocationOutcome> {
        input.validate()?;
        let code = normalize_part_code(&input.part_code);
        validate_allocation_qty(input.qty).map_err(|msg| AppError::validation("qty", msg))?;

        let mut attempt = 0;
        loop {
            match self.try_add_from_stock(job_ref, &code, &input).await {
                Err(AppError::Database(err)) if is_serialization_failure(&err) => {
                    attempt += 1;
                    if attempt > self.retry_attempts {
                        return Err(AppError::ConcurrencyConflict(format!(
                            "could not allocate part {} after {} attempts",
                            code, attempt
                        )));
                    }
                    tracing::warn!(
                        part = %code,
                        attempt,
                        "serialization failure during stock allocation, retrying"
                    );
                }
                other => return other,
            }
        }
    }

    async fn try_add_from_stock(
        &self,
        job_ref: Uuid,
        code: &str,
        input: &AddFromStockInput,
    ) -> AppResult<StockAllocationOutcome> {
        let mut tx = self.db.begin().await?;

        // Consumers of the same part serialize here; the FIFO read below
        // then sees all previously committed consumption.
        lock_part(&mut tx, code).await?;

        let part_markup: Option<Decimal> =
            sqlx::query_scalar("SELECT markup_percent FROM parts WHERE code = $1")
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?;
        let part_markup = part_markup.ok_or_else(|| AppError::NotFound("Part".to_string()))?;
        let markup = input.markup_override.unwrap_or(part_markup);

        let fifo = costing::allocate_in_tx(&mut tx, code, input.qty).await?;

        let consuming = ledger::insert_transaction(
            &mut tx,
            code,
            &ledger::AppendTransactionInput {
                part_code: code.to_string(),
                qty: -input.qty,
                kind: TransactionKind::Used,
                unit_cost: Some(fifo.weighted_unit_cost),
                job_ref: Some(job_ref),
                order_ref: None,
                from_location: None,
                to_location: None,
                note: input.note.clone(),
                actor: input.actor.clone(),
                occurred_at: None,
            },
        )
        .await?;

        let row: AllocationRow = sqlx::query_as(&format!(
            "INSERT INTO job_part_allocations ( \
                 job_ref, part_code, qty, unit_cost, total_cost, markup_percent, \
                 sell_price, source, transaction_ref, note \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {ALLOCATION_COLUMNS}"
        ))
        .bind(job_ref)
        .bind(code)
        .bind(input.qty)
        .bind(fifo.weighted_unit_cost)
        .bind(fifo.total_cost)
        .bind(markup)
        .bind(sell_price(fifo.weighted_unit_cost, input.qty, markup))
        .bind(AllocationSource::Stock.as_str())
        .bind(consuming.id)
        .bind(&input.note)
        .fetch_one(&mut *tx)
        .await?;

        recompute_job_totals(&mut tx, job_ref).await?;
        stock::refresh_part_caches(&mut tx, code).await?;

        tx.commit().await?;

        if fifo.extrapolated {
            tracing::warn!(
                part = %code,
                qty = %input.qty,
                "purchase lots exhausted; remainder priced at last known cost"
            );
        }

        Ok(StockAllocationOutcome {
            allocation: row.try_into()?,
            fifo,
        })
    }

    /// Record a job-specific direct order. No ledger entry and no stock
    /// effect: the part never entered inventory.
    pub async fn add_direct_order(
        &self,
        job_ref: Uuid,
        input: AddDirectOrderInput,
    ) -> AppResult<JobPartAllocation> {
        input.validate()?;
        let code = normalize_part_code(&input.part_code);
        validate_allocation_qty(input.qty).map_err(|msg| AppError::validation("qty", msg))?;
        if input.unit_cost <= Decimal::ZERO {
            return Err(AppError::validation("unit_cost", "Unit cost must be positive"));
        }

        let mut tx = self.db.begin().await?;
        ledger::ensure_part_exists(&mut tx, &code).await?;

        let part_markup: Option<Decimal> =
            sqlx::query_scalar("SELECT markup_percent FROM parts WHERE code = $1")
                .bind(&code)
                .fetch_optional(&mut *tx)
                .await?;
        let markup = input
            .markup_override
            .or(part_markup)
            .ok_or_else(|| AppError::NotFound("Part".to_string()))?;

        let row: AllocationRow = sqlx::query_as(&format!(
            "INSERT INTO job_part_allocations ( \
                 job_ref, part_code, qty, unit_cost, total_cost, markup_percent, \
                 sell_price, source, transaction_ref, note \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL, $9) \
             RETURNING {ALLOCATION_COLUMNS}"
        ))
        .bind(job_ref)
        .bind(&code)
        .bind(input.qty)
        .bind(input.unit_cost)
        .bind(input.unit_cost * input.qty)
        .bind(markup)
        .bind(sell_price(input.unit_cost, input.qty, markup))
        .bind(AllocationSource::DirectOrder.as_str())
        .bind(&input.note)
        .fetch_one(&mut *tx)
        .await?;

        recompute_job_totals(&mut tx, job_ref).await?;
        tx.commit().await?;

        row.try_into()
    }

    /// Remove an allocation. Stock-sourced allocations get a compensating
    /// positive adjustment at the same unit cost, restoring stock exactly;
    /// the original consuming entry stays in the ledger untouched.
    pub async fn remove(&self, allocation_id: Uuid, actor: &str) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let row: Option<AllocationRow> = sqlx::query_as(&format!(
            "SELECT {ALLOCATION_COLUMNS} FROM job_part_allocations WHERE id = $1"
        ))
        .bind(allocation_id)
        .fetch_optional(&mut *tx)
        .await?;
        let allocation: JobPartAllocation = row
            .ok_or_else(|| AppError::NotFound("Allocation".to_string()))?
            .try_into()?;

        if allocation.source == AllocationSource::Stock {
            lock_part(&mut tx, &allocation.part_code).await?;

            let note = match allocation.transaction_ref {
                Some(txn) => format!("reversal of consuming transaction {}", txn),
                None => format!("reversal of allocation {}", allocation.id),
            };
            ledger::insert_transaction(
                &mut tx,
                &allocation.part_code,
                &ledger::AppendTransactionInput {
                    part_code: allocation.part_code.clone(),
                    qty: allocation.qty,
                    kind: TransactionKind::Adjustment,
                    unit_cost: Some(allocation.unit_cost),
                    job_ref: Some(allocation.job_ref),
                    order_ref: None,
                    from_location: None,
                    to_location: None,
                    note: Some(note),
                    actor: actor.to_string(),
                    occurred_at: None,
                },
            )
            .await?;
        }

        sqlx::query("DELETE FROM job_part_allocations WHERE id = $1")
            .bind(allocation_id)
            .execute(&mut *tx)
            .await?;

        recompute_job_totals(&mut tx, allocation.job_ref).await?;
        if allocation.source == AllocationSource::Stock {
            stock::refresh_part_caches(&mut tx, &allocation.part_code).await?;
        }

        tx.commit().await?;

        tracing::info!(
            allocation = %allocation_id,
            part = %allocation.part_code,
            source = allocation.source.as_str(),
            "allocation removed"
        );

        Ok(())
    }

    /// Current allocations for a job
    pub async fn list_for_job(&self, job_ref: Uuid) -> AppResult<Vec<JobPartAllocation>> {
        let rows: Vec<AllocationRow> = sqlx::query_as(&format!(
            "SELECT {ALLOCATION_COLUMNS} FROM job_part_allocations \
             WHERE job_ref = $1 ORDER BY created_at ASC"
        ))
        .bind(job_ref)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(JobPartAllocation::try_from).collect()
    }

    /// The job-level parts aggregate. Zero when the job has no allocations.
    pub async fn job_totals(&self, job_ref: Uuid) -> AppResult<JobPartTotals> {
        let row: Option<(Decimal, Decimal, DateTime<Utc>)> = sqlx::query_as(
            "SELECT parts_cost, parts_total, updated_at FROM job_part_totals WHERE job_ref = $1",
        )
        .bind(job_ref)
        .fetch_optional(&self.db)
        .await?;

        Ok(match row {
            Some((parts_cost, parts_total, updated_at)) => JobPartTotals {
                job_ref,
                parts_cost,
                parts_total,
                updated_at,
            },
            None => JobPartTotals {
                job_ref,
                parts_cost: Decimal::ZERO,
                parts_total: Decimal::ZERO,
                updated_at: Utc::now(),
            },
        })
    }
}

/// Serialize writers of the same part for the rest of the transaction
async fn lock_part(conn: &mut PgConnection, code: &str) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(code)
        .execute(conn)
        .await?;
    Ok(())
}

/// Recompute the job aggregate from scratch over the job's allocations.
/// Deliberately not an incremental counter.
pub(crate) async fn recompute_job_totals(conn: &mut PgConnection, job_ref: Uuid) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO job_part_totals (job_ref, parts_cost, parts_total, updated_at) \
         SELECT $1, COALESCE(SUM(total_cost), 0), COALESCE(SUM(sell_price), 0), NOW() \
         FROM job_part_allocations WHERE job_ref = $1 \
         ON CONFLICT (job_ref) DO UPDATE \
         SET parts_cost = EXCLUDED.parts_cost, \
             parts_total = EXCLUDED.parts_total, \
             updated_at = EXCLUDED.updated_at",
    )
    .bind(job_ref)
    .execute(conn)
    .await?;
    Ok(())
}

/// SQLSTATE 40001 (serialization failure) and 40P01 (deadlock detected)
/// are safe to retry after the competing transaction finishes
fn is_serialization_failure(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}
