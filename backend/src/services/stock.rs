//! Stock projection service
//!
//! Derives current stock, weighted average cost and sell price by folding a
//! part's full transaction history. The fold is recomputed from scratch on
//! every read and after every append; the values stored on the catalog row
//! are read caches only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, AppResult};
use crate::services::ledger;
use shared::{costing, normalize_part_code, StockProjection};

/// Stock projection service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Project a part's current stock, average cost and sell price from its
    /// full ledger history
    pub async fn project(&self, part_code: &str) -> AppResult<StockProjection> {
        let code = normalize_part_code(part_code);
        let mut conn = self.db.acquire().await?;
        project_in_conn(&mut conn, &code).await
    }
}

/// Run the projection fold against a connection (usable inside a caller's
/// database transaction)
pub(crate) async fn project_in_conn(
    conn: &mut PgConnection,
    code: &str,
) -> AppResult<StockProjection> {
    let markup: Option<Decimal> =
        sqlx::query_scalar("SELECT markup_percent FROM parts WHERE code = $1")
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;
    let markup = markup.ok_or_else(|| AppError::NotFound("Part".to_string()))?;

    let transactions = ledger::fetch_transactions(conn, code).await?;
    Ok(costing::project(&transactions, markup))
}

/// Recompute and persist every cached field on the part row: the derived
/// stock/cost/price projection and the usage counters. Always a full fold
/// over the ledger, never an increment of the cached values.
pub(crate) async fn refresh_part_caches(conn: &mut PgConnection, code: &str) -> AppResult<()> {
    let projection = project_in_conn(&mut *conn, code).await?;

    let (times_used, first_used_at, last_used_at): (
        i64,
        Option<DateTime<Utc>>,
        Option<DateTime<Utc>>,
    ) = sqlx::query_as(
        "SELECT COUNT(*), MIN(occurred_at), MAX(occurred_at) \
         FROM part_transactions WHERE part_code = $1 AND kind = 'used'",
    )
    .bind(code)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        "UPDATE parts \
         SET stock = $1, avg_cost = $2, sell_price = $3, \
             times_used = $4, first_used_at = $5, last_used_at = $6, \
             updated_at = NOW() \
         WHERE code = $7",
    )
    .bind(projection.stock)
    .bind(projection.avg_cost)
    .bind(projection.sell_price)
    .bind(times_used as i32)
    .bind(first_used_at)
    .bind(last_used_at)
    .bind(code)
    .execute(conn)
    .await?;

    Ok(())
}
