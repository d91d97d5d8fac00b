//! FIFO cost allocation service
//!
//! Wraps the pure lot walk in `shared::costing` with the ledger reads it
//! needs. The preview path is used for quoting; the allocation orchestrator
//! calls `allocate_in_tx` inside its own database transaction so the walk
//! sees a consistent snapshot of lots and consumption.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, AppResult};
use crate::services::ledger;
use shared::{costing, normalize_part_code, CostingError, FifoAllocation};

/// FIFO costing service
#[derive(Clone)]
pub struct CostingService {
    db: PgPool,
}

impl CostingService {
    /// Create a new CostingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Dry-run FIFO allocation: what would consuming `qty` units cost right
    /// now? No ledger effect.
    pub async fn preview(&self, part_code: &str, qty: Decimal) -> AppResult<FifoAllocation> {
        let code = normalize_part_code(part_code);
        let mut conn = self.db.acquire().await?;
        ledger::ensure_part_exists(&mut conn, &code).await?;
        allocate_in_tx(&mut conn, &code, qty).await
    }
}

/// Run the FIFO walk against the ledger state visible to `conn`.
///
/// Purchase lots come back in ledger order (date, then insertion order);
/// consumption already logged is clamped off the front of that lot list by
/// the pure walk.
pub(crate) async fn allocate_in_tx(
    conn: &mut PgConnection,
    code: &str,
    qty: Decimal,
) -> AppResult<FifoAllocation> {
    let lots = ledger::purchase_lots(&mut *conn, code).await?;
    let consumed = ledger::total_consumed(&mut *conn, code).await?;

    costing::allocate(&lots, consumed, qty).map_err(|e| match e {
        CostingError::NoPurchaseHistory => AppError::InsufficientHistory(format!(
            "part {} has no purchase history to derive a unit cost from",
            code
        )),
        CostingError::NonPositiveQuantity => {
            AppError::validation("qty", "Requested quantity must be positive")
        }
    })
}
