//! HTTP handlers for inventory ledger endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::ledger::AppendTransactionInput;
use crate::services::{CostingService, LedgerService, StockService};
use crate::AppState;
use shared::{FifoAllocation, PartTransaction, StockProjection, TransactionKind};

/// Append a ledger transaction (purchase receipt, adjustment, transfer...)
pub async fn record_transaction(
    State(state): State<AppState>,
    Json(input): Json<AppendTransactionInput>,
) -> AppResult<Json<PartTransaction>> {
    let service = LedgerService::new(state.db);
    let transaction = service.append(input).await?;
    Ok(Json(transaction))
}

/// Query parameters for transaction history
#[derive(Debug, Deserialize)]
pub struct TransactionListParams {
    pub kind: Option<TransactionKind>,
    /// RFC 3339 lower bound on `occurred_at`
    pub since: Option<chrono::DateTime<chrono::Utc>>,
}

/// Full transaction history for a part, oldest first
pub async fn get_part_transactions(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<TransactionListParams>,
) -> AppResult<Json<Vec<PartTransaction>>> {
    let service = LedgerService::new(state.db);
    let transactions = service
        .list_for_part(&code, params.kind, params.since)
        .await?;
    Ok(Json(transactions))
}

/// Current stock, average cost and sell price, folded from the ledger
pub async fn get_part_projection(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<StockProjection>> {
    let service = StockService::new(state.db);
    let projection = service.project(&code).await?;
    Ok(Json(projection))
}

/// Query parameters for a FIFO preview
#[derive(Debug, Deserialize)]
pub struct FifoPreviewParams {
    pub qty: Decimal,
}

/// Dry-run FIFO allocation: per-lot cost breakdown without any ledger effect
pub async fn fifo_preview(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<FifoPreviewParams>,
) -> AppResult<Json<FifoAllocation>> {
    let service = CostingService::new(state.db);
    let allocation = service.preview(&code, params.qty).await?;
    Ok(Json(allocation))
}
