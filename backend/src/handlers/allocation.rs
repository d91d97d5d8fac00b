//! HTTP handlers for job part allocation endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::allocation::{
    AddDirectOrderInput, AddFromStockInput, AllocationService, StockAllocationOutcome,
};
use crate::AppState;
use shared::{JobPartAllocation, JobPartTotals};

fn service(state: &AppState) -> AllocationService {
    AllocationService::new(
        state.db.clone(),
        state.config.inventory.conflict_retry_attempts,
    )
}

/// Allocate parts to a job from stock (FIFO-costed)
pub async fn add_from_stock(
    State(state): State<AppState>,
    Path(job_ref): Path<Uuid>,
    Json(input): Json<AddFromStockInput>,
) -> AppResult<Json<StockAllocationOutcome>> {
    let outcome = service(&state).add_from_stock(job_ref, input).await?;
    Ok(Json(outcome))
}

/// Record a job-specific direct order (no stock effect)
pub async fn add_direct_order(
    State(state): State<AppState>,
    Path(job_ref): Path<Uuid>,
    Json(input): Json<AddDirectOrderInput>,
) -> AppResult<Json<JobPartAllocation>> {
    let allocation = service(&state).add_direct_order(job_ref, input).await?;
    Ok(Json(allocation))
}

/// Query parameters for removing an allocation
#[derive(Debug, Deserialize)]
pub struct RemoveAllocationParams {
    pub actor: String,
}

/// Remove an allocation, reversing its stock consumption if any
pub async fn remove_allocation(
    State(state): State<AppState>,
    Path(allocation_id): Path<Uuid>,
    Query(params): Query<RemoveAllocationParams>,
) -> AppResult<Json<()>> {
    service(&state).remove(allocation_id, &params.actor).await?;
    Ok(Json(()))
}

/// Current allocations for a job
pub async fn list_job_parts(
    State(state): State<AppState>,
    Path(job_ref): Path<Uuid>,
) -> AppResult<Json<Vec<JobPartAllocation>>> {
    let allocations = service(&state).list_for_job(job_ref).await?;
    Ok(Json(allocations))
}

/// Job-level parts cost and sell totals
pub async fn get_job_totals(
    State(state): State<AppState>,
    Path(job_ref): Path<Uuid>,
) -> AppResult<Json<JobPartTotals>> {
    let totals = service(&state).job_totals(job_ref).await?;
    Ok(Json(totals))
}
