//! HTTP handlers for advisory endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::advisory::{AdvisoryService, JobOutcomeInput};
use crate::AppState;
use shared::{MinStockRecommendation, StockingScore};

fn service(state: &AppState) -> AdvisoryService {
    AdvisoryService::new(
        state.db.clone(),
        state.config.inventory.default_lead_time_days,
    )
}

/// Stocking-priority score for a part
pub async fn get_stocking_score(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<StockingScore>> {
    let score = service(&state).stocking_score(&code).await?;
    Ok(Json(score))
}

/// Query parameters for the min-stock advisor
#[derive(Debug, Deserialize)]
pub struct MinStockParams {
    pub lead_time_days: Option<u32>,
}

/// Recommended minimum stock level for a part
pub async fn get_min_stock(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<MinStockParams>,
) -> AppResult<Json<MinStockRecommendation>> {
    let recommendation = service(&state).min_stock(&code, params.lead_time_days).await?;
    Ok(Json(recommendation))
}

/// Compute and persist the recommendation as the part's minimum stock
pub async fn apply_min_stock(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<MinStockParams>,
) -> AppResult<Json<MinStockRecommendation>> {
    let recommendation = service(&state)
        .apply_min_stock(&code, params.lead_time_days)
        .await?;
    Ok(Json(recommendation))
}

/// Record a job outcome (first-call-complete signal from the job module)
pub async fn report_job_outcome(
    State(state): State<AppState>,
    Path(job_ref): Path<Uuid>,
    Json(input): Json<JobOutcomeInput>,
) -> AppResult<Json<()>> {
    service(&state).record_job_outcome(job_ref, input).await?;
    Ok(Json(()))
}
