//! HTTP handlers for parts catalog endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;

use crate::error::AppResult;
use crate::services::part::{CreatePartInput, PartSearch, PartService, UpdatePartInput};
use crate::AppState;
use shared::{PaginatedResponse, Part};

fn service(state: &AppState) -> PartService {
    PartService::new(
        state.db.clone(),
        Decimal::from(state.config.inventory.default_markup_percent),
    )
}

/// Create a part
pub async fn create_part(
    State(state): State<AppState>,
    Json(input): Json<CreatePartInput>,
) -> AppResult<Json<Part>> {
    let part = service(&state).create(input).await?;
    Ok(Json(part))
}

/// Fetch a part by code
pub async fn get_part(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Part>> {
    let part = service(&state).get(&code).await?;
    Ok(Json(part))
}

/// Search the parts catalog
pub async fn search_parts(
    State(state): State<AppState>,
    Query(search): Query<PartSearch>,
) -> AppResult<Json<PaginatedResponse<Part>>> {
    let parts = service(&state).search(search).await?;
    Ok(Json(parts))
}

/// Update a part's mutable fields
pub async fn update_part(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(input): Json<UpdatePartInput>,
) -> AppResult<Json<Part>> {
    let part = service(&state).update(&code, input).await?;
    Ok(Json(part))
}

/// Archive a part, keeping its ledger history
pub async fn archive_part(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Part>> {
    let part = service(&state).archive(&code).await?;
    Ok(Json(part))
}

/// Delete a part (rejected when ledger history exists)
pub async fn delete_part(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<()>> {
    service(&state).delete(&code).await?;
    Ok(Json(()))
}

/// Rebuild the part's cached projection and usage counters from the ledger
pub async fn rebuild_part_usage(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Part>> {
    let part = service(&state).rebuild_usage_cache(&code).await?;
    Ok(Json(part))
}
