//! Route definitions for the Field Service Management Platform

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Parts catalog
        .nest("/parts", part_routes())
        // Inventory ledger
        .nest("/inventory", inventory_routes())
        // Job part allocations
        .nest("/jobs", job_routes())
        .route("/allocations/:allocation_id", delete(handlers::remove_allocation))
        // Advisory engines
        .nest("/advisory", advisory_routes())
}

/// Parts catalog routes
fn part_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::search_parts).post(handlers::create_part))
        .route(
            "/:code",
            get(handlers::get_part)
                .put(handlers::update_part)
                .delete(handlers::delete_part),
        )
        .route("/:code/archive", post(handlers::archive_part))
        .route("/:code/rebuild-usage", post(handlers::rebuild_part_usage))
}

/// Inventory ledger routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", post(handlers::record_transaction))
        .route("/parts/:code/transactions", get(handlers::get_part_transactions))
        .route("/parts/:code/projection", get(handlers::get_part_projection))
        .route("/parts/:code/fifo-preview", get(handlers::fifo_preview))
}

/// Job part allocation routes
fn job_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:job_ref/parts",
            get(handlers::list_job_parts).post(handlers::add_from_stock),
        )
        .route("/:job_ref/parts/direct-order", post(handlers::add_direct_order))
        .route("/:job_ref/parts/totals", get(handlers::get_job_totals))
        .route("/:job_ref/outcome", put(handlers::report_job_outcome))
}

/// Advisory routes
fn advisory_routes() -> Router<AppState> {
    Router::new()
        .route("/parts/:code/stocking-score", get(handlers::get_stocking_score))
        .route("/parts/:code/min-stock", get(handlers::get_min_stock))
        .route("/parts/:code/min-stock/apply", post(handlers::apply_min_stock))
}
