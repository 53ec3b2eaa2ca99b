//! Route definitions for the Spice ERP backend

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Stock, production and inventory status
        .nest("/status", status_routes())
}

/// Period status routes, `:ledger` is one of stock, production, inventory
fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/:ledger/reconcile", post(handlers::reconcile_period))
        .route("/:ledger/adjustments", post(handlers::apply_adjustments))
        .route("/:ledger/periods/:period", get(handlers::get_period_snapshots))
        .route(
            "/:ledger/entities/:entity_id/history",
            get(handlers::get_entity_history),
        )
}
