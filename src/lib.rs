// src/lib.rs

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{config::AppState, docs::ApiDoc};

/// Monta o router completo da API.
pub fn router(app_state: AppState) -> Router {
    let inventory_routes = Router::new()
        .route("/movements"
               ,post(handlers::inventory::register_movement)
               .get(handlers::kardex::query_kardex)
        )
        .route("/movements/{movement_id}"
               ,get(handlers::kardex::get_movement)
        )
        .route("/movements/{movement_id}/reverse"
               ,post(handlers::inventory::reverse_movement)
        )
        .route("/transfers"
               ,post(handlers::inventory::transfer)
        )
        .route("/balance"
               ,get(handlers::inventory::get_balance)
        )
        .route("/stock-report"
               ,get(handlers::kardex::stock_report)
        )
        .route("/alerts"
               ,get(handlers::alerts::list_alerts)
        )
        .route("/alerts/{alert_id}/read"
               ,post(handlers::alerts::mark_alert_read)
        );

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/inventory", inventory_routes)
        .with_state(app_state)
}
