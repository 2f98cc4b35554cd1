// src/handlers/alerts.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        alerts::{AlertFilter, StockAlert},
        kardex::PageRequest,
    },
};

#[utoipa::path(
    get,
    path = "/api/inventory/alerts",
    tag = "Alerts",
    params(AlertFilter, PageRequest),
    responses(
        (status = 200, description = "Alertas, mais recentes primeiro", body = Vec<StockAlert>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_alerts(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(filter): Query<AlertFilter>,
    Query(page): Query<PageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let alerts = app_state.alert_service.list_alerts(&filter, &page).await?;
    Ok((StatusCode::OK, Json(alerts)))
}

#[utoipa::path(
    post,
    path = "/api/inventory/alerts/{alert_id}/read",
    tag = "Alerts",
    responses(
        (status = 200, description = "Alerta marcado como lido", body = StockAlert),
        (status = 404, description = "Alerta não encontrado")
    ),
    params(
        ("alert_id" = i64, Path, description = "ID do Alerta")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_alert_read(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(alert_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let alert = app_state.alert_service.mark_as_read(alert_id, user.0).await?;
    Ok((StatusCode::OK, Json(alert)))
}
