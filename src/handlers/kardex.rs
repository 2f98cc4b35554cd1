// src/handlers/kardex.rs

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
        inventory::StockMovement,
        kardex::{KardexFilter, KardexPage, PageRequest, StockReportFilter, StockReportPage},
    },
};

#[utoipa::path(
    get,
    path = "/api/inventory/movements",
    tag = "Kardex",
    params(KardexFilter, PageRequest),
    responses(
        (status = 200, description = "Histórico paginado, mais recentes primeiro", body = KardexPage)
    ),
    security(("api_jwt" = []))
)]
pub async fn query_kardex(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(filter): Query<KardexFilter>,
    Query(page): Query<PageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = app_state.kardex_service.query(&filter, &page).await?;
    Ok((StatusCode::OK, Json(result)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/movements/{movement_id}",
    tag = "Kardex",
    responses(
        (status = 200, description = "Movimentação", body = StockMovement),
        (status = 404, description = "Movimentação não encontrada")
    ),
    params(
        ("movement_id" = i64, Path, description = "ID da Movimentação")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_movement(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(movement_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let movement = app_state.kardex_service.get_movement(movement_id).await?;
    Ok((StatusCode::OK, Json(movement)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/stock-report",
    tag = "Kardex",
    params(StockReportFilter, PageRequest),
    responses(
        (status = 200, description = "Saldos por produto e bodega", body = StockReportPage)
    ),
    security(("api_jwt" = []))
)]
pub async fn stock_report(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(filter): Query<StockReportFilter>,
    Query(page): Query<PageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state.kardex_service.stock_report(&filter, &page).await?;
    Ok((StatusCode::OK, Json(report)))
}
