// src/handlers/inventory.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::inventory::{
        BalanceView, MovementOutcome, MovementReason, MovementType, NewMovement, ReversalOutcome,
        TransferOutcome, TransferRequest,
    },
};

// ---
// Validação Customizada
// ---
fn validate_direct_movement_type(val: &MovementType) -> Result<(), ValidationError> {
    // As pernas de transferência só nascem pelo endpoint de transferência
    match val {
        MovementType::Ingreso | MovementType::Salida => Ok(()),
        _ => {
            let mut err = ValidationError::new("movement_type");
            err.message = Some("Use /transfers para movimentações de transferência.".into());
            Err(err)
        }
    }
}

fn validate_not_blank(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("O campo não pode ficar em branco.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: RegisterMovement
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMovementPayload {
    pub product_id: i64,
    pub warehouse_id: i64,

    #[validate(length(min = 2, max = 3, message = "O país deve ter 2 ou 3 letras."))]
    pub country: String,

    pub lot: Option<String>,

    #[validate(custom(function = "validate_direct_movement_type"))]
    pub movement_type: MovementType,

    pub reason: MovementReason,

    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    pub quantity: i32,

    pub expiration_date: Option<NaiveDate>,
    pub reference_document: Option<String>,
    pub notes: Option<String>,

    #[serde(default)]
    pub allow_negative_stock: bool,
}

#[utoipa::path(
    post,
    path = "/api/inventory/movements",
    tag = "Inventory",
    request_body = RegisterMovementPayload,
    responses(
        (status = 201, description = "Movimentação registrada", body = MovementOutcome),
        (status = 400, description = "Regra de negócio violada (lote, vencimento, saldo)"),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_movement(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<RegisterMovementPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = app_state
        .inventory_service
        .register_movement(
            &app_state.db_pool,
            NewMovement {
                product_id: payload.product_id,
                warehouse_id: payload.warehouse_id,
                country: payload.country,
                lot: payload.lot,
                movement_type: payload.movement_type,
                reason: payload.reason,
                quantity: payload.quantity,
                expiration_date: payload.expiration_date,
                user_id: user.0,
                reference_document: payload.reference_document,
                notes: payload.notes,
                allow_negative_stock: payload.allow_negative_stock,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

// ---
// Payload: Transfer
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    pub product_id: i64,
    pub origin_warehouse_id: i64,
    pub destination_warehouse_id: i64,

    #[validate(length(min = 2, max = 3, message = "O país deve ter 2 ou 3 letras."))]
    pub origin_country: String,

    #[validate(length(min = 2, max = 3, message = "O país deve ter 2 ou 3 letras."))]
    pub destination_country: String,

    pub lot: Option<String>,

    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    pub quantity: i32,

    /// Sobrescreve a validade herdada do lote de origem.
    pub expiration_date: Option<NaiveDate>,
    pub reference_document: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/inventory/transfers",
    tag = "Inventory",
    request_body = TransferPayload,
    responses(
        (status = 201, description = "Transferência concluída (duas pernas ligadas)", body = TransferOutcome),
        (status = 400, description = "Saldo insuficiente na origem ou origem igual ao destino")
    ),
    security(("api_jwt" = []))
)]
pub async fn transfer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<TransferPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = app_state
        .transfer_service
        .transfer(
            &app_state.db_pool,
            TransferRequest {
                product_id: payload.product_id,
                origin_warehouse_id: payload.origin_warehouse_id,
                destination_warehouse_id: payload.destination_warehouse_id,
                origin_country: payload.origin_country,
                destination_country: payload.destination_country,
                lot: payload.lot,
                quantity: payload.quantity,
                expiration_date: payload.expiration_date,
                user_id: user.0,
                reference_document: payload.reference_document,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

// ---
// Payload: Reverse
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReversePayload {
    #[validate(custom(function = "validate_not_blank"))]
    pub reason: String,
}

#[utoipa::path(
    post,
    path = "/api/inventory/movements/{movement_id}/reverse",
    tag = "Inventory",
    request_body = ReversePayload,
    responses(
        (status = 201, description = "Movimentação anulada com ajuste inverso", body = ReversalOutcome),
        (status = 404, description = "Movimentação não encontrada"),
        (status = 409, description = "Já anulada ou perna de transferência")
    ),
    params(
        ("movement_id" = i64, Path, description = "ID da Movimentação")
    ),
    security(("api_jwt" = []))
)]
pub async fn reverse_movement(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(movement_id): Path<i64>,
    Json(payload): Json<ReversePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = app_state
        .reversal_service
        .reverse(&app_state.db_pool, movement_id, user.0, payload.reason.trim())
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

// ---
// Query: Balance
// ---
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BalanceQuery {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub country: String,
    /// Sem lote: soma de todos os lotes da bodega.
    pub lot: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/inventory/balance",
    tag = "Inventory",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Saldo atual", body = BalanceView)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_balance(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<BalanceQuery>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state
        .inventory_service
        .balance_view(
            &app_state.db_pool,
            query.product_id,
            query.warehouse_id,
            &query.country,
            query.lot.as_deref(),
        )
        .await?;

    Ok((StatusCode::OK, Json(view)))
}
