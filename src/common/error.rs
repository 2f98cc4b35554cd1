use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

// Taxonomia de erros do kardex.
// Cada regra de negócio carrega os dados que o cliente precisa para montar a mensagem.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Produto {0} não encontrado")]
    ProductNotFound(i64),

    #[error("Movimentação {0} não encontrada")]
    MovementNotFound(i64),

    #[error("Alerta {0} não encontrado")]
    AlertNotFound(i64),

    #[error("O produto '{product_name}' exige número de lote")]
    LotRequired { product_id: i64, product_name: String },

    #[error("O produto '{product_name}' exige data de vencimento")]
    ExpirationRequired { product_id: i64, product_name: String },

    #[error("Quantidade inválida: {0}")]
    InvalidQuantity(i32),

    #[error("Origem e destino da transferência são o mesmo local")]
    SameLocationTransfer { warehouse_id: i64, country: String },

    #[error("Estoque insuficiente: disponível {available}, requerido {required}")]
    InsufficientStock {
        product_id: i64,
        warehouse_id: i64,
        country: String,
        lot: String,
        available: i32,
        required: i32,
        shortfall: i32,
    },

    #[error("A movimentação {movement_id} já foi anulada")]
    AlreadyReversed {
        movement_id: i64,
        annulled_by: Option<Uuid>,
        annulled_at: Option<DateTime<Utc>>,
        reason: Option<String>,
    },

    #[error("A movimentação {movement_id} pertence a uma transferência e não pode ser anulada isoladamente")]
    TransferNotIndividuallyReversible {
        movement_id: i64,
        related_movement_id: i64,
    },

    #[error("Token inválido")]
    InvalidToken,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Código estável exposto ao cliente.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            AppError::MovementNotFound(_) => "MOVEMENT_NOT_FOUND",
            AppError::AlertNotFound(_) => "ALERT_NOT_FOUND",
            AppError::LotRequired { .. } => "LOT_REQUIRED",
            AppError::ExpirationRequired { .. } => "EXPIRATION_REQUIRED",
            AppError::InvalidQuantity(_) => "INVALID_QUANTITY",
            AppError::SameLocationTransfer { .. } => "SAME_LOCATION_TRANSFER",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::AlreadyReversed { .. } => "ALREADY_REVERSED",
            AppError::TransferNotIndividuallyReversible { .. } => "TRANSFER_NOT_INDIVIDUALLY_REVERSIBLE",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ProductNotFound(_)
            | AppError::MovementNotFound(_)
            | AppError::AlertNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_)
            | AppError::LotRequired { .. }
            | AppError::ExpirationRequired { .. }
            | AppError::InvalidQuantity(_)
            | AppError::SameLocationTransfer { .. }
            | AppError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            AppError::AlreadyReversed { .. }
            | AppError::TransferNotIndividuallyReversible { .. } => StatusCode::CONFLICT,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Detalhes estruturados da falha (ou None para erros sem payload).
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            AppError::ProductNotFound(id) => Some(json!({ "productId": id })),
            AppError::MovementNotFound(id) => Some(json!({ "movementId": id })),
            AppError::AlertNotFound(id) => Some(json!({ "alertId": id })),
            AppError::LotRequired { product_id, product_name }
            | AppError::ExpirationRequired { product_id, product_name } => Some(json!({
                "productId": product_id,
                "productName": product_name,
            })),
            AppError::InvalidQuantity(quantity) => Some(json!({ "quantity": quantity })),
            AppError::SameLocationTransfer { warehouse_id, country } => Some(json!({
                "warehouseId": warehouse_id,
                "country": country,
            })),
            AppError::InsufficientStock {
                product_id,
                warehouse_id,
                country,
                lot,
                available,
                required,
                shortfall,
            } => Some(json!({
                "productId": product_id,
                "warehouseId": warehouse_id,
                "country": country,
                "lot": lot,
                "available": available,
                "required": required,
                "shortfall": shortfall,
            })),
            AppError::AlreadyReversed { movement_id, annulled_by, annulled_at, reason } => Some(json!({
                "movementId": movement_id,
                "annulledBy": annulled_by,
                "annulledAt": annulled_at,
                "reason": reason,
            })),
            AppError::TransferNotIndividuallyReversible { movement_id, related_movement_id } => Some(json!({
                "movementId": movement_id,
                "relatedMovementId": related_movement_id,
            })),
            AppError::InvalidToken | AppError::DatabaseError(_) | AppError::InternalServerError(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Erros de infraestrutura: loga o detalhe, devolve mensagem genérica.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "Erro Interno do Servidor: {}", self);
            "Ocorreu um erro inesperado.".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
            "details": self.details(),
        }));
        (status, body).into_response()
    }
}
