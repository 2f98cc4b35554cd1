// src/models/kardex.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::inventory::{MovementReason, MovementStatus, MovementType, StockMovement};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;
/// Maior página aceita; números acima disso são truncados para ela.
pub const MAX_PAGE: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageRequest {
    /// (página, tamanho) já normalizados: 1 <= página <= MAX_PAGE, 1 <= tamanho <= MAX_PAGE_SIZE.
    pub fn normalized(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        (page, size)
    }

    pub fn offset(&self) -> i64 {
        let (page, size) = self.normalized();
        (page - 1).saturating_mul(size)
    }
}

/// Quais movimentações entram no kardex. Por padrão só as ativas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KardexStatusFilter {
    #[default]
    Activo,
    Anulado,
    Todos,
}

impl KardexStatusFilter {
    pub fn as_status(self) -> Option<MovementStatus> {
        match self {
            KardexStatusFilter::Activo => Some(MovementStatus::Activo),
            KardexStatusFilter::Anulado => Some(MovementStatus::Anulado),
            KardexStatusFilter::Todos => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct KardexFilter {
    pub product_id: Option<i64>,
    pub warehouse_id: Option<i64>,
    pub country: Option<String>,
    pub movement_type: Option<MovementType>,
    pub reason: Option<MovementReason>,
    pub user_id: Option<Uuid>,
    /// Busca parcial (ILIKE) no documento de referência.
    pub reference_document: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub status: KardexStatusFilter,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KardexPage {
    pub items: Vec<StockMovement>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

// --- Relatório de saldos ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockState {
    Normal,
    Bajo,
    Critico,
}

impl StockState {
    /// Mesmas faixas do avaliador de alertas (crítico antes de mínimo).
    pub fn classify(quantity: i64, stock_minimo: i32, stock_critico: i32) -> Self {
        if quantity <= i64::from(stock_critico) {
            StockState::Critico
        } else if quantity <= i64::from(stock_minimo) {
            StockState::Bajo
        } else {
            StockState::Normal
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StockReportFilter {
    pub product_id: Option<i64>,
    pub warehouse_id: Option<i64>,
    pub country: Option<String>,
}

/// Linha agregada do banco (sem o rótulo de estado).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockAggregate {
    pub product_id: i64,
    pub product_name: String,
    pub warehouse_id: i64,
    pub country: String,
    pub total_quantity: i64,
    pub lot_count: i64,
    pub nearest_expiration: Option<NaiveDate>,
    pub stock_minimo: i32,
    pub stock_critico: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockReportRow {
    pub product_id: i64,
    pub product_name: String,
    pub warehouse_id: i64,
    pub country: String,
    pub total_quantity: i64,
    pub lot_count: i64,
    pub nearest_expiration: Option<NaiveDate>,
    pub stock_minimo: i32,
    pub stock_critico: i32,
    pub state: StockState,
}

impl From<StockAggregate> for StockReportRow {
    fn from(row: StockAggregate) -> Self {
        let state = StockState::classify(row.total_quantity, row.stock_minimo, row.stock_critico);
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            warehouse_id: row.warehouse_id,
            country: row.country,
            total_quantity: row.total_quantity,
            lot_count: row.lot_count,
            nearest_expiration: row.nearest_expiration,
            stock_minimo: row.stock_minimo,
            stock_critico: row.stock_critico,
            state,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockReportPage {
    pub items: Vec<StockReportRow>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}
