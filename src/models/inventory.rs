// src/models/inventory.rs

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc, NaiveDate};
use rust_decimal::Decimal;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::alerts::StockAlert;

/// Lote usado quando o chamador não informa nenhum.
/// Entra na chave do saldo, então produtos sem lote continuam com uma chave estável.
pub const LOT_PLACEHOLDER: &str = "SIN-LOTE";

/// Validade sentinela para produtos que não controlam vencimento.
pub fn far_future_expiration() -> NaiveDate {
    NaiveDate::from_ymd_opt(2099, 12, 31).unwrap_or(NaiveDate::MAX)
}

// --- 1. Produto (dados mestres, somente leitura) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub unit_price: Decimal,
    pub stock_minimo: i32,
    pub stock_critico: i32,
    pub requiere_lote: bool,
    pub requiere_vencimiento: bool,
}

// --- 2. Chave do saldo ---
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryKey {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub country: String,
    pub lot: String,
}

impl InventoryKey {
    pub fn new(product_id: i64, warehouse_id: i64, country: &str, lot: Option<&str>) -> Self {
        Self {
            product_id,
            warehouse_id,
            country: country.trim().to_uppercase(),
            lot: normalize_lot(lot),
        }
    }

    /// Texto usado para o advisory lock da chave.
    pub fn lock_token(&self) -> String {
        format!(
            "kardex:{}:{}:{}:{}",
            self.product_id, self.warehouse_id, self.country, self.lot
        )
    }
}

pub fn normalize_lot(lot: Option<&str>) -> String {
    match lot.map(str::trim) {
        Some(l) if !l.is_empty() => l.to_string(),
        _ => LOT_PLACEHOLDER.to_string(),
    }
}

// --- 3. Saldo materializado (tabela 'inventory_records') ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub id: i64,
    pub product_id: i64,
    pub warehouse_id: i64,
    pub country: String,
    pub lot: String,
    // NULL conta como zero
    pub quantity: Option<i32>,
    pub expiration_date: Option<NaiveDate>,
    pub storage_condition: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn on_hand(&self) -> i32 {
        self.quantity.unwrap_or(0)
    }
}

// --- 4. Movimentações (kardex) ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "movement_type", rename_all = "SCREAMING_SNAKE_CASE")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum MovementType {
    Ingreso,
    Salida,
    TransferenciaSalida,
    TransferenciaIngreso,
}

impl MovementType {
    pub fn is_ingress(self) -> bool {
        match self {
            MovementType::Ingreso | MovementType::TransferenciaIngreso => true,
            MovementType::Salida | MovementType::TransferenciaSalida => false,
        }
    }

    /// Sinal aplicado à quantidade: +1 entrada, -1 saída.
    pub fn direction(self) -> i32 {
        if self.is_ingress() { 1 } else { -1 }
    }

    /// Tipo que desfaz o efeito deste no saldo.
    pub fn inverse(self) -> Self {
        match self {
            MovementType::Ingreso => MovementType::Salida,
            MovementType::Salida => MovementType::Ingreso,
            MovementType::TransferenciaSalida => MovementType::TransferenciaIngreso,
            MovementType::TransferenciaIngreso => MovementType::TransferenciaSalida,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "movement_reason", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementReason {
    Compra,
    Ajuste,
    Venta,
    Devolucion,
    Merma,
    Produccion,
    Transferencia,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "movement_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementStatus {
    Activo,
    Anulado,
}

// --- STOCK MOVEMENT (Histórico) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub warehouse_id: i64,
    pub country: String,
    pub lot: Option<String>,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    pub quantity: i32,
    pub expiration_date: Option<NaiveDate>,
    pub balance_before: i32,
    pub balance_after: i32,
    pub user_id: Uuid,
    pub reference_document: Option<String>,
    pub notes: Option<String>,
    pub related_movement_id: Option<i64>,
    pub status: MovementStatus,
    pub annulled_by: Option<Uuid>,
    pub annulled_at: Option<DateTime<Utc>>,
    pub annulment_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn key(&self) -> InventoryKey {
        InventoryKey::new(self.product_id, self.warehouse_id, &self.country, self.lot.as_deref())
    }
}

/// Pedido de movimentação já validado pela camada HTTP.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub country: String,
    pub lot: Option<String>,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    pub quantity: i32,
    pub expiration_date: Option<NaiveDate>,
    pub user_id: Uuid,
    pub reference_document: Option<String>,
    pub notes: Option<String>,
    pub allow_negative_stock: bool,
}

impl NewMovement {
    pub fn key(&self) -> InventoryKey {
        InventoryKey::new(self.product_id, self.warehouse_id, &self.country, self.lot.as_deref())
    }

    /// Lote efetivamente gravado na movimentação (vazio vira NULL).
    pub fn lot_value(&self) -> Option<&str> {
        self.lot.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovementOutcome {
    pub movement: StockMovement,
    pub alerts: Vec<StockAlert>,
}

/// Pedido de transferência entre bodegas.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub product_id: i64,
    pub origin_warehouse_id: i64,
    pub destination_warehouse_id: i64,
    pub origin_country: String,
    pub destination_country: String,
    pub lot: Option<String>,
    pub quantity: i32,
    pub expiration_date: Option<NaiveDate>,
    pub user_id: Uuid,
    pub reference_document: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub egress: StockMovement,
    pub ingress: StockMovement,
    pub alerts: Vec<StockAlert>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReversalOutcome {
    /// Movimentação original, agora ANULADO.
    pub reversed: StockMovement,
    /// Ajuste inverso que restaurou o saldo.
    pub adjustment: StockMovement,
    pub alerts: Vec<StockAlert>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub country: String,
    pub lot: Option<String>,
    pub quantity: i32,
}

impl BalanceView {
    /// Ecoa a chave como foi resolvida: país normalizado e lote com o mesmo
    /// placeholder usado na consulta. Sem lote = soma de todos os lotes.
    pub fn new(product_id: i64, warehouse_id: i64, country: &str, lot: Option<&str>, quantity: i32) -> Self {
        Self {
            product_id,
            warehouse_id,
            country: country.trim().to_uppercase(),
            lot: lot.map(|l| normalize_lot(Some(l))),
            quantity,
        }
    }
}
