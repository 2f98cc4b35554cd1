// src/models/alerts.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "alert_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    StockMinimo,
    StockCritico,
    StockNegativo,
    ProximoVencer,
    Vencido,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord, ToSchema)]
#[sqlx(type_name = "alert_level", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

// Tabela 'stock_alerts'
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub id: i64,
    pub product_id: i64,
    pub warehouse_id: i64,
    pub country: String,
    pub alert_type: AlertType,
    pub level: AlertLevel,
    pub message: String,
    pub stock_snapshot: i32,
    pub is_read: bool,
    pub read_by: Option<Uuid>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Alerta decidido pelo avaliador, ainda não gravado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub country: String,
    pub alert_type: AlertType,
    pub level: AlertLevel,
    pub message: String,
    pub stock_snapshot: i32,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AlertFilter {
    pub product_id: Option<i64>,
    pub warehouse_id: Option<i64>,
    pub alert_type: Option<AlertType>,
    #[serde(default)]
    pub unread_only: bool,
}
