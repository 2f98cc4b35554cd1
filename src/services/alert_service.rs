// src/services/alert_service.rs

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AlertRepository,
    models::{
        alerts::{AlertFilter, AlertLevel, AlertType, NewAlert, StockAlert},
        inventory::{far_future_expiration, InventoryKey, Product},
        kardex::PageRequest,
    },
};

/// Tudo o que o avaliador enxerga depois de uma movimentação.
#[derive(Debug, Clone)]
pub struct AlertContext<'a> {
    pub product: &'a Product,
    pub key: &'a InventoryKey,
    pub balance: i32,
    /// Validade do lote que entrou (None para saídas).
    pub expiration_date: Option<NaiveDate>,
    pub today: NaiveDate,
    pub expiry_warning_days: i64,
}

impl AlertContext<'_> {
    fn days_to_expiration(&self) -> Option<i64> {
        self.expiration_date
            .filter(|date| *date != far_future_expiration())
            .map(|date| (date - self.today).num_days())
    }
}

/// Uma regra: predicado + tipo/nível do alerta gerado.
pub struct AlertRule {
    pub alert_type: AlertType,
    pub level: AlertLevel,
    pub applies: fn(&AlertContext<'_>) -> bool,
}

fn is_negative(ctx: &AlertContext<'_>) -> bool {
    ctx.balance < 0
}

fn is_at_or_below_critical(ctx: &AlertContext<'_>) -> bool {
    ctx.balance <= ctx.product.stock_critico
}

fn is_at_or_below_minimum(ctx: &AlertContext<'_>) -> bool {
    ctx.balance <= ctx.product.stock_minimo
}

fn is_expired(ctx: &AlertContext<'_>) -> bool {
    ctx.days_to_expiration().is_some_and(|days| days < 0)
}

fn expires_soon(ctx: &AlertContext<'_>) -> bool {
    ctx.days_to_expiration()
        .is_some_and(|days| days <= ctx.expiry_warning_days)
}

// Ordem = prioridade. A primeira regra que casar vence; no máximo um alerta por movimentação.
pub const ALERT_RULES: &[AlertRule] = &[
    AlertRule { alert_type: AlertType::StockNegativo, level: AlertLevel::Critical, applies: is_negative },
    AlertRule { alert_type: AlertType::StockCritico, level: AlertLevel::Critical, applies: is_at_or_below_critical },
    AlertRule { alert_type: AlertType::StockMinimo, level: AlertLevel::Warning, applies: is_at_or_below_minimum },
    AlertRule { alert_type: AlertType::Vencido, level: AlertLevel::Critical, applies: is_expired },
    AlertRule { alert_type: AlertType::ProximoVencer, level: AlertLevel::Warning, applies: expires_soon },
];

fn alert_message(alert_type: AlertType, ctx: &AlertContext<'_>) -> String {
    let product = ctx.product;
    let warehouse = ctx.key.warehouse_id;
    match alert_type {
        AlertType::StockNegativo => format!(
            "Stock negativo de '{}' na bodega {}: saldo atual {} (crítico {}, mínimo {})",
            product.name, warehouse, ctx.balance, product.stock_critico, product.stock_minimo
        ),
        AlertType::StockCritico => format!(
            "Stock crítico de '{}' na bodega {}: saldo atual {} (crítico {})",
            product.name, warehouse, ctx.balance, product.stock_critico
        ),
        AlertType::StockMinimo => format!(
            "Stock abaixo do mínimo de '{}' na bodega {}: saldo atual {} (mínimo {}, crítico {})",
            product.name, warehouse, ctx.balance, product.stock_minimo, product.stock_critico
        ),
        AlertType::Vencido => format!(
            "Lote '{}' de '{}' na bodega {} vencido em {}: saldo atual {}",
            ctx.key.lot,
            product.name,
            warehouse,
            ctx.expiration_date.map(|d| d.to_string()).unwrap_or_default(),
            ctx.balance
        ),
        AlertType::ProximoVencer => format!(
            "Lote '{}' de '{}' na bodega {} vence em {} (janela de {} dias): saldo atual {}",
            ctx.key.lot,
            product.name,
            warehouse,
            ctx.expiration_date.map(|d| d.to_string()).unwrap_or_default(),
            ctx.expiry_warning_days,
            ctx.balance
        ),
    }
}

#[derive(Clone)]
pub struct AlertService {
    alert_repo: AlertRepository,
}

impl AlertService {
    pub fn new(alert_repo: AlertRepository) -> Self {
        Self { alert_repo }
    }

    /// Decide os alertas de uma movimentação. Não grava nada.
    pub fn evaluate(ctx: &AlertContext<'_>) -> Vec<NewAlert> {
        ALERT_RULES
            .iter()
            .find(|rule| (rule.applies)(ctx))
            .map(|rule| NewAlert {
                product_id: ctx.key.product_id,
                warehouse_id: ctx.key.warehouse_id,
                country: ctx.key.country.clone(),
                alert_type: rule.alert_type,
                level: rule.level,
                message: alert_message(rule.alert_type, ctx),
                stock_snapshot: ctx.balance,
            })
            .into_iter()
            .collect()
    }

    pub async fn list_alerts(
        &self,
        filter: &AlertFilter,
        page: &PageRequest,
    ) -> Result<Vec<StockAlert>, AppError> {
        self.alert_repo.list_alerts(filter, page).await
    }

    pub async fn mark_as_read(&self, alert_id: i64, user_id: Uuid) -> Result<StockAlert, AppError> {
        let alert = self
            .alert_repo
            .mark_as_read(alert_id, user_id)
            .await?
            .ok_or(AppError::AlertNotFound(alert_id))?;

        tracing::info!(alert_id, user_id = %user_id, "Alerta marcado como lido");
        Ok(alert)
    }
}
