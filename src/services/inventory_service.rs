// src/services/inventory_service.rs

use chrono::{NaiveDate, Utc};
use sqlx::{Acquire, Executor, Postgres};

use crate::{
    common::{db_utils::lock_inventory_key, error::AppError},
    db::{AlertRepository, InventoryRepository, MovementRepository},
    models::inventory::{
        far_future_expiration, BalanceView, InventoryKey, MovementOutcome, MovementReason,
        NewMovement, Product,
    },
    services::alert_service::{AlertContext, AlertService},
};

/// O que fazer com o registro materializado depois da movimentação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    Store(i32),
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementPlan {
    pub balance_before: i32,
    pub balance_after: i32,
    pub record_action: RecordAction,
    /// Validade usada se o registro for criado agora.
    pub record_expiration: Option<NaiveDate>,
}

/// Lote e validade obrigatórios só valem para entradas, e ajustes ficam dispensados.
pub fn check_requirements(product: &Product, request: &NewMovement) -> Result<(), AppError> {
    if request.reason == MovementReason::Ajuste || !request.movement_type.is_ingress() {
        return Ok(());
    }

    if product.requiere_lote && request.lot_value().is_none() {
        return Err(AppError::LotRequired {
            product_id: product.id,
            product_name: product.name.clone(),
        });
    }

    if product.requiere_vencimiento && request.expiration_date.is_none() {
        return Err(AppError::ExpirationRequired {
            product_id: product.id,
            product_name: product.name.clone(),
        });
    }

    Ok(())
}

/// Parte pura do registro: valida, calcula o novo saldo e decide o destino do registro.
pub fn plan_movement(
    product: &Product,
    request: &NewMovement,
    balance_before: i32,
) -> Result<MovementPlan, AppError> {
    if request.quantity <= 0 {
        return Err(AppError::InvalidQuantity(request.quantity));
    }

    check_requirements(product, request)?;

    let delta = request.quantity * request.movement_type.direction();
    let balance_after = balance_before
        .checked_add(delta)
        .ok_or(AppError::InvalidQuantity(request.quantity))?;

    if balance_after < 0 && !request.allow_negative_stock {
        let available = balance_before.max(0);
        return Err(AppError::InsufficientStock {
            product_id: product.id,
            warehouse_id: request.warehouse_id,
            country: request.key().country,
            lot: request.key().lot,
            available,
            required: request.quantity,
            shortfall: request.quantity - available,
        });
    }

    let record_action = if balance_after > 0 {
        RecordAction::Store(balance_after)
    } else {
        RecordAction::Remove
    };

    let record_expiration = match request.expiration_date {
        Some(date) => Some(date),
        None if !product.requiere_vencimiento => Some(far_future_expiration()),
        None => None,
    };

    Ok(MovementPlan {
        balance_before,
        balance_after,
        record_action,
        record_expiration,
    })
}

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    movement_repo: MovementRepository,
    alert_repo: AlertRepository,
    expiry_warning_days: i64,
}

impl InventoryService {
    pub fn new(
        inventory_repo: InventoryRepository,
        movement_repo: MovementRepository,
        alert_repo: AlertRepository,
        expiry_warning_days: i64,
    ) -> Self {
        Self {
            inventory_repo,
            movement_repo,
            alert_repo,
            expiry_warning_days,
        }
    }

    // --- BALANCE RESOLVER ---

    /// Saldo atual da chave. Sem lote soma todos os lotes da bodega; sem registro devolve 0.
    pub async fn resolve_balance<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        warehouse_id: i64,
        country: &str,
        lot: Option<&str>,
    ) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo
            .resolve_balance(executor, product_id, warehouse_id, country, lot)
            .await
    }

    pub async fn balance_view<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        warehouse_id: i64,
        country: &str,
        lot: Option<&str>,
    ) -> Result<BalanceView, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quantity = self
            .resolve_balance(executor, product_id, warehouse_id, country, lot)
            .await?;

        Ok(BalanceView::new(product_id, warehouse_id, country, lot, quantity))
    }

    // --- MOVEMENT REGISTRAR ---

    /// Registra uma movimentação numa única transação.
    ///
    /// Chamado com uma conexão que já está em transação (transferência, anulação),
    /// `begin()` abre um savepoint: qualquer falha aqui desfaz só esta perna e o
    /// chamador decide o resto.
    pub async fn register_movement<'e, A>(
        &self,
        conn: A,
        request: NewMovement,
    ) -> Result<MovementOutcome, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        // 1. Produto
        let product = self
            .inventory_repo
            .find_product(&mut *tx, request.product_id)
            .await?
            .ok_or(AppError::ProductNotFound(request.product_id))?;

        // 2. Lote / validade antes de tocar no saldo
        check_requirements(&product, &request)?;

        // 3. Trava a chave e lê o saldo anterior
        let key = request.key();
        lock_inventory_key(&mut *tx, &key).await?;

        let balance_before = self
            .inventory_repo
            .resolve_balance(&mut *tx, key.product_id, key.warehouse_id, &key.country, Some(&key.lot))
            .await?;

        // 4-5. Novo saldo + política de estoque negativo
        let plan = plan_movement(&product, &request, balance_before).inspect_err(|err| {
            if let AppError::InsufficientStock { available, required, shortfall, .. } = err {
                tracing::warn!(
                    product_id = key.product_id,
                    warehouse_id = key.warehouse_id,
                    country = %key.country,
                    lot = %key.lot,
                    available,
                    required,
                    shortfall,
                    "Movimentação rejeitada: estoque insuficiente"
                );
            }
        })?;

        // 6. Grava a movimentação
        let movement = self
            .movement_repo
            .insert_movement(&mut *tx, &request, &key, plan.balance_before, plan.balance_after)
            .await?;

        // 7. Atualiza o saldo materializado
        match plan.record_action {
            RecordAction::Store(quantity) => {
                self.inventory_repo
                    .upsert_record(&mut *tx, &key, quantity, plan.record_expiration)
                    .await?;
            }
            RecordAction::Remove => {
                let removed = self.inventory_repo.delete_record(&mut *tx, &key).await?;
                if removed > 0 {
                    tracing::debug!(lot = %key.lot, "Registro de inventário zerado e removido");
                }
            }
        }

        // 8. Alertas sobre o saldo da chave (lote), não sobre o total da bodega:
        // registros com saldo <= 0 são apagados, então só a chave enxerga
        // STOCK_NEGATIVO. O total por bodega fica no relatório de saldos.
        let ctx = AlertContext {
            product: &product,
            key: &key,
            balance: plan.balance_after,
            expiration_date: request
                .movement_type
                .is_ingress()
                .then_some(request.expiration_date)
                .flatten(),
            today: Utc::now().date_naive(),
            expiry_warning_days: self.expiry_warning_days,
        };

        let mut alerts = Vec::new();
        for new_alert in AlertService::evaluate(&ctx) {
            let alert = self.alert_repo.insert_alert(&mut *tx, &new_alert).await?;
            tracing::warn!(
                alert_id = alert.id,
                alert_type = ?alert.alert_type,
                level = ?alert.level,
                stock = alert.stock_snapshot,
                "{}",
                alert.message
            );
            alerts.push(alert);
        }

        // 9. Commit
        tx.commit().await?;

        tracing::info!(
            movement_id = movement.id,
            product_id = movement.product_id,
            warehouse_id = movement.warehouse_id,
            movement_type = ?movement.movement_type,
            reason = ?movement.reason,
            quantity = movement.quantity,
            balance_before = movement.balance_before,
            balance_after = movement.balance_after,
            "Movimentação registrada"
        );

        Ok(MovementOutcome { movement, alerts })
    }

    /// Validade do registro de origem (usada para herdar na transferência).
    pub async fn record_expiration<'e, E>(
        &self,
        executor: E,
        key: &InventoryKey,
    ) -> Result<Option<NaiveDate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = self.inventory_repo.find_record(executor, key).await?;
        Ok(record.and_then(|r| r.expiration_date))
    }
}
