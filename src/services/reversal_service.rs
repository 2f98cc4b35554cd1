// src/services/reversal_service.rs

use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::MovementRepository,
    models::inventory::{MovementReason, MovementStatus, NewMovement, ReversalOutcome, StockMovement},
    services::inventory_service::InventoryService,
};

/// Prefixo do documento de referência do ajuste gerado pela anulação.
pub const REVERSAL_REFERENCE_PREFIX: &str = "ANULACION-MOV-";

/// Pré-condições da anulação, na ordem em que são verificadas.
pub fn ensure_reversible(movement: &StockMovement) -> Result<(), AppError> {
    if movement.status == MovementStatus::Anulado {
        return Err(AppError::AlreadyReversed {
            movement_id: movement.id,
            annulled_by: movement.annulled_by,
            annulled_at: movement.annulled_at,
            reason: movement.annulment_reason.clone(),
        });
    }

    // Pernas de transferência não se anulam isoladamente (e não existe anulação em par).
    if let Some(related_movement_id) = movement.related_movement_id {
        return Err(AppError::TransferNotIndividuallyReversible {
            movement_id: movement.id,
            related_movement_id,
        });
    }

    Ok(())
}

/// Ajuste que desfaz o efeito de `original` no saldo da mesma chave.
pub fn inverse_adjustment(original: &StockMovement, user_id: Uuid, reason: &str) -> NewMovement {
    NewMovement {
        product_id: original.product_id,
        warehouse_id: original.warehouse_id,
        country: original.country.clone(),
        lot: original.lot.clone(),
        movement_type: original.movement_type.inverse(),
        reason: MovementReason::Ajuste,
        quantity: original.quantity,
        expiration_date: original.expiration_date,
        user_id,
        reference_document: Some(format!("{}{}", REVERSAL_REFERENCE_PREFIX, original.id)),
        notes: Some(format!("Anulação da movimentação {}: {}", original.id, reason)),
        // A anulação sempre restaura o estado anterior, mesmo com saídas no meio
        allow_negative_stock: true,
    }
}

#[derive(Clone)]
pub struct ReversalService {
    inventory_service: InventoryService,
    movement_repo: MovementRepository,
}

impl ReversalService {
    pub fn new(inventory_service: InventoryService, movement_repo: MovementRepository) -> Self {
        Self {
            inventory_service,
            movement_repo,
        }
    }

    pub async fn reverse<'e, A>(
        &self,
        conn: A,
        movement_id: i64,
        user_id: Uuid,
        reason: &str,
    ) -> Result<ReversalOutcome, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        // 1. Trava a movimentação original (check-then-set na mesma transação)
        let original = self
            .movement_repo
            .find_for_update(&mut *tx, movement_id)
            .await?
            .ok_or(AppError::MovementNotFound(movement_id))?;

        ensure_reversible(&original).inspect_err(|err| {
            tracing::warn!(movement_id, error = %err, "Anulação recusada");
        })?;

        // 2. Ajuste inverso pelo registrador
        let adjustment = self
            .inventory_service
            .register_movement(&mut *tx, inverse_adjustment(&original, user_id, reason))
            .await?;

        // 3. ACTIVO -> ANULADO
        let reversed = self
            .movement_repo
            .annul(&mut *tx, movement_id, user_id, reason)
            .await?
            .ok_or_else(|| AppError::AlreadyReversed {
                movement_id,
                annulled_by: None,
                annulled_at: None,
                reason: None,
            })?;

        tx.commit().await?;

        tracing::info!(
            movement_id,
            adjustment_id = adjustment.movement.id,
            user_id = %user_id,
            balance_after = adjustment.movement.balance_after,
            "Movimentação anulada"
        );

        Ok(ReversalOutcome {
            reversed,
            adjustment: adjustment.movement,
            alerts: adjustment.alerts,
        })
    }
}
