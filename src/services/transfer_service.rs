// src/services/transfer_service.rs

use sqlx::{Acquire, Postgres};

use crate::{
    common::{db_utils::lock_inventory_keys, error::AppError},
    db::MovementRepository,
    models::inventory::{
        InventoryKey, MovementReason, MovementType, NewMovement, TransferOutcome, TransferRequest,
    },
    services::inventory_service::InventoryService,
};

/// Saída na origem + entrada no destino, ligadas entre si, numa transação só.
#[derive(Clone)]
pub struct TransferService {
    inventory_service: InventoryService,
    movement_repo: MovementRepository,
}

impl TransferService {
    pub fn new(inventory_service: InventoryService, movement_repo: MovementRepository) -> Self {
        Self {
            inventory_service,
            movement_repo,
        }
    }

    pub async fn transfer<'e, A>(
        &self,
        conn: A,
        request: TransferRequest,
    ) -> Result<TransferOutcome, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let origin_key = InventoryKey::new(
            request.product_id,
            request.origin_warehouse_id,
            &request.origin_country,
            request.lot.as_deref(),
        );
        let destination_key = InventoryKey::new(
            request.product_id,
            request.destination_warehouse_id,
            &request.destination_country,
            request.lot.as_deref(),
        );

        if origin_key == destination_key {
            return Err(AppError::SameLocationTransfer {
                warehouse_id: origin_key.warehouse_id,
                country: origin_key.country,
            });
        }

        let mut tx = conn.begin().await?;

        // As duas chaves em ordem fixa antes de qualquer perna
        lock_inventory_keys(&mut *tx, &[&origin_key, &destination_key]).await?;

        // Validade do lote na origem. Lida antes da saída: se a saída zerar o
        // saldo, o registro de origem deixa de existir.
        let inherited_expiration = match request.lot.as_deref() {
            Some(_) if request.expiration_date.is_none() => {
                self.inventory_service
                    .record_expiration(&mut *tx, &origin_key)
                    .await?
            }
            _ => None,
        };

        // 1. Saída na origem (valida saldo suficiente)
        let egress = self
            .inventory_service
            .register_movement(
                &mut *tx,
                NewMovement {
                    product_id: request.product_id,
                    warehouse_id: request.origin_warehouse_id,
                    country: request.origin_country.clone(),
                    lot: request.lot.clone(),
                    movement_type: MovementType::TransferenciaSalida,
                    reason: MovementReason::Transferencia,
                    quantity: request.quantity,
                    expiration_date: None,
                    user_id: request.user_id,
                    reference_document: request.reference_document.clone(),
                    notes: Some(format!(
                        "Transferência para bodega {} ({})",
                        destination_key.warehouse_id, destination_key.country
                    )),
                    allow_negative_stock: false,
                },
            )
            .await?;

        // 2. Entrada no destino, mesmo lote e quantidade
        let ingress = self
            .inventory_service
            .register_movement(
                &mut *tx,
                NewMovement {
                    product_id: request.product_id,
                    warehouse_id: request.destination_warehouse_id,
                    country: request.destination_country.clone(),
                    lot: request.lot.clone(),
                    movement_type: MovementType::TransferenciaIngreso,
                    reason: MovementReason::Transferencia,
                    quantity: request.quantity,
                    expiration_date: request.expiration_date.or(inherited_expiration),
                    user_id: request.user_id,
                    reference_document: request.reference_document.clone(),
                    notes: Some(format!(
                        "Transferência da bodega {} ({})",
                        origin_key.warehouse_id, origin_key.country
                    )),
                    allow_negative_stock: false,
                },
            )
            .await?;

        // 3. Liga as pernas
        let mut egress_movement = egress.movement;
        let mut ingress_movement = ingress.movement;
        self.movement_repo
            .link_transfer_legs(&mut *tx, egress_movement.id, ingress_movement.id)
            .await?;
        egress_movement.related_movement_id = Some(ingress_movement.id);
        ingress_movement.related_movement_id = Some(egress_movement.id);

        tx.commit().await?;

        tracing::info!(
            product_id = request.product_id,
            origin_warehouse_id = origin_key.warehouse_id,
            destination_warehouse_id = destination_key.warehouse_id,
            quantity = request.quantity,
            egress_id = egress_movement.id,
            ingress_id = ingress_movement.id,
            "Transferência concluída"
        );

        let mut alerts = egress.alerts;
        alerts.extend(ingress.alerts);

        Ok(TransferOutcome {
            egress: egress_movement,
            ingress: ingress_movement,
            alerts,
        })
    }
}
