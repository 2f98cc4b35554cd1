// src/services/kardex_service.rs

use crate::{
    common::error::AppError,
    db::{InventoryRepository, MovementRepository},
    models::{
        inventory::StockMovement,
        kardex::{KardexFilter, KardexPage, PageRequest, StockReportFilter, StockReportPage, StockReportRow},
    },
};

/// Consultas de leitura: histórico do kardex e relatório de saldos atuais.
#[derive(Clone)]
pub struct KardexService {
    movement_repo: MovementRepository,
    inventory_repo: InventoryRepository,
}

impl KardexService {
    pub fn new(movement_repo: MovementRepository, inventory_repo: InventoryRepository) -> Self {
        Self {
            movement_repo,
            inventory_repo,
        }
    }

    pub async fn query(&self, filter: &KardexFilter, page: &PageRequest) -> Result<KardexPage, AppError> {
        let (page_number, page_size) = page.normalized();
        let (items, total) = self.movement_repo.kardex(filter, page).await?;

        Ok(KardexPage {
            items,
            total,
            page: page_number,
            page_size,
        })
    }

    pub async fn get_movement(&self, movement_id: i64) -> Result<StockMovement, AppError> {
        self.movement_repo
            .find_by_id(movement_id)
            .await?
            .ok_or(AppError::MovementNotFound(movement_id))
    }

    /// Saldos atuais agrupados por bodega, com o rótulo NORMAL / BAJO / CRITICO.
    pub async fn stock_report(
        &self,
        filter: &StockReportFilter,
        page: &PageRequest,
    ) -> Result<StockReportPage, AppError> {
        let (page_number, page_size) = page.normalized();
        let (rows, total) = self.inventory_repo.stock_report(filter, page).await?;

        Ok(StockReportPage {
            items: rows.into_iter().map(StockReportRow::from).collect(),
            total,
            page: page_number,
            page_size,
        })
    }
}
