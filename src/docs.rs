// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- INVENTORY ---
        handlers::inventory::register_movement,
        handlers::inventory::transfer,
        handlers::inventory::reverse_movement,
        handlers::inventory::get_balance,

        // --- KARDEX ---
        handlers::kardex::query_kardex,
        handlers::kardex::get_movement,
        handlers::kardex::stock_report,

        // --- ALERTS ---
        handlers::alerts::list_alerts,
        handlers::alerts::mark_alert_read,
    ),
    components(
        schemas(
            // --- Inventory ---
            models::inventory::Product,
            models::inventory::InventoryKey,
            models::inventory::InventoryRecord,
            models::inventory::MovementType,
            models::inventory::MovementReason,
            models::inventory::MovementStatus,
            models::inventory::StockMovement,
            models::inventory::MovementOutcome,
            models::inventory::TransferOutcome,
            models::inventory::ReversalOutcome,
            models::inventory::BalanceView,

            // --- Kardex ---
            models::kardex::KardexStatusFilter,
            models::kardex::KardexPage,
            models::kardex::StockState,
            models::kardex::StockReportRow,
            models::kardex::StockReportPage,

            // --- Alerts ---
            models::alerts::AlertType,
            models::alerts::AlertLevel,
            models::alerts::StockAlert,

            // --- Payloads ---
            handlers::inventory::RegisterMovementPayload,
            handlers::inventory::TransferPayload,
            handlers::inventory::ReversePayload,
        )
    ),
    tags(
        (name = "Inventory", description = "Movimentações, Transferências e Anulações"),
        (name = "Kardex", description = "Histórico e Relatório de Saldos"),
        (name = "Alerts", description = "Alertas de Estoque e Vencimento")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
