// src/db/movement_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::{
        inventory::{InventoryKey, NewMovement, StockMovement},
        kardex::{KardexFilter, PageRequest},
    },
};

#[derive(Clone)]
pub struct MovementRepository {
    pool: PgPool,
}

impl MovementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ESCRITA (sempre dentro da transação do chamador)
    // =========================================================================

    pub async fn insert_movement<'e, E>(
        &self,
        executor: E,
        request: &NewMovement,
        key: &InventoryKey,
        balance_before: i32,
        balance_after: i32,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (
                product_id, warehouse_id, country, lot, movement_type, reason,
                quantity, expiration_date, balance_before, balance_after,
                user_id, reference_document, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
            .bind(key.product_id)
            .bind(key.warehouse_id)
            .bind(&key.country)
            .bind(request.lot_value())
            .bind(request.movement_type)
            .bind(request.reason)
            .bind(request.quantity)
            .bind(request.expiration_date)
            .bind(balance_before)
            .bind(balance_after)
            .bind(request.user_id)
            .bind(request.reference_document.as_deref())
            .bind(request.notes.as_deref())
            .fetch_one(executor)
            .await?;

        Ok(movement)
    }

    /// Liga as duas pernas de uma transferência (uma aponta para a outra).
    pub async fn link_transfer_legs<'e, E>(
        &self,
        executor: E,
        egress_id: i64,
        ingress_id: i64,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE stock_movements
            SET related_movement_id = CASE WHEN id = $1 THEN $2 ELSE $1 END
            WHERE id IN ($1, $2)
            "#,
        )
            .bind(egress_id)
            .bind(ingress_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Busca e trava a linha até o fim da transação (check-then-set da anulação).
    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        movement_id: i64,
    ) -> Result<Option<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            "SELECT * FROM stock_movements WHERE id = $1 FOR UPDATE",
        )
            .bind(movement_id)
            .fetch_optional(executor)
            .await?;

        Ok(movement)
    }

    /// ACTIVO -> ANULADO. Retorna None se a linha já não estava ativa.
    pub async fn annul<'e, E>(
        &self,
        executor: E,
        movement_id: i64,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Option<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            UPDATE stock_movements
            SET status = 'ANULADO',
                annulled_by = $2,
                annulled_at = NOW(),
                annulment_reason = $3
            WHERE id = $1 AND status = 'ACTIVO'
            RETURNING *
            "#,
        )
            .bind(movement_id)
            .bind(user_id)
            .bind(reason)
            .fetch_optional(executor)
            .await?;

        Ok(movement)
    }

    // =========================================================================
    //  LEITURA (kardex)
    // =========================================================================

    pub async fn find_by_id(&self, movement_id: i64) -> Result<Option<StockMovement>, AppError> {
        let movement = sqlx::query_as::<_, StockMovement>("SELECT * FROM stock_movements WHERE id = $1")
            .bind(movement_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(movement)
    }

    pub async fn kardex(
        &self,
        filter: &KardexFilter,
        page: &PageRequest,
    ) -> Result<(Vec<StockMovement>, i64), AppError> {
        // Snapshot consistente entre contagem e página
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut count_query = build_kardex_count(filter);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&mut *tx)
            .await?;

        let mut page_query = build_kardex_query(filter, page);
        let items = page_query
            .build_query_as::<StockMovement>()
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((items, total))
    }
}

fn push_kardex_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &KardexFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(product_id) = filter.product_id {
        builder.push(" AND product_id = ").push_bind(product_id);
    }
    if let Some(warehouse_id) = filter.warehouse_id {
        builder.push(" AND warehouse_id = ").push_bind(warehouse_id);
    }
    if let Some(country) = filter.country.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        builder.push(" AND country = ").push_bind(country.to_uppercase());
    }
    if let Some(movement_type) = filter.movement_type {
        builder.push(" AND movement_type = ").push_bind(movement_type);
    }
    if let Some(reason) = filter.reason {
        builder.push(" AND reason = ").push_bind(reason);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(reference) = filter.reference_document.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        builder
            .push(" AND reference_document ILIKE ")
            .push_bind(format!("%{}%", escape_like(reference)));
    }
    if let Some(date_from) = filter.date_from {
        builder.push(" AND created_at::date >= ").push_bind(date_from);
    }
    if let Some(date_to) = filter.date_to {
        builder.push(" AND created_at::date <= ").push_bind(date_to);
    }
    if let Some(status) = filter.status.as_status() {
        builder.push(" AND status = ").push_bind(status);
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub(crate) fn build_kardex_query(filter: &KardexFilter, page: &PageRequest) -> QueryBuilder<'static, Postgres> {
    let (_, page_size) = page.normalized();

    let mut builder = QueryBuilder::new("SELECT * FROM stock_movements");
    push_kardex_filters(&mut builder, filter);
    // id desempata movimentos com o mesmo created_at (ordem estável)
    builder.push(" ORDER BY created_at DESC, id DESC");
    builder.push(" LIMIT ").push_bind(page_size);
    builder.push(" OFFSET ").push_bind(page.offset());
    builder
}

pub(crate) fn build_kardex_count(filter: &KardexFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*)::BIGINT FROM stock_movements");
    push_kardex_filters(&mut builder, filter);
    builder
}
