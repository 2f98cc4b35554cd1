// src/db/inventory_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use crate::{
    common::error::AppError,
    models::{
        inventory::{normalize_lot, InventoryKey, InventoryRecord, Product},
        kardex::{PageRequest, StockAggregate, StockReportFilter},
    },
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Produtos (somente leitura)
    // ---

    pub async fn find_product<'e, E>(
        &self,
        executor: E,
        product_id: i64,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, unit_price, stock_minimo, stock_critico,
                   requiere_lote, requiere_vencimiento
            FROM products
            WHERE id = $1
            "#,
        )
            .bind(product_id)
            .fetch_optional(executor)
            .await?;

        Ok(product)
    }

    // ---
    // Saldos
    // ---

    /// Quantidade em mãos. Com `lot` filtra o lote exato; sem `lot` soma todos os lotes da bodega.
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
        let lot_filter = lot.map(|l| normalize_lot(Some(l)));

        let balance: i32 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(COALESCE(quantity, 0)), 0)::INTEGER
            FROM inventory_records
            WHERE product_id = $1
              AND warehouse_id = $2
              AND country = $3
              AND ($4::TEXT IS NULL OR lot = $4)
            "#,
        )
            .bind(product_id)
            .bind(warehouse_id)
            .bind(country.trim().to_uppercase())
            .bind(lot_filter)
            .fetch_one(executor)
            .await?;

        Ok(balance)
    }

    pub async fn find_record<'e, E>(
        &self,
        executor: E,
        key: &InventoryKey,
    ) -> Result<Option<InventoryRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            SELECT * FROM inventory_records
            WHERE product_id = $1 AND warehouse_id = $2 AND country = $3 AND lot = $4
            "#,
        )
            .bind(key.product_id)
            .bind(key.warehouse_id)
            .bind(&key.country)
            .bind(&key.lot)
            .fetch_optional(executor)
            .await?;

        Ok(record)
    }

    /// Grava o novo saldo da chave. Cria o registro se ainda não existir.
    /// A validade existente é preservada; só é preenchida quando estava vazia.
    pub async fn upsert_record<'e, E>(
        &self,
        executor: E,
        key: &InventoryKey,
        quantity: i32,
        expiration_date: Option<NaiveDate>,
    ) -> Result<InventoryRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            INSERT INTO inventory_records (product_id, warehouse_id, country, lot, quantity, expiration_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ON CONSTRAINT inventory_records_key
            DO UPDATE SET
                quantity = EXCLUDED.quantity,
                expiration_date = COALESCE(inventory_records.expiration_date, EXCLUDED.expiration_date),
                updated_at = NOW()
            RETURNING *
            "#,
        )
            .bind(key.product_id)
            .bind(key.warehouse_id)
            .bind(&key.country)
            .bind(&key.lot)
            .bind(quantity)
            .bind(expiration_date)
            .fetch_one(executor)
            .await?;

        Ok(record)
    }

    /// Saldo zerado ou negativo não fica materializado.
    pub async fn delete_record<'e, E>(
        &self,
        executor: E,
        key: &InventoryKey,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM inventory_records
            WHERE product_id = $1 AND warehouse_id = $2 AND country = $3 AND lot = $4
            "#,
        )
            .bind(key.product_id)
            .bind(key.warehouse_id)
            .bind(&key.country)
            .bind(&key.lot)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // ---
    // Relatório de saldos (leitura, usa a pool principal)
    // ---

    pub async fn stock_report(
        &self,
        filter: &StockReportFilter,
        page: &PageRequest,
    ) -> Result<(Vec<StockAggregate>, i64), AppError> {
        let mut count_query = build_stock_report_count(filter);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut rows_query = build_stock_report_query(filter, page);
        let rows = rows_query
            .build_query_as::<StockAggregate>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }
}

fn push_stock_report_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &StockReportFilter) {
    builder.push(" WHERE COALESCE(r.quantity, 0) > 0");

    if let Some(product_id) = filter.product_id {
        builder.push(" AND r.product_id = ").push_bind(product_id);
    }
    if let Some(warehouse_id) = filter.warehouse_id {
        builder.push(" AND r.warehouse_id = ").push_bind(warehouse_id);
    }
    if let Some(country) = filter.country.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        builder.push(" AND r.country = ").push_bind(country.to_uppercase());
    }
}

pub(crate) fn build_stock_report_query(
    filter: &StockReportFilter,
    page: &PageRequest,
) -> QueryBuilder<'static, Postgres> {
    let (_, page_size) = page.normalized();

    let mut builder = QueryBuilder::new(
        r#"SELECT r.product_id, p.name AS product_name, r.warehouse_id, r.country,
               SUM(COALESCE(r.quantity, 0))::BIGINT AS total_quantity,
               COUNT(*)::BIGINT AS lot_count,
               MIN(r.expiration_date) AS nearest_expiration,
               p.stock_minimo, p.stock_critico
        FROM inventory_records r
        JOIN products p ON p.id = r.product_id"#,
    );
    push_stock_report_filters(&mut builder, filter);
    builder.push(
        " GROUP BY r.product_id, p.name, r.warehouse_id, r.country, p.stock_minimo, p.stock_critico",
    );
    builder.push(" ORDER BY r.warehouse_id ASC, p.name ASC, r.country ASC");
    builder.push(" LIMIT ").push_bind(page_size);
    builder.push(" OFFSET ").push_bind(page.offset());
    builder
}

pub(crate) fn build_stock_report_count(filter: &StockReportFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT COUNT(*)::BIGINT FROM (SELECT 1 FROM inventory_records r",
    );
    push_stock_report_filters(&mut builder, filter);
    builder.push(" GROUP BY r.product_id, r.warehouse_id, r.country) grouped");
    builder
}
