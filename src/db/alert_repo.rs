// src/db/alert_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::{
        alerts::{AlertFilter, NewAlert, StockAlert},
        kardex::PageRequest,
    },
};

#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_alert<'e, E>(
        &self,
        executor: E,
        alert: &NewAlert,
    ) -> Result<StockAlert, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let saved = sqlx::query_as::<_, StockAlert>(
            r#"
            INSERT INTO stock_alerts (
                product_id, warehouse_id, country, alert_type, level, message, stock_snapshot
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
            .bind(alert.product_id)
            .bind(alert.warehouse_id)
            .bind(&alert.country)
            .bind(alert.alert_type)
            .bind(alert.level)
            .bind(&alert.message)
            .bind(alert.stock_snapshot)
            .fetch_one(executor)
            .await?;

        Ok(saved)
    }

    pub async fn list_alerts(
        &self,
        filter: &AlertFilter,
        page: &PageRequest,
    ) -> Result<Vec<StockAlert>, AppError> {
        let (_, page_size) = page.normalized();

        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM stock_alerts WHERE 1 = 1");
        if let Some(product_id) = filter.product_id {
            builder.push(" AND product_id = ").push_bind(product_id);
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            builder.push(" AND warehouse_id = ").push_bind(warehouse_id);
        }
        if let Some(alert_type) = filter.alert_type {
            builder.push(" AND alert_type = ").push_bind(alert_type);
        }
        if filter.unread_only {
            builder.push(" AND is_read = FALSE");
        }
        builder.push(" ORDER BY created_at DESC, id DESC");
        builder.push(" LIMIT ").push_bind(page_size);
        builder.push(" OFFSET ").push_bind(page.offset());

        let alerts = builder
            .build_query_as::<StockAlert>()
            .fetch_all(&self.pool)
            .await?;

        Ok(alerts)
    }

    /// Marca como lido. Quem leu primeiro fica registrado.
    pub async fn mark_as_read(
        &self,
        alert_id: i64,
        user_id: Uuid,
    ) -> Result<Option<StockAlert>, AppError> {
        let alert = sqlx::query_as::<_, StockAlert>(
            r#"
            UPDATE stock_alerts
            SET is_read = TRUE,
                read_by = COALESCE(read_by, $2),
                read_at = COALESCE(read_at, NOW())
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(alert_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(alert)
    }
}
