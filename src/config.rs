// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{AlertRepository, InventoryRepository, MovementRepository},
    services::{
        alert_service::AlertService, auth::AuthService, inventory_service::InventoryService,
        kardex_service::KardexService, reversal_service::ReversalService,
        transfer_service::TransferService,
    },
};

/// Configuração lida do ambiente (.env é carregado antes).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub db_max_connections: u32,
    pub expiry_warning_days: i64,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        Ok(Self {
            database_url,
            jwt_secret,
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            expiry_warning_days: parse_var("EXPIRY_WARNING_DAYS", 30)?,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub inventory_service: InventoryService,
    pub transfer_service: TransferService,
    pub reversal_service: ReversalService,
    pub kardex_service: KardexService,
    pub alert_service: AlertService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, settings))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_pool(db_pool: PgPool, settings: &Settings) -> Self {
        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let movement_repo = MovementRepository::new(db_pool.clone());
        let alert_repo = AlertRepository::new(db_pool.clone());

        let inventory_service = InventoryService::new(
            inventory_repo.clone(),
            movement_repo.clone(),
            alert_repo.clone(),
            settings.expiry_warning_days,
        );

        Self {
            auth_service: AuthService::new(settings.jwt_secret.clone()),
            transfer_service: TransferService::new(inventory_service.clone(), movement_repo.clone()),
            reversal_service: ReversalService::new(inventory_service.clone(), movement_repo.clone()),
            kardex_service: KardexService::new(movement_repo, inventory_repo),
            alert_service: AlertService::new(alert_repo),
            inventory_service,
            db_pool,
        }
    }
}
