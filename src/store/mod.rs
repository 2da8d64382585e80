use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::auth::repo::UserRepo;
use crate::chat::repo::ChatRepo;
use crate::config::AppConfig;
use crate::portatore::repo::PortatoreRepo;
use crate::schools::repo::SchoolRepo;
use crate::ucme::repo::UcmeRepo;

#[cfg(test)]
pub mod memory;

/// Everything a handler may ask of persistence.
#[async_trait]
pub trait Store: UserRepo + SchoolRepo + PortatoreRepo + UcmeRepo + ChatRepo {
    /// Cheap round trip used by the health check.
    async fn ping(&self) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("ping database")?;
        Ok(())
    }
}
