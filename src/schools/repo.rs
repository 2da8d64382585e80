use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::FromRow;

use crate::store::PgStore;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct School {
    pub code: String,
    pub name: String,
}

#[async_trait]
pub trait SchoolRepo: Send + Sync {
    async fn list_schools(&self) -> anyhow::Result<Vec<School>>;
    async fn find_school(&self, code: &str) -> anyhow::Result<Option<School>>;
    /// Returns `None` when the code is taken.
    async fn create_school(&self, code: &str, name: &str) -> anyhow::Result<Option<School>>;
}

#[async_trait]
impl SchoolRepo for PgStore {
    async fn list_schools(&self) -> anyhow::Result<Vec<School>> {
        sqlx::query_as::<_, School>("SELECT code, name FROM schools ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .context("list schools")
    }

    async fn find_school(&self, code: &str) -> anyhow::Result<Option<School>> {
        sqlx::query_as::<_, School>("SELECT code, name FROM schools WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .context("find school")
    }

    async fn create_school(&self, code: &str, name: &str) -> anyhow::Result<Option<School>> {
        sqlx::query_as::<_, School>(
            r#"
            INSERT INTO schools (code, name)
            VALUES ($1, $2)
            ON CONFLICT (code) DO NOTHING
            RETURNING code, name
            "#,
        )
        .bind(code)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("insert school")
    }
}
