use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::portatore::repo_types::{Portatore, PortatoreProfile};
use crate::store::PgStore;

#[async_trait]
pub trait PortatoreRepo: Send + Sync {
    async fn find_portatore(&self, user_id: Uuid) -> anyhow::Result<Option<Portatore>>;
    async fn list_active_portatori(&self) -> anyhow::Result<Vec<PortatoreProfile>>;
    async fn upsert_portatore(
        &self,
        user_id: Uuid,
        bio: Option<String>,
        active: bool,
    ) -> anyhow::Result<Portatore>;
}

#[async_trait]
impl PortatoreRepo for PgStore {
    async fn find_portatore(&self, user_id: Uuid) -> anyhow::Result<Option<Portatore>> {
        sqlx::query_as::<_, Portatore>(
            "SELECT user_id, bio, active, created_at FROM portatori WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("find portatore")
    }

    async fn list_active_portatori(&self) -> anyhow::Result<Vec<PortatoreProfile>> {
        sqlx::query_as::<_, PortatoreProfile>(
            r#"
            SELECT p.user_id, u.display_name, u.email, p.bio, p.active
              FROM portatori p
              JOIN users u ON u.id = p.user_id
             WHERE p.active
             ORDER BY u.display_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("list active portatori")
    }

    async fn upsert_portatore(
        &self,
        user_id: Uuid,
        bio: Option<String>,
        active: bool,
    ) -> anyhow::Result<Portatore> {
        sqlx::query_as::<_, Portatore>(
            r#"
            INSERT INTO portatori (user_id, bio, active)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
               SET bio = COALESCE(EXCLUDED.bio, portatori.bio),
                   active = EXCLUDED.active
            RETURNING user_id, bio, active, created_at
            "#,
        )
        .bind(user_id)
        .bind(bio)
        .bind(active)
        .fetch_one(&self.pool)
        .await
        .context("upsert portatore")
    }
}
