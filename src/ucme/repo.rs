use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::store::PgStore;
use crate::ucme::repo_types::{AssignOutcome, NewUcme, Ucme, UcmeRow, UcmeStatus};

const UCME_COLUMNS: &str = "id, user_id, email, content, tone, school_code, status, \
                            portatore_id, response, responded_at, response_read, created_at";

#[async_trait]
pub trait UcmeRepo: Send + Sync {
    async fn insert_ucme(&self, new: NewUcme) -> anyhow::Result<Ucme>;
    async fn find_ucme(&self, id: Uuid) -> anyhow::Result<Option<Ucme>>;
    /// Oldest first, so the queue is worked in arrival order.
    async fn list_unassigned(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Ucme>>;
    async fn list_by_portatore(&self, portatore_id: Uuid) -> anyhow::Result<Vec<Ucme>>;
    /// Entries written by the user, including anonymous ones sent with their email.
    async fn list_by_author(&self, user_id: Uuid, email: &str) -> anyhow::Result<Vec<Ucme>>;
    async fn list_by_school(
        &self,
        school_code: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Ucme>>;
    async fn count_by_status(&self, school_code: &str) -> anyhow::Result<Vec<(UcmeStatus, i64)>>;
    /// Single conditional update: only succeeds while unassigned unless `force`.
    async fn assign(&self, id: Uuid, portatore_id: Uuid, force: bool)
        -> anyhow::Result<AssignOutcome>;
    async fn set_status(
        &self,
        id: Uuid,
        portatore_id: Uuid,
        status: UcmeStatus,
    ) -> anyhow::Result<Option<Ucme>>;
    async fn set_response(
        &self,
        id: Uuid,
        portatore_id: Uuid,
        text: &str,
    ) -> anyhow::Result<Option<Ucme>>;
    async fn mark_response_read(&self, id: Uuid) -> anyhow::Result<Option<Ucme>>;
}

fn decode_all(rows: Vec<UcmeRow>) -> anyhow::Result<Vec<Ucme>> {
    rows.into_iter().map(Ucme::try_from).collect()
}

#[async_trait]
impl UcmeRepo for PgStore {
    async fn insert_ucme(&self, new: NewUcme) -> anyhow::Result<Ucme> {
        let row = sqlx::query_as::<_, UcmeRow>(&format!(
            r#"
            INSERT INTO ucme (user_id, email, content, tone, school_code, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {UCME_COLUMNS}
            "#
        ))
        .bind(new.user_id)
        .bind(&new.email)
        .bind(&new.content)
        .bind(&new.tone)
        .bind(&new.school_code)
        .bind(UcmeStatus::Ricevuta.as_str())
        .fetch_one(&self.pool)
        .await
        .context("insert ucme")?;
        row.try_into()
    }

    async fn find_ucme(&self, id: Uuid) -> anyhow::Result<Option<Ucme>> {
        let row = sqlx::query_as::<_, UcmeRow>(&format!(
            "SELECT {UCME_COLUMNS} FROM ucme WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find ucme")?;
        row.map(Ucme::try_from).transpose()
    }

    async fn list_unassigned(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Ucme>> {
        let rows = sqlx::query_as::<_, UcmeRow>(&format!(
            r#"
            SELECT {UCME_COLUMNS}
              FROM ucme
             WHERE portatore_id IS NULL
             ORDER BY created_at ASC
             LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("list unassigned ucme")?;
        decode_all(rows)
    }

    async fn list_by_portatore(&self, portatore_id: Uuid) -> anyhow::Result<Vec<Ucme>> {
        let rows = sqlx::query_as::<_, UcmeRow>(&format!(
            r#"
            SELECT {UCME_COLUMNS}
              FROM ucme
             WHERE portatore_id = $1
             ORDER BY created_at DESC
            "#
        ))
        .bind(portatore_id)
        .fetch_all(&self.pool)
        .await
        .context("list ucme by portatore")?;
        decode_all(rows)
    }

    async fn list_by_author(&self, user_id: Uuid, email: &str) -> anyhow::Result<Vec<Ucme>> {
        let rows = sqlx::query_as::<_, UcmeRow>(&format!(
            r#"
            SELECT {UCME_COLUMNS}
              FROM ucme
             WHERE user_id = $1 OR (user_id IS NULL AND email = $2)
             ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .context("list ucme by author")?;
        decode_all(rows)
    }

    async fn list_by_school(
        &self,
        school_code: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Ucme>> {
        let rows = sqlx::query_as::<_, UcmeRow>(&format!(
            r#"
            SELECT {UCME_COLUMNS}
              FROM ucme
             WHERE school_code = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3
            "#
        ))
        .bind(school_code)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("list ucme by school")?;
        decode_all(rows)
    }

    async fn count_by_status(&self, school_code: &str) -> anyhow::Result<Vec<(UcmeStatus, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*)
              FROM ucme
             WHERE school_code = $1
             GROUP BY status
            "#,
        )
        .bind(school_code)
        .fetch_all(&self.pool)
        .await
        .context("count ucme by status")?;
        rows.into_iter()
            .map(|(status, n)| Ok((status.parse()?, n)))
            .collect()
    }

    async fn assign(
        &self,
        id: Uuid,
        portatore_id: Uuid,
        force: bool,
    ) -> anyhow::Result<AssignOutcome> {
        let row = sqlx::query_as::<_, UcmeRow>(&format!(
            r#"
            UPDATE ucme
               SET portatore_id = $2
             WHERE id = $1 AND ($3 OR portatore_id IS NULL)
            RETURNING {UCME_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(portatore_id)
        .bind(force)
        .fetch_optional(&self.pool)
        .await
        .context("assign ucme")?;

        match row {
            Some(r) => Ok(AssignOutcome::Assigned(r.try_into()?)),
            None if self.find_ucme(id).await?.is_some() => Ok(AssignOutcome::AlreadyAssigned),
            None => Ok(AssignOutcome::NotFound),
        }
    }

    async fn set_status(
        &self,
        id: Uuid,
        portatore_id: Uuid,
        status: UcmeStatus,
    ) -> anyhow::Result<Option<Ucme>> {
        let row = sqlx::query_as::<_, UcmeRow>(&format!(
            r#"
            UPDATE ucme
               SET status = $3
             WHERE id = $1 AND portatore_id = $2
            RETURNING {UCME_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(portatore_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("update ucme status")?;
        row.map(Ucme::try_from).transpose()
    }

    async fn set_response(
        &self,
        id: Uuid,
        portatore_id: Uuid,
        text: &str,
    ) -> anyhow::Result<Option<Ucme>> {
        let row = sqlx::query_as::<_, UcmeRow>(&format!(
            r#"
            UPDATE ucme
               SET response = $3, responded_at = now(), response_read = FALSE
             WHERE id = $1 AND portatore_id = $2
            RETURNING {UCME_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(portatore_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await
        .context("store ucme response")?;
        row.map(Ucme::try_from).transpose()
    }

    async fn mark_response_read(&self, id: Uuid) -> anyhow::Result<Option<Ucme>> {
        let row = sqlx::query_as::<_, UcmeRow>(&format!(
            r#"
            UPDATE ucme
               SET response_read = TRUE
             WHERE id = $1
            RETURNING {UCME_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("mark ucme read")?;
        row.map(Ucme::try_from).transpose()
    }
}
