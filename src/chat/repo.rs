use anyhow::Context;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::chat::repo_types::{Chat, ChatMessage, ChatMessageRow, ChatRow, ChatStatus, NewMessage};
use crate::store::PgStore;

#[async_trait]
pub trait ChatRepo: Send + Sync {
    async fn find_chat_by_ucme(&self, ucme_id: Uuid) -> anyhow::Result<Option<Chat>>;
    /// Creates the chat for an entry, or returns the existing one with `false`.
    async fn create_chat(&self, ucme_id: Uuid, status: ChatStatus)
        -> anyhow::Result<(Chat, bool)>;
    async fn set_chat_status(&self, chat_id: Uuid, status: ChatStatus)
        -> anyhow::Result<Option<Chat>>;
    /// Messages in creation order; `after` keeps only strictly newer ones.
    async fn list_messages(
        &self,
        chat_id: Uuid,
        after: Option<OffsetDateTime>,
    ) -> anyhow::Result<Vec<ChatMessage>>;
    async fn insert_message(&self, new: NewMessage) -> anyhow::Result<ChatMessage>;
}

#[async_trait]
impl ChatRepo for PgStore {
    async fn find_chat_by_ucme(&self, ucme_id: Uuid) -> anyhow::Result<Option<Chat>> {
        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT id, ucme_id, status, created_at FROM chats WHERE ucme_id = $1",
        )
        .bind(ucme_id)
        .fetch_optional(&self.pool)
        .await
        .context("find chat")?;
        row.map(Chat::try_from).transpose()
    }

    async fn create_chat(
        &self,
        ucme_id: Uuid,
        status: ChatStatus,
    ) -> anyhow::Result<(Chat, bool)> {
        let inserted = sqlx::query_as::<_, ChatRow>(
            r#"
            INSERT INTO chats (ucme_id, status)
            VALUES ($1, $2)
            ON CONFLICT (ucme_id) DO NOTHING
            RETURNING id, ucme_id, status, created_at
            "#,
        )
        .bind(ucme_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("insert chat")?;

        if let Some(row) = inserted {
            return Ok((row.try_into()?, true));
        }
        let existing = self
            .find_chat_by_ucme(ucme_id)
            .await?
            .context("chat vanished after conflict")?;
        Ok((existing, false))
    }

    async fn set_chat_status(
        &self,
        chat_id: Uuid,
        status: ChatStatus,
    ) -> anyhow::Result<Option<Chat>> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            UPDATE chats SET status = $2
             WHERE id = $1
            RETURNING id, ucme_id, status, created_at
            "#,
        )
        .bind(chat_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("update chat status")?;
        row.map(Chat::try_from).transpose()
    }

    async fn list_messages(
        &self,
        chat_id: Uuid,
        after: Option<OffsetDateTime>,
    ) -> anyhow::Result<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            SELECT id, chat_id, sender_id, sender_role, body, created_at
              FROM chat_messages
             WHERE chat_id = $1 AND ($2::timestamptz IS NULL OR created_at > $2)
             ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(chat_id)
        .bind(after)
        .fetch_all(&self.pool)
        .await
        .context("list chat messages")?;
        rows.into_iter().map(ChatMessage::try_from).collect()
    }

    async fn insert_message(&self, new: NewMessage) -> anyhow::Result<ChatMessage> {
        let row = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            INSERT INTO chat_messages (chat_id, sender_id, sender_role, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, chat_id, sender_id, sender_role, body, created_at
            "#,
        )
        .bind(new.chat_id)
        .bind(new.sender_id)
        .bind(new.sender_role.as_str())
        .bind(&new.body)
        .fetch_one(&self.pool)
        .await
        .context("insert chat message")?;
        row.try_into()
    }
}
