use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Open,
    Requested,
    Accepted,
    Rejected,
}

impl ChatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatStatus::Open => "open",
            ChatStatus::Requested => "requested",
            ChatStatus::Accepted => "accepted",
            ChatStatus::Rejected => "rejected",
        }
    }

    pub fn accepts_messages(&self) -> bool {
        matches!(self, ChatStatus::Open | ChatStatus::Accepted)
    }
}

impl FromStr for ChatStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ChatStatus::Open),
            "requested" => Ok(ChatStatus::Requested),
            "accepted" => Ok(ChatStatus::Accepted),
            "rejected" => Ok(ChatStatus::Rejected),
            other => anyhow::bail!("unknown chat status {other:?}"),
        }
    }
}

/// Which side of the conversation wrote a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Utente,
    Portatore,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::Utente => "utente",
            SenderRole::Portatore => "portatore",
        }
    }
}

impl FromStr for SenderRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "utente" => Ok(SenderRole::Utente),
            "portatore" => Ok(SenderRole::Portatore),
            other => anyhow::bail!("unknown sender role {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Chat {
    pub id: Uuid,
    pub ucme_id: Uuid,
    pub status: ChatStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct ChatRow {
    pub id: Uuid,
    pub ucme_id: Uuid,
    pub status: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<ChatRow> for Chat {
    type Error = anyhow::Error;

    fn try_from(r: ChatRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            ucme_id: r.ucme_id,
            status: r.status.parse()?,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: SenderRole,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct ChatMessageRow {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = anyhow::Error;

    fn try_from(r: ChatMessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            chat_id: r.chat_id,
            sender_id: r.sender_id,
            sender_role: r.sender_role.parse()?,
            body: r.body,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: SenderRole,
    pub body: String,
}
