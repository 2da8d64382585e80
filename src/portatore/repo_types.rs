use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Responder profile, one-to-one with a user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Portatore {
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Portatore joined with the owning user's public fields.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PortatoreProfile {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub bio: Option<String>,
    pub active: bool,
}
