use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ucme::repo_types::{Ucme, UcmeStatus};

pub const CONTENT_MIN_CHARS: usize = 20;
pub const CONTENT_MAX_CHARS: usize = 600;
pub const RESPONSE_MAX_CHARS: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct SubmitUcmeRequest {
    pub content: String,
    pub email: String,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub school_code: Option<String>,
}

/// Entry as shown to responders and school staff: no author identity.
#[derive(Debug, Serialize)]
pub struct UcmeView {
    pub id: Uuid,
    pub content: String,
    pub tone: Option<String>,
    pub school_code: Option<String>,
    pub status: UcmeStatus,
    pub portatore_id: Option<Uuid>,
    pub response: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub responded_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Ucme> for UcmeView {
    fn from(u: Ucme) -> Self {
        Self {
            id: u.id,
            content: u.content,
            tone: u.tone,
            school_code: u.school_code,
            status: u.status,
            portatore_id: u.portatore_id,
            response: u.response,
            responded_at: u.responded_at,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UcmeList<T: Serialize> {
    pub items: Vec<T>,
}

impl<T: Serialize> UcmeList<T> {
    pub fn from_entries<U: Into<T>>(rows: Vec<U>) -> Self {
        Self {
            items: rows.into_iter().map(Into::into).collect(),
        }
    }
}
