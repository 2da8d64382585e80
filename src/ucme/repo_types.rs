use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle of an entry. The wire and storage strings are the Italian labels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UcmeStatus {
    #[serde(rename = "ricevuta")]
    Ricevuta,
    #[serde(rename = "in lavorazione")]
    InLavorazione,
    #[serde(rename = "completata")]
    Completata,
    #[serde(rename = "richiesta supporto")]
    RichiestaSupporto,
}

impl UcmeStatus {
    pub const ALL: [UcmeStatus; 4] = [
        UcmeStatus::Ricevuta,
        UcmeStatus::InLavorazione,
        UcmeStatus::Completata,
        UcmeStatus::RichiestaSupporto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UcmeStatus::Ricevuta => "ricevuta",
            UcmeStatus::InLavorazione => "in lavorazione",
            UcmeStatus::Completata => "completata",
            UcmeStatus::RichiestaSupporto => "richiesta supporto",
        }
    }

    /// Whether `self -> next` follows the forward path:
    /// ricevuta -> in lavorazione -> completata, with "richiesta supporto"
    /// reachable from anywhere and able to go back to "in lavorazione".
    pub fn can_transition_to(self, next: UcmeStatus) -> bool {
        use UcmeStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Ricevuta, InLavorazione)
                | (InLavorazione, Completata)
                | (_, RichiestaSupporto)
                | (RichiestaSupporto, InLavorazione)
        )
    }
}

impl fmt::Display for UcmeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UcmeStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UcmeStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown status {s:?}"))
    }
}

/// An anonymous entry ("UCMe") and its assignment/response state.
#[derive(Debug, Clone, Serialize)]
pub struct Ucme {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub content: String,
    pub tone: Option<String>,
    pub school_code: Option<String>,
    pub status: UcmeStatus,
    pub portatore_id: Option<Uuid>,
    pub response: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub responded_at: Option<OffsetDateTime>,
    pub response_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct UcmeRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub content: String,
    pub tone: Option<String>,
    pub school_code: Option<String>,
    pub status: String,
    pub portatore_id: Option<Uuid>,
    pub response: Option<String>,
    pub responded_at: Option<OffsetDateTime>,
    pub response_read: bool,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UcmeRow> for Ucme {
    type Error = anyhow::Error;

    fn try_from(r: UcmeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            email: r.email,
            content: r.content,
            tone: r.tone,
            school_code: r.school_code,
            status: r.status.parse()?,
            portatore_id: r.portatore_id,
            response: r.response,
            responded_at: r.responded_at,
            response_read: r.response_read,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewUcme {
    pub user_id: Option<Uuid>,
    pub email: String,
    pub content: String,
    pub tone: Option<String>,
    pub school_code: Option<String>,
}

/// Result of the conditional assignment update.
#[derive(Debug)]
pub enum AssignOutcome {
    Assigned(Ucme),
    AlreadyAssigned,
    NotFound,
}
