//! Ownership and status rules for the responder side of an entry.

use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::ucme::repo_types::{Ucme, UcmeStatus};

/// Parses a wire status; anything outside the four labels is a validation error.
pub fn parse_status(raw: &str) -> Result<UcmeStatus, AppError> {
    raw.trim().parse().map_err(|_| {
        AppError::validation(format!(
            "Invalid status {raw:?}; expected one of: {}",
            UcmeStatus::ALL.map(|s| s.as_str()).join(", ")
        ))
    })
}

/// Missing entry is 404; an entry assigned to someone else is 403.
pub fn ensure_owned(ucme: Option<Ucme>, portatore_id: Uuid) -> Result<Ucme, AppError> {
    let ucme = ucme.ok_or_else(|| AppError::not_found("UCMe not found"))?;
    if ucme.portatore_id != Some(portatore_id) {
        warn!(ucme_id = %ucme.id, %portatore_id, "ucme not assigned to caller");
        return Err(AppError::forbidden("This UCMe is not assigned to you"));
    }
    Ok(ucme)
}

/// Off-path moves are logged and allowed, or rejected when `strict`.
pub fn check_transition(
    ucme_id: Uuid,
    current: UcmeStatus,
    next: UcmeStatus,
    strict: bool,
) -> Result<(), AppError> {
    if current.can_transition_to(next) {
        return Ok(());
    }
    if strict {
        return Err(AppError::conflict(format!(
            "Cannot move from \"{current}\" to \"{next}\""
        )));
    }
    warn!(%ucme_id, from = %current, to = %next, "status change outside the forward path");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use time::OffsetDateTime;

    fn entry(portatore_id: Option<Uuid>) -> Ucme {
        Ucme {
            id: Uuid::new_v4(),
            user_id: None,
            email: "u@example.com".into(),
            content: "a".repeat(25),
            tone: None,
            school_code: None,
            status: UcmeStatus::Ricevuta,
            portatore_id,
            response: None,
            responded_at: None,
            response_read: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn only_the_four_labels_parse() {
        assert_eq!(parse_status("in lavorazione").unwrap(), UcmeStatus::InLavorazione);
        assert_eq!(parse_status(" completata ").unwrap(), UcmeStatus::Completata);
        for bad in ["", "chiusa", "in_lavorazione", "COMPLETATA"] {
            assert_eq!(parse_status(bad).unwrap_err().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn ownership_rules() {
        let me = Uuid::new_v4();
        assert!(ensure_owned(Some(entry(Some(me))), me).is_ok());
        let err = ensure_owned(Some(entry(Some(Uuid::new_v4()))), me).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        let err = ensure_owned(Some(entry(None)), me).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        let err = ensure_owned(None, me).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn permissive_mode_lets_any_label_through() {
        let id = Uuid::new_v4();
        for from in UcmeStatus::ALL {
            for to in UcmeStatus::ALL {
                assert!(check_transition(id, from, to, false).is_ok());
            }
        }
    }

    #[test]
    fn strict_mode_rejects_skips() {
        let id = Uuid::new_v4();
        let err = check_transition(id, UcmeStatus::Ricevuta, UcmeStatus::Completata, true)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(check_transition(id, UcmeStatus::Ricevuta, UcmeStatus::InLavorazione, true).is_ok());
    }
}
