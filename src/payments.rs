use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    error::{AppError, AppResult},
    response::{ok, JsonOk},
    state::AppState,
    validation::normalize_email,
};

pub const SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    pub event: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub event: String,
    pub applied: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/payments", post(payment_webhook))
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Subscription flag implied by an event; `None` for events we ignore.
pub fn subscription_change(event: &str) -> Option<bool> {
    match event {
        "subscription.activated" | "subscription.renewed" => Some(true),
        "subscription.canceled" | "subscription.expired" => Some(false),
        _ => None,
    }
}

/// Rejects with 404 when no secret is configured and 401 on a bad secret,
/// both before the body is looked at.
fn check_secret(configured: Option<&str>, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = configured else {
        return Err(AppError::not_found("Not found"));
    };
    let given = headers
        .get(SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if !constant_time_eq(given, expected.as_bytes()) {
        warn!("payment webhook with bad secret");
        return Err(AppError::unauthorized("Invalid webhook secret"));
    }
    Ok(())
}

#[instrument(skip_all, fields(event = tracing::field::Empty))]
async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<JsonOk<WebhookAck>> {
    check_secret(state.config.payments_webhook_secret.as_deref(), &headers)?;
    let payload: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::validation(format!("Invalid payment event: {e}")))?;
    tracing::Span::current().record("event", payload.event.as_str());

    let Some(active) = subscription_change(&payload.event) else {
        info!("payment event ignored");
        return Ok(ok(WebhookAck {
            event: payload.event,
            applied: false,
        }));
    };

    let email = normalize_email(&payload.email)?;
    if !state.store.set_subscription_by_email(&email, active).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(active, "subscription updated");
    Ok(ok(WebhookAck {
        event: payload.event,
        applied: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_comparison() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn secret_is_checked_before_anything_else() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            check_secret(None, &headers),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            check_secret(Some("s3cret"), &headers),
            Err(AppError::Unauthorized(_))
        ));
        headers.insert(SECRET_HEADER, "s3cret".parse().unwrap());
        assert!(check_secret(Some("s3cret"), &headers).is_ok());
    }

    #[test]
    fn events_map_to_flag() {
        assert_eq!(subscription_change("subscription.activated"), Some(true));
        assert_eq!(subscription_change("subscription.canceled"), Some(false));
        assert_eq!(subscription_change("invoice.created"), None);
    }
}
