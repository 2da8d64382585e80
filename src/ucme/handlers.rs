use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::{load_user, CurrentUser, MaybeAuthUser},
    error::{AppError, AppResult},
    extract::{Json, Path},
    response::{ok, ApiResponse, JsonCreated, JsonOk},
    schools::existing_school_code,
    state::AppState,
    ucme::{
        dto::{SubmitUcmeRequest, UcmeList, CONTENT_MAX_CHARS, CONTENT_MIN_CHARS},
        repo_types::{NewUcme, Ucme},
    },
    validation::{bounded_text, normalize_email, optional_text},
};

pub fn ucme_routes() -> Router<AppState> {
    Router::new()
        .route("/ucme", post(submit))
        .route("/ucme/:id/read", post(mark_read))
        .route("/me/ucme", get(list_mine))
}

/// Validates the submission without touching storage.
pub fn validate_submission(payload: &SubmitUcmeRequest) -> Result<(String, String), AppError> {
    let content = bounded_text(
        &payload.content,
        "content",
        CONTENT_MIN_CHARS,
        CONTENT_MAX_CHARS,
    )?;
    let email = normalize_email(&payload.email)?;
    Ok((content, email))
}

#[instrument(skip(state, payload))]
pub async fn submit(
    State(state): State<AppState>,
    MaybeAuthUser(author): MaybeAuthUser,
    Json(payload): Json<SubmitUcmeRequest>,
) -> AppResult<JsonCreated<Ucme>> {
    let (content, email) = validate_submission(&payload).inspect_err(|e| {
        warn!(error = %e, "ucme rejected");
    })?;
    let tone = optional_text(payload.tone.clone())
        .map(|t| bounded_text(&t, "tone", 1, 40))
        .transpose()?;

    let author = match author {
        Some(id) => Some(load_user(&state, id).await?),
        None => None,
    };
    let school_code = match optional_text(payload.school_code.clone()) {
        Some(raw) => Some(existing_school_code(&state, &raw).await?),
        None => author.as_ref().and_then(|u| u.school_code.clone()),
    };

    let ucme = state
        .store
        .insert_ucme(NewUcme {
            user_id: author.as_ref().map(|u| u.id),
            email,
            content,
            tone,
            school_code,
        })
        .await?;
    info!(ucme_id = %ucme.id, anonymous = ucme.user_id.is_none(), "ucme received");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(ucme).with_message("UCMe received")),
    ))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<JsonOk<UcmeList<Ucme>>> {
    let rows = state.store.list_by_author(user.id, &user.email).await?;
    Ok(ok(UcmeList { items: rows }))
}

/// True when `user` wrote the entry, logged in or anonymously with their email.
fn is_author(ucme: &Ucme, user_id: Uuid, email: &str) -> bool {
    match ucme.user_id {
        Some(author) => author == user_id,
        None => ucme.email == email,
    }
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<JsonOk<Ucme>> {
    let ucme = state
        .store
        .find_ucme(id)
        .await?
        .filter(|u| is_author(u, user.id, &user.email))
        .ok_or_else(|| AppError::not_found("UCMe not found"))?;
    if ucme.response.is_none() {
        return Err(AppError::conflict("This UCMe has no response yet"));
    }
    let updated = state
        .store
        .mark_response_read(id)
        .await?
        .ok_or_else(|| AppError::not_found("UCMe not found"))?;
    Ok(ok(updated))
}
