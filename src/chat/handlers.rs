use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{extractors::CurrentUser, repo_types::User},
    chat::{
        dto::{ChatThread, DecisionRequest, MessagesQuery, PostMessageRequest, MESSAGE_MAX_CHARS},
        repo_types::{Chat, ChatMessage, ChatStatus, NewMessage, SenderRole},
    },
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    response::{created, ok, ApiResponse, JsonCreated, JsonOk},
    state::AppState,
    ucme::repo_types::Ucme,
    validation::bounded_text,
};

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/ucme/:id/chat", post(open_chat))
        .route("/ucme/:id/chat/decision", post(decide))
        .route(
            "/ucme/:id/chat/messages",
            get(list_messages).post(post_message),
        )
}

/// Which side of the entry the caller is on.
pub fn participant_role(ucme: &Ucme, user: &User) -> Result<SenderRole, AppError> {
    if ucme.user_id == Some(user.id) {
        if !user.has_subscription {
            return Err(AppError::forbidden("subscription required"));
        }
        return Ok(SenderRole::Utente);
    }
    if ucme.portatore_id == Some(user.id) {
        return Ok(SenderRole::Portatore);
    }
    warn!(ucme_id = %ucme.id, user_id = %user.id, "chat access by non participant");
    Err(AppError::forbidden("Not a participant of this conversation"))
}

async fn load_participant(
    state: &AppState,
    ucme_id: Uuid,
    user: &User,
) -> AppResult<(Ucme, SenderRole)> {
    let ucme = state
        .store
        .find_ucme(ucme_id)
        .await?
        .ok_or_else(|| AppError::not_found("UCMe not found"))?;
    let role = participant_role(&ucme, user)?;
    Ok((ucme, role))
}

async fn existing_chat(state: &AppState, ucme_id: Uuid) -> AppResult<Chat> {
    state
        .store
        .find_chat_by_ucme(ucme_id)
        .await?
        .ok_or_else(|| AppError::not_found("No chat for this UCMe"))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn open_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<ApiResponse<Chat>>)> {
    let (ucme, role) = load_participant(&state, id, &user).await?;
    if ucme.portatore_id.is_none() {
        return Err(AppError::conflict("UCMe not yet assigned"));
    }
    let initial = match role {
        SenderRole::Utente => ChatStatus::Requested,
        SenderRole::Portatore => ChatStatus::Open,
    };
    let (chat, is_new) = state.store.create_chat(id, initial).await?;
    if is_new {
        info!(ucme_id = %id, chat_id = %chat.id, status = chat.status.as_str(), "chat created");
        Ok(created(chat))
    } else {
        Ok((StatusCode::OK, Json(ApiResponse::data(chat))))
    }
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn decide(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> AppResult<JsonOk<Chat>> {
    let (_, role) = load_participant(&state, id, &user).await?;
    if role != SenderRole::Portatore {
        return Err(AppError::forbidden("Only the assigned Portatore can decide"));
    }
    let chat = existing_chat(&state, id).await?;
    if chat.status != ChatStatus::Requested {
        return Err(AppError::conflict(format!(
            "Chat is {}, not requested",
            chat.status.as_str()
        )));
    }
    let next = if payload.accept {
        ChatStatus::Accepted
    } else {
        ChatStatus::Rejected
    };
    let chat = state
        .store
        .set_chat_status(chat.id, next)
        .await?
        .ok_or_else(|| AppError::not_found("No chat for this UCMe"))?;
    info!(chat_id = %chat.id, status = next.as_str(), "chat request decided");
    Ok(ok(chat))
}

#[instrument(skip(state, user, query), fields(user_id = %user.id))]
pub async fn list_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> AppResult<JsonOk<ChatThread>> {
    let after = query
        .after
        .as_deref()
        .map(|raw| {
            OffsetDateTime::parse(raw, &Rfc3339)
                .map_err(|_| AppError::validation("after must be an RFC 3339 timestamp"))
        })
        .transpose()?;

    load_participant(&state, id, &user).await?;
    let chat = existing_chat(&state, id).await?;
    let messages = state.store.list_messages(chat.id, after).await?;
    Ok(ok(ChatThread { chat, messages }))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn post_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> AppResult<JsonCreated<ChatMessage>> {
    let body = bounded_text(&payload.body, "body", 1, MESSAGE_MAX_CHARS)?;
    let (_, role) = load_participant(&state, id, &user).await?;
    let chat = existing_chat(&state, id).await?;
    if !chat.status.accepts_messages() {
        return Err(AppError::conflict(format!(
            "Chat is {}; messages are not allowed",
            chat.status.as_str()
        )));
    }

    let message = state
        .store
        .insert_message(NewMessage {
            chat_id: chat.id,
            sender_id: user.id,
            sender_role: role,
            body,
        })
        .await?;
    info!(chat_id = %chat.id, sender_role = role.as_str(), "chat message stored");
    Ok(created(message))
}
