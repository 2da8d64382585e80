use axum::{
    extract::State,
    routing::{get, patch, post},
    Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::PortatoreUser,
    error::{AppError, AppResult},
    extract::{Json, Path},
    portatore::dto::{RespondRequest, UpdateStatusRequest},
    response::{created, ok, JsonCreated, JsonOk},
    state::AppState,
    ucme::{
        dto::{UcmeList, UcmeView, RESPONSE_MAX_CHARS},
        workflow::{check_transition, ensure_owned, parse_status},
    },
    validation::bounded_text,
};

pub fn portatore_routes() -> Router<AppState> {
    Router::new()
        .route("/portatore/ucme", get(list_assigned))
        .route("/portatore/ucme/:id/status", patch(update_status))
        .route("/portatore/ucme/:id/response", post(respond))
}

#[instrument(skip(state, caller), fields(portatore_id = %caller.user.id))]
pub async fn list_assigned(
    State(state): State<AppState>,
    caller: PortatoreUser,
) -> AppResult<JsonOk<UcmeList<UcmeView>>> {
    let rows = state.store.list_by_portatore(caller.user.id).await?;
    Ok(ok(UcmeList::from_entries(rows)))
}

#[instrument(skip(state, caller, payload), fields(portatore_id = %caller.user.id))]
pub async fn update_status(
    State(state): State<AppState>,
    caller: PortatoreUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<JsonOk<UcmeView>> {
    let next = parse_status(&payload.status)?;
    let current = ensure_owned(state.store.find_ucme(id).await?, caller.user.id)?;
    check_transition(
        id,
        current.status,
        next,
        state.config.strict_status_transitions,
    )?;

    let updated = state
        .store
        .set_status(id, caller.user.id, next)
        .await?
        // reassigned between the read and the write
        .ok_or_else(|| AppError::forbidden("This UCMe is not assigned to you"))?;
    info!(ucme_id = %id, from = %current.status, to = %next, "status updated");
    Ok(ok(UcmeView::from(updated)))
}

#[instrument(skip(state, caller, payload), fields(portatore_id = %caller.user.id))]
pub async fn respond(
    State(state): State<AppState>,
    caller: PortatoreUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondRequest>,
) -> AppResult<JsonCreated<UcmeView>> {
    let text = bounded_text(&payload.text, "text", 1, RESPONSE_MAX_CHARS)?;
    ensure_owned(state.store.find_ucme(id).await?, caller.user.id)?;

    let updated = state
        .store
        .set_response(id, caller.user.id, &text)
        .await?
        .ok_or_else(|| AppError::forbidden("This UCMe is not assigned to you"))?;
    info!(ucme_id = %id, "response stored");
    Ok(created(UcmeView::from(updated)))
}
