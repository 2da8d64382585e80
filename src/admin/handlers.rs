use axum::{
    extract::State,
    routing::{get, patch, post, put},
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    admin::dto::{
        AssignRequest, PortatoreList, UpdateUserRequest, UpsertPortatoreRequest, UserList,
    },
    auth::{
        dto::PublicUser,
        extractors::AdminUser,
        repo_types::UserPatch,
    },
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    portatore::repo_types::Portatore,
    response::{ok, JsonOk, Pagination},
    schools::existing_school_code,
    state::AppState,
    ucme::{
        dto::UcmeList,
        repo_types::{AssignOutcome, Ucme},
    },
    validation::{bounded_text, optional_text},
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/ucme/unassigned", get(list_unassigned))
        .route("/admin/ucme/:id/assign", post(assign))
        .route("/admin/portatori", get(list_portatori))
        .route("/admin/portatori/:user_id", put(upsert_portatore))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", patch(update_user))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn list_unassigned(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(page): Query<Pagination>,
) -> AppResult<JsonOk<UcmeList<Ucme>>> {
    let (limit, offset) = page.clamped();
    let rows = state.store.list_unassigned(limit, offset).await?;
    Ok(ok(UcmeList { items: rows }))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn list_portatori(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<JsonOk<PortatoreList>> {
    let portatori = state.store.list_active_portatori().await?;
    Ok(ok(PortatoreList { portatori }))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
pub async fn assign(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> AppResult<JsonOk<Ucme>> {
    match state.store.find_portatore(payload.portatore_id).await? {
        Some(p) if p.active => {}
        Some(_) => return Err(AppError::validation("Portatore is not active")),
        None => return Err(AppError::not_found("Portatore not found")),
    }

    match state
        .store
        .assign(id, payload.portatore_id, payload.force)
        .await?
    {
        AssignOutcome::Assigned(ucme) => {
            info!(ucme_id = %id, portatore_id = %payload.portatore_id, force = payload.force, "ucme assigned");
            Ok(ok(ucme))
        }
        AssignOutcome::AlreadyAssigned => {
            warn!(ucme_id = %id, "ucme already assigned");
            Err(AppError::conflict(
                "UCMe already assigned; pass force to reassign",
            ))
        }
        AssignOutcome::NotFound => Err(AppError::not_found("UCMe not found")),
    }
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(page): Query<Pagination>,
) -> AppResult<JsonOk<UserList>> {
    let (limit, offset) = page.clamped();
    let users = state.store.list_users(limit, offset).await?;
    Ok(ok(UserList {
        users: users.iter().map(PublicUser::from).collect(),
    }))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<JsonOk<PublicUser>> {
    let school_code = if payload.clear_school {
        Some(None)
    } else {
        match optional_text(payload.school_code) {
            Some(raw) => Some(Some(existing_school_code(&state, &raw).await?)),
            None => None,
        }
    };
    let display_name = optional_text(payload.display_name)
        .map(|n| bounded_text(&n, "display_name", 1, 80))
        .transpose()?;

    let patch = UserPatch {
        display_name,
        role: payload.role,
        is_admin: payload.is_admin,
        school_code,
        has_subscription: payload.has_subscription,
    };
    let user = state
        .store
        .update_user(id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = %id, "user updated by admin");
    Ok(ok(PublicUser::from(&user)))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
pub async fn upsert_portatore(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpsertPortatoreRequest>,
) -> AppResult<JsonOk<Portatore>> {
    if state.store.find_user_by_id(user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }
    let bio = optional_text(payload.bio)
        .map(|b| bounded_text(&b, "bio", 1, 1000))
        .transpose()?;
    let portatore = state
        .store
        .upsert_portatore(user_id, bio, payload.active)
        .await?;
    info!(%user_id, active = portatore.active, "portatore saved");
    Ok(ok(portatore))
}
