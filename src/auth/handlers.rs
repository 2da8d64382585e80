use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, ProfileResponse, PublicUser, RefreshRequest,
            RegisterRequest, UpdateProfileRequest,
        },
        extractors::{load_user, CurrentUser},
        jwt::JwtKeys,
        password::{check_password_policy, hash_password, verify_password},
        repo_types::{NewUser, UserPatch},
    },
    error::{AppError, AppResult},
    extract::Json,
    response::{created, ok, JsonCreated, JsonOk},
    state::AppState,
    validation::{bounded_text, normalize_email, optional_text},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<JsonCreated<AuthResponse>> {
    let email = normalize_email(&payload.email).inspect_err(|_| warn!("invalid email"))?;
    check_password_policy(&payload.password)?;
    let display_name = match optional_text(payload.display_name) {
        Some(name) => bounded_text(&name, "display_name", 1, 80)?,
        None => email.split('@').next().unwrap_or_default().to_string(),
    };

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .store
        .create_user(NewUser {
            email,
            display_name,
            password_hash,
        })
        .await?
        .ok_or_else(|| {
            warn!("email already registered");
            AppError::conflict("Email already registered")
        })?;

    let tokens = JwtKeys::from_ref(&state).issue_pair(user.id)?;
    info!(user_id = %user.id, "user registered");
    Ok(created(AuthResponse::new(tokens, PublicUser::from(&user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<JsonOk<AuthResponse>> {
    let invalid = || AppError::unauthorized("Invalid credentials");
    let email = normalize_email(&payload.email)?;

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!("login unknown email");
        return Err(invalid());
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let tokens = JwtKeys::from_ref(&state).issue_pair(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(ok(AuthResponse::new(tokens, PublicUser::from(&user))))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<JsonOk<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::unauthorized("Invalid refresh token")
    })?;

    let user = load_user(&state, claims.sub).await?;
    let tokens = keys.issue_pair(user.id)?;
    Ok(ok(AuthResponse::new(tokens, PublicUser::from(&user))))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<JsonOk<ProfileResponse>> {
    let is_portatore = state
        .store
        .find_portatore(user.id)
        .await?
        .is_some_and(|p| p.active);
    Ok(ok(ProfileResponse {
        user: PublicUser::from(&user),
        is_portatore,
    }))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<JsonOk<PublicUser>> {
    let display_name = bounded_text(&payload.display_name, "display_name", 1, 80)?;
    let updated = state
        .store
        .update_user(
            user.id,
            UserPatch {
                display_name: Some(display_name),
                ..UserPatch::default()
            },
        )
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;
    info!("profile updated");
    Ok(ok(PublicUser::from(&updated)))
}
