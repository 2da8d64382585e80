use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::{Role, User};
use crate::error::AppError;
use crate::state::AppState;

/// Validated bearer token. Carries only the subject; no storage access.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

fn bearer_token(parts: &Parts) -> Option<Result<&str, AppError>> {
    let header = parts.headers.get(AUTHORIZATION)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("Invalid Authorization header"));
    Some(token)
}

fn verify_bearer(keys: &JwtKeys, token: &str) -> Result<AuthUser, AppError> {
    match keys.verify_access(token) {
        Ok(claims) => Ok(AuthUser(claims.sub)),
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            Err(AppError::unauthorized("Invalid or expired token"))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))??;
        verify_bearer(&JwtKeys::from_ref(state), token)
    }
}

/// Anonymous when no Authorization header is sent; a bad token is still a 401.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(MaybeAuthUser(None)),
            Some(token) => {
                let AuthUser(id) = verify_bearer(&JwtKeys::from_ref(state), token?)?;
                Ok(MaybeAuthUser(Some(id)))
            }
        }
    }
}

/// The caller's user row, re-read from storage on every request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub(crate) async fn load_user(state: &AppState, user_id: Uuid) -> Result<User, AppError> {
    state.store.find_user_by_id(user_id).await?.ok_or_else(|| {
        warn!(%user_id, "token subject no longer exists");
        AppError::unauthorized("User not found")
    })
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        Ok(CurrentUser(load_user(state, user_id).await?))
    }
}

/// Administrator: `is_admin` flag or `admin` role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_administrator() {
            warn!(user_id = %user.id, "admin route denied");
            return Err(AppError::forbidden("Administrator access required"));
        }
        Ok(AdminUser(user))
    }
}

/// Caller with an active Portatore profile.
#[derive(Debug, Clone)]
pub struct PortatoreUser {
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppState> for PortatoreUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        match state.store.find_portatore(user.id).await? {
            Some(portatore) if portatore.active => Ok(PortatoreUser { user }),
            _ => {
                warn!(user_id = %user.id, "portatore route denied");
                Err(AppError::forbidden("Active Portatore access required"))
            }
        }
    }
}

/// Docente (or administrator) bound to a school.
#[derive(Debug, Clone)]
pub struct DocenteUser {
    pub user: User,
    pub school_code: String,
}

#[async_trait]
impl FromRequestParts<AppState> for DocenteUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Docente && !user.is_administrator() {
            warn!(user_id = %user.id, "docente route denied");
            return Err(AppError::forbidden("Docente access required"));
        }
        let Some(school_code) = user.school_code.clone() else {
            return Err(AppError::forbidden("No school assigned to this account"));
        };
        Ok(DocenteUser { user, school_code })
    }
}
