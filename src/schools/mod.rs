use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    auth::extractors::AdminUser,
    error::{AppError, AppResult},
    extract::Json,
    response::{created, ok, JsonCreated, JsonOk},
    state::AppState,
    validation::bounded_text,
};

pub mod repo;

use repo::School;

#[derive(Debug, Serialize)]
pub struct SchoolList {
    pub schools: Vec<School>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSchoolRequest {
    pub code: String,
    pub name: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/schools", get(list_schools))
        .route("/admin/schools", post(create_school))
}

/// School codes are compared case-insensitively by storing them upper-cased.
pub fn normalize_school_code(raw: &str) -> Result<String, AppError> {
    let code = bounded_text(raw, "school_code", 2, 32)?.to_uppercase();
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::validation("school_code has invalid characters"));
    }
    Ok(code)
}

/// Normalizes `raw` and checks that the school exists.
pub async fn existing_school_code(state: &AppState, raw: &str) -> AppResult<String> {
    let code = normalize_school_code(raw)?;
    match state.store.find_school(&code).await? {
        Some(school) => Ok(school.code),
        None => Err(AppError::validation(format!("Unknown school code {code}"))),
    }
}

#[instrument(skip(state))]
async fn list_schools(State(state): State<AppState>) -> AppResult<JsonOk<SchoolList>> {
    let schools = state.store.list_schools().await?;
    Ok(ok(SchoolList { schools }))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
async fn create_school(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateSchoolRequest>,
) -> AppResult<JsonCreated<School>> {
    let code = normalize_school_code(&payload.code)?;
    let name = bounded_text(&payload.name, "name", 2, 160)?;
    let school = state
        .store
        .create_school(&code, &name)
        .await?
        .ok_or_else(|| AppError::conflict("School code already exists"))?;
    info!(code = %school.code, "school created");
    Ok(created(school))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn school_codes_are_uppercased() {
        assert_eq!(normalize_school_code(" rm-liceo_01 ").unwrap(), "RM-LICEO_01");
        assert!(normalize_school_code("a").is_err());
        assert!(normalize_school_code("liceo galilei").is_err());
    }
}
