use std::collections::BTreeMap;

use axum::{
    extract::State,
    routing::get,
    Router,
};
use serde::Serialize;
use tracing::instrument;

use crate::{
    auth::extractors::DocenteUser,
    error::AppResult,
    extract::Query,
    response::{ok, JsonOk, Pagination},
    state::AppState,
    ucme::{
        dto::{UcmeList, UcmeView},
        repo_types::UcmeStatus,
    },
};

#[derive(Debug, Serialize)]
pub struct SchoolStats {
    pub school_code: String,
    pub total: i64,
    pub by_status: BTreeMap<&'static str, i64>,
}

impl SchoolStats {
    /// Every status appears in `by_status`, zero when absent from `counts`.
    pub fn from_counts(school_code: String, counts: &[(UcmeStatus, i64)]) -> Self {
        let mut by_status: BTreeMap<&'static str, i64> =
            UcmeStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        for (status, n) in counts {
            *by_status.entry(status.as_str()).or_default() += n;
        }
        Self {
            school_code,
            total: by_status.values().sum(),
            by_status,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/docente/ucme", get(list_school_ucme))
        .route("/docente/stats", get(school_stats))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user.id, school = %caller.school_code))]
async fn list_school_ucme(
    State(state): State<AppState>,
    caller: DocenteUser,
    Query(page): Query<Pagination>,
) -> AppResult<JsonOk<UcmeList<UcmeView>>> {
    let (limit, offset) = page.clamped();
    let rows = state
        .store
        .list_by_school(&caller.school_code, limit, offset)
        .await?;
    Ok(ok(UcmeList::from_entries(rows)))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user.id, school = %caller.school_code))]
async fn school_stats(
    State(state): State<AppState>,
    caller: DocenteUser,
) -> AppResult<JsonOk<SchoolStats>> {
    let counts = state.store.count_by_status(&caller.school_code).await?;
    Ok(ok(SchoolStats::from_counts(caller.school_code, &counts)))
}
