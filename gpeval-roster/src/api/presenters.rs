//! Presenter resolution endpoints

use crate::identity::Match;
use crate::{ApiResult, AppState};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use gpeval_common::db::GamePresenter;
use gpeval_common::Scope;
use serde::{Deserialize, Serialize};

/// Request payload for name resolution
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// Name as read off the screenshot
    pub raw_name: String,
    pub scope: Scope,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub id: i64,
    pub display_name: String,
    pub is_new: bool,
    pub similarity: u8,
}

/// POST /api/presenters/resolve
///
/// Returns the matched presenter, creating one under `scope` when nothing in the
/// scope is similar enough.
pub async fn resolve_presenter(
    State(state): State<AppState>,
    Json(payload): Json<ResolveRequest>,
) -> ApiResult<Json<ResolveResponse>> {
    let resolution = state
        .resolver
        .resolve(&payload.raw_name, &payload.scope)
        .await?;

    Ok(Json(ResolveResponse {
        id: resolution.presenter.id,
        display_name: resolution.presenter.display_name,
        is_new: resolution.is_new,
        similarity: resolution.similarity,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub raw_name: String,
    pub scope: Scope,
    /// Minimum similarity; the configured fuzzy threshold when absent
    #[serde(default)]
    pub threshold: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct Suggestion {
    pub id: i64,
    pub display_name: String,
    pub similarity: u8,
    pub is_exact: bool,
}

impl From<Match> for Suggestion {
    fn from(m: Match) -> Self {
        Self {
            id: m.presenter.id,
            display_name: m.presenter.display_name,
            similarity: m.similarity,
            is_exact: m.is_exact,
        }
    }
}

/// POST /api/presenters/suggest
pub async fn suggest_presenters(
    State(state): State<AppState>,
    Json(payload): Json<SuggestRequest>,
) -> ApiResult<Json<Vec<Suggestion>>> {
    let threshold = payload
        .threshold
        .unwrap_or_else(|| state.resolver.fuzzy_threshold());

    let matches = state
        .resolver
        .suggest(&payload.raw_name, &payload.scope, threshold)
        .await?;

    Ok(Json(matches.into_iter().map(Suggestion::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    pub scope: Scope,
}

/// GET /api/presenters?scope=team:5
pub async fn list_presenters(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<Json<Vec<GamePresenter>>> {
    let presenters = state.resolver.roster().list(&query.scope).await?;
    Ok(Json(presenters))
}

/// Build presenter routes
pub fn presenter_routes() -> Router<AppState> {
    Router::new()
        .route("/api/presenters", get(list_presenters))
        .route("/api/presenters/resolve", post(resolve_presenter))
        .route("/api/presenters/suggest", post(suggest_presenters))
}
