//! Ownership verification endpoint

use crate::ownership::OwnershipReport;
use crate::{ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use gpeval_common::Scope;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub ids: Vec<i64>,
    pub scope: Scope,
}

/// POST /api/ownership/verify
///
/// Reports ids that are missing or outside `scope`; never an error for them.
pub async fn verify_ownership(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> ApiResult<Json<OwnershipReport>> {
    let report = state.guard.verify(&payload.ids, &payload.scope).await?;
    Ok(Json(report))
}

pub fn ownership_routes() -> Router<AppState> {
    Router::new().route("/api/ownership/verify", post(verify_ownership))
}
