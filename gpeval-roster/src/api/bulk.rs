//! Bulk mutation endpoints
//!
//! Batches are best effort: the response counts successes and failures per item.
//! Only an oversized batch or an invalid period rejects the whole request.

use crate::bulk::{BulkOutcome, GpStatsUpdate, MistakeEntry, SyncOutcome};
use crate::ledger::Period;
use crate::{ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use gpeval_common::Scope;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct BulkAttitudeRequest {
    pub ids: Vec<i64>,
    /// Absolute attitude value written for every id
    pub value: i64,
    pub month: u32,
    pub year: i32,
    pub scope: Scope,
    #[serde(default)]
    pub updated_by: Option<i64>,
}

/// POST /api/bulk/attitude
pub async fn bulk_set_attitude(
    State(state): State<AppState>,
    Json(payload): Json<BulkAttitudeRequest>,
) -> ApiResult<Json<BulkOutcome>> {
    let period = Period::new(payload.month, payload.year)?;
    let outcome = state
        .bulk
        .bulk_set_attitude(&payload.ids, payload.value, period, &payload.scope, payload.updated_by)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct BulkIdsRequest {
    pub ids: Vec<i64>,
    pub month: u32,
    pub year: i32,
    pub scope: Scope,
    #[serde(default)]
    pub updated_by: Option<i64>,
}

/// POST /api/bulk/reset-mistakes
pub async fn bulk_reset_mistakes(
    State(state): State<AppState>,
    Json(payload): Json<BulkIdsRequest>,
) -> ApiResult<Json<BulkOutcome>> {
    let period = Period::new(payload.month, payload.year)?;
    let outcome = state
        .bulk
        .bulk_reset_mistakes(&payload.ids, period, &payload.scope, payload.updated_by)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct BulkStatsRequest {
    pub updates: Vec<GpStatsUpdate>,
    pub month: u32,
    pub year: i32,
    pub scope: Scope,
    #[serde(default)]
    pub updated_by: Option<i64>,
}

/// POST /api/bulk/stats
pub async fn bulk_update_stats(
    State(state): State<AppState>,
    Json(payload): Json<BulkStatsRequest>,
) -> ApiResult<Json<BulkOutcome>> {
    let period = Period::new(payload.month, payload.year)?;
    let outcome = state
        .bulk
        .bulk_update_stats(&payload.updates, period, &payload.scope, payload.updated_by)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct SyncMistakesRequest {
    pub entries: Vec<MistakeEntry>,
    pub month: u32,
    pub year: i32,
    pub scope: Scope,
    #[serde(default)]
    pub updated_by: Option<i64>,
}

/// POST /api/bulk/sync-mistakes
///
/// Names are matched within `scope` without creating presenters; unmatched
/// names come back in `not_found`.
pub async fn sync_mistakes(
    State(state): State<AppState>,
    Json(payload): Json<SyncMistakesRequest>,
) -> ApiResult<Json<SyncOutcome>> {
    let period = Period::new(payload.month, payload.year)?;
    let outcome = state
        .bulk
        .sync_mistakes(&payload.entries, period, &payload.scope, payload.updated_by)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ClearMonthRequest {
    pub month: u32,
    pub year: i32,
    pub scope: Scope,
    #[serde(default)]
    pub updated_by: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ClearMonthResponse {
    pub cleared: u64,
}

/// POST /api/bulk/clear-month
pub async fn clear_month(
    State(state): State<AppState>,
    Json(payload): Json<ClearMonthRequest>,
) -> ApiResult<Json<ClearMonthResponse>> {
    let period = Period::new(payload.month, payload.year)?;
    let cleared = state
        .bulk
        .clear_month(period, &payload.scope, payload.updated_by)
        .await?;
    Ok(Json(ClearMonthResponse { cleared }))
}

/// Build bulk mutation routes
pub fn bulk_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bulk/attitude", post(bulk_set_attitude))
        .route("/api/bulk/reset-mistakes", post(bulk_reset_mistakes))
        .route("/api/bulk/stats", post(bulk_update_stats))
        .route("/api/bulk/sync-mistakes", post(sync_mistakes))
        .route("/api/bulk/clear-month", post(clear_month))
}
