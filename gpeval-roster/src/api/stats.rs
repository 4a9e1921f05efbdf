//! Monthly ledger endpoints

use crate::ledger::{MonthSummary, PeriodEntry, Period};
use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, Utc};
use gpeval_common::db::MonthlyStat;
use gpeval_common::Scope;
use serde::Deserialize;
use tracing::info;

/// Default history window
const DEFAULT_HISTORY_MONTHS: u32 = 6;

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub scope: Scope,
    pub month: u32,
    pub year: i32,
}

/// GET /api/stats?scope=team:5&month=6&year=2025
pub async fn list_stats(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<Vec<PeriodEntry>>> {
    let period = Period::new(query.month, query.year)?;
    let entries = state.ledger.list_for_period(&query.scope, period).await?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct OptionalScopeQuery {
    #[serde(default)]
    pub scope: Option<Scope>,
}

/// GET /api/stats/:presenter_id/:year/:month
///
/// Fetches the month's row, creating it with zero counters on first access.
/// With `?scope=` the presenter must be visible in that scope.
pub async fn get_stat(
    State(state): State<AppState>,
    Path((presenter_id, year, month)): Path<(i64, i32, u32)>,
    Query(query): Query<OptionalScopeQuery>,
) -> ApiResult<Json<MonthlyStat>> {
    let period = Period::new(month, year)?;
    if let Some(scope) = &query.scope {
        state.guard.ensure(presenter_id, scope).await?;
    }

    let stat = state.ledger.get_or_create(presenter_id, period).await?;
    Ok(Json(stat))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub months: Option<u32>,
    /// Last month of the window; the current month when absent
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub scope: Option<Scope>,
}

/// GET /api/stats/:presenter_id/history?months=6
///
/// With `?scope=` the presenter must be visible in that scope.
pub async fn get_history(
    State(state): State<AppState>,
    Path(presenter_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<MonthSummary>>> {
    let today = Utc::now();
    let until = Period::new(
        query.month.unwrap_or_else(|| today.month()),
        query.year.unwrap_or_else(|| today.year()),
    )?;
    let months = query.months.unwrap_or(DEFAULT_HISTORY_MONTHS);
    if let Some(scope) = &query.scope {
        state.guard.ensure(presenter_id, scope).await?;
    }

    let history = state.ledger.history(presenter_id, months, until).await?;
    Ok(Json(history))
}

#[derive(Debug, Deserialize)]
pub struct AdjustAttitudeRequest {
    pub presenter_id: i64,
    pub month: u32,
    pub year: i32,
    /// Usually +1 or -1
    pub delta: i64,
    pub scope: Scope,
    #[serde(default)]
    pub updated_by: Option<i64>,
}

/// POST /api/stats/attitude
///
/// Applies the delta inside the database and returns the new cumulative row.
pub async fn adjust_attitude(
    State(state): State<AppState>,
    Json(payload): Json<AdjustAttitudeRequest>,
) -> ApiResult<Json<MonthlyStat>> {
    let period = Period::new(payload.month, payload.year)?;
    state.guard.ensure(payload.presenter_id, &payload.scope).await?;

    let stat = state
        .ledger
        .adjust_attitude(payload.presenter_id, period, payload.delta, payload.updated_by)
        .await?;

    info!(
        presenter_id = payload.presenter_id,
        delta = payload.delta,
        attitude = stat.attitude,
        "Attitude adjusted"
    );

    Ok(Json(stat))
}

/// Build ledger routes
pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats", get(list_stats))
        .route("/api/stats/attitude", post(adjust_attitude))
        .route("/api/stats/:presenter_id/history", get(get_history))
        .route("/api/stats/:presenter_id/:year/:month", get(get_stat))
}
