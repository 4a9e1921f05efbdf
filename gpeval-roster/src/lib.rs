//! gpeval-roster library - GP identity resolution and monthly ledger
//!
//! Maps raw, OCR'd presenter names onto roster identities within an ownership
//! scope and keeps one cumulative evaluation record per presenter per month.

pub mod api;
pub mod bulk;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod ownership;
pub mod roster;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use bulk::BulkMutationCoordinator;
use chrono::{DateTime, Utc};
use gpeval_common::config::TomlConfig;
use identity::IdentityResolver;
use ledger::MonthlyLedger;
use ownership::OwnershipGuard;
use roster::Roster;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub resolver: IdentityResolver,
    pub ledger: MonthlyLedger,
    pub guard: OwnershipGuard,
    pub bulk: BulkMutationCoordinator,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire every component over one pool using the loaded configuration
    pub fn new(db: SqlitePool, config: &TomlConfig) -> Self {
        let roster = Roster::new(db.clone(), config.matching.cache_candidates);
        let resolver = IdentityResolver::new(roster.clone(), config.matching.fuzzy_threshold);
        let ledger = MonthlyLedger::new(db.clone());
        let guard = OwnershipGuard::new(roster);
        let bulk = BulkMutationCoordinator::new(
            ledger.clone(),
            guard.clone(),
            resolver.clone(),
            config.bulk.max_batch_size,
        );

        Self {
            db,
            resolver,
            ledger,
            guard,
            bulk,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::presenter_routes())
        .merge(api::stats_routes())
        .merge(api::ownership_routes())
        .merge(api::bulk_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
