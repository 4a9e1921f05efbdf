//! Presenter roster
//!
//! Scope-filtered reads and idempotent inserts over the `presenters` table, plus
//! the per-scope candidate pool cache used by identity resolution.

use gpeval_common::db::{timestamp_now, GamePresenter, PRESENTER_COLUMNS};
use gpeval_common::{Result, Scope};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Candidate pool in resolution order (earliest created first)
pub type CandidatePool = Arc<Vec<GamePresenter>>;

/// SQL condition restricting rows with `team_id`/`owner_id` columns to a scope
///
/// `alias` qualifies the columns (`"s."`) when the query joins tables.
pub(crate) fn push_scope_condition(qb: &mut QueryBuilder<'_, Sqlite>, scope: &Scope, alias: &str) {
    match *scope {
        Scope::Global => {
            qb.push("1 = 1");
        }
        Scope::Team(id) => {
            qb.push(alias).push("team_id = ").push_bind(id);
        }
        Scope::Owner(id) => {
            qb.push(alias).push("owner_id = ").push_bind(id);
        }
    }
}

/// In-process cache of candidate pools keyed by scope
///
/// `generation` advances on every invalidation; a pool loaded under an older
/// generation is never stored, so a load racing an insert cannot re-cache the
/// pre-insert roster.
#[derive(Clone, Default)]
struct CandidateCache {
    pools: Arc<RwLock<HashMap<Scope, CandidatePool>>>,
    generation: Arc<AtomicU64>,
}

impl CandidateCache {
    async fn get(&self, scope: &Scope) -> Option<CandidatePool> {
        self.pools.read().await.get(scope).cloned()
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    async fn put(&self, scope: Scope, pool: CandidatePool, loaded_at: u64) {
        let mut pools = self.pools.write().await;
        if self.generation() == loaded_at {
            pools.insert(scope, pool);
        }
    }

    async fn invalidate(&self, scopes: &[Scope]) {
        let mut pools = self.pools.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        for scope in scopes {
            pools.remove(scope);
        }
    }
}

/// Ownership-scoped presenter store
#[derive(Clone)]
pub struct Roster {
    db: SqlitePool,
    cache: Option<CandidateCache>,
}

impl Roster {
    /// Create a roster; `cache_candidates` keeps candidate pools between lookups
    pub fn new(db: SqlitePool, cache_candidates: bool) -> Self {
        Self {
            db,
            cache: cache_candidates.then(CandidateCache::default),
        }
    }

    /// Presenters visible under `scope`, earliest created first
    ///
    /// Served from the cache when enabled; [`Roster::find_or_insert`] invalidates
    /// every scope that can see a newly inserted presenter.
    pub async fn candidates(&self, scope: &Scope) -> Result<CandidatePool> {
        let mut loaded_at = 0;
        if let Some(cache) = &self.cache {
            if let Some(pool) = cache.get(scope).await {
                debug!(scope = %scope, size = pool.len(), "Candidate pool cache hit");
                return Ok(pool);
            }
            loaded_at = cache.generation();
        }

        let pool: CandidatePool = Arc::new(self.load(scope, "created_at, id").await?);

        if let Some(cache) = &self.cache {
            cache.put(*scope, Arc::clone(&pool), loaded_at).await;
        }

        Ok(pool)
    }

    /// Presenters visible under `scope`, ordered by display name
    pub async fn list(&self, scope: &Scope) -> Result<Vec<GamePresenter>> {
        self.load(scope, "display_name COLLATE NOCASE, id").await
    }

    async fn load(&self, scope: &Scope, order_by: &str) -> Result<Vec<GamePresenter>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM presenters WHERE ",
            PRESENTER_COLUMNS
        ));
        push_scope_condition(&mut qb, scope, "");
        qb.push(" ORDER BY ").push(order_by);

        let rows = qb.build().fetch_all(&self.db).await?;
        rows.iter().map(GamePresenter::from_row).collect()
    }

    /// Load a presenter by id regardless of scope
    pub async fn get(&self, id: i64) -> Result<Option<GamePresenter>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM presenters WHERE id = ?",
            PRESENTER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(GamePresenter::from_row).transpose()
    }

    /// Insert a presenter under `scope` unless one with the same canonical name
    /// already exists there.
    ///
    /// Returns the stored presenter and whether this call created it. A concurrent
    /// insert of the same identity is absorbed by the unique index: the loser
    /// re-reads and gets the winner's row.
    pub async fn find_or_insert(
        &self,
        display_name: &str,
        canonical_name: &str,
        scope: &Scope,
    ) -> Result<(GamePresenter, bool)> {
        let (team_id, owner_id) = scope.creation_columns();

        let inserted = sqlx::query(&format!(
            r#"
            INSERT OR IGNORE INTO presenters (display_name, canonical_name, team_id, owner_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            PRESENTER_COLUMNS
        ))
        .bind(display_name)
        .bind(canonical_name)
        .bind(team_id)
        .bind(owner_id)
        .bind(timestamp_now())
        .fetch_optional(&self.db)
        .await?;

        // Created or not, the pools that can see this identity may be stale
        self.on_insert(team_id, owner_id).await;

        if let Some(row) = inserted {
            let presenter = GamePresenter::from_row(&row)?;
            info!(
                id = presenter.id,
                name = %presenter.display_name,
                scope = %scope,
                "Created new game presenter"
            );
            return Ok((presenter, true));
        }

        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM presenters
            WHERE canonical_name = ?
              AND COALESCE(team_id, -1) = COALESCE(?, -1)
              AND COALESCE(owner_id, -1) = COALESCE(?, -1)
            "#,
            PRESENTER_COLUMNS
        ))
        .bind(canonical_name)
        .bind(team_id)
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;

        debug!(canonical = %canonical_name, scope = %scope, "Presenter already existed on insert");
        Ok((GamePresenter::from_row(&row)?, false))
    }

    /// Cache invalidation hook run after every insert attempt
    async fn on_insert(&self, team_id: Option<i64>, owner_id: Option<i64>) {
        if let Some(cache) = &self.cache {
            cache.invalidate(&Scope::covering(team_id, owner_id)).await;
        }
    }

    /// Scoping columns for each existing id (missing ids are absent from the map)
    pub async fn scope_columns(
        &self,
        ids: &[i64],
    ) -> Result<HashMap<i64, (Option<i64>, Option<i64>)>> {
        let mut columns = HashMap::with_capacity(ids.len());

        // Stay well under SQLite's bound-parameter limit
        for chunk in ids.chunks(500) {
            let mut qb =
                QueryBuilder::<Sqlite>::new("SELECT id, team_id, owner_id FROM presenters WHERE id IN (");
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");

            let rows: Vec<(i64, Option<i64>, Option<i64>)> =
                qb.build_query_as().fetch_all(&self.db).await?;
            for (id, team_id, owner_id) in rows {
                columns.insert(id, (team_id, owner_id));
            }
        }

        Ok(columns)
    }
}
