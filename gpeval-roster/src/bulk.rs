//! Best-effort bulk ledger mutations
//!
//! Each item commits on its own: one presenter failing (ownership, missing row,
//! store error) never rolls back another's success. Only whole-request problems
//! (oversized batch, invalid period) are returned as errors, and those are
//! detected before anything is written.

use crate::identity::IdentityResolver;
use crate::ledger::{FieldChange, MonthlyLedger, Period, StatChanges};
use crate::ownership::OwnershipGuard;
use gpeval_common::{Error, Result, Scope};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

/// Aggregate outcome of a bulk mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub success: usize,
    pub failed: usize,
    /// `"GP {id}: {reason}"` per failed item, in input order
    pub errors: Vec<String>,
    /// Ids excluded by the ownership check
    pub invalid_ids: Vec<i64>,
}

/// Heterogeneous per-presenter update; absent fields stay untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GpStatsUpdate {
    pub gp_id: i64,
    #[serde(default)]
    pub attitude: Option<i64>,
    #[serde(default)]
    pub mistakes: Option<i64>,
    #[serde(default)]
    pub total_games: Option<i64>,
    /// Absent leaves notes alone, `null` clears them
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl GpStatsUpdate {
    fn changes(&self, updated_by: Option<i64>) -> StatChanges {
        StatChanges {
            attitude: self.attitude.map(FieldChange::Set),
            mistakes: self.mistakes.map(FieldChange::Set),
            total_games: self.total_games.map(FieldChange::Set),
            notes: self.notes.clone(),
            updated_by,
        }
    }
}

/// One line of an imported mistake sheet
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MistakeEntry {
    pub name: String,
    pub count: i64,
}

/// Outcome of [`BulkMutationCoordinator::sync_mistakes`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub updated: usize,
    /// Names with no presenter in scope
    pub not_found: Vec<String>,
    pub errors: Vec<String>,
}

/// Applies batches of ledger mutations behind the ownership check
#[derive(Clone)]
pub struct BulkMutationCoordinator {
    ledger: MonthlyLedger,
    guard: OwnershipGuard,
    resolver: IdentityResolver,
    max_batch_size: usize,
}

impl BulkMutationCoordinator {
    pub fn new(
        ledger: MonthlyLedger,
        guard: OwnershipGuard,
        resolver: IdentityResolver,
        max_batch_size: usize,
    ) -> Self {
        Self {
            ledger,
            guard,
            resolver,
            max_batch_size,
        }
    }

    fn check_batch_size(&self, size: usize) -> Result<()> {
        if size > self.max_batch_size {
            return Err(Error::BatchTooLarge {
                size,
                max: self.max_batch_size,
            });
        }
        Ok(())
    }

    /// Set attitude to `value` for every id (absolute, idempotent)
    pub async fn bulk_set_attitude(
        &self,
        ids: &[i64],
        value: i64,
        period: Period,
        scope: &Scope,
        updated_by: Option<i64>,
    ) -> Result<BulkOutcome> {
        let changes = StatChanges {
            attitude: Some(FieldChange::Set(value)),
            updated_by,
            ..Default::default()
        };
        let items = ids.iter().map(|id| (*id, changes.clone())).collect();
        self.apply("set_attitude", items, period, scope).await
    }

    /// Reset mistakes to zero for every id
    pub async fn bulk_reset_mistakes(
        &self,
        ids: &[i64],
        period: Period,
        scope: &Scope,
        updated_by: Option<i64>,
    ) -> Result<BulkOutcome> {
        let changes = StatChanges {
            mistakes: Some(FieldChange::Set(0)),
            updated_by,
            ..Default::default()
        };
        let items = ids.iter().map(|id| (*id, changes.clone())).collect();
        self.apply("reset_mistakes", items, period, scope).await
    }

    /// Apply per-presenter field updates
    pub async fn bulk_update_stats(
        &self,
        updates: &[GpStatsUpdate],
        period: Period,
        scope: &Scope,
        updated_by: Option<i64>,
    ) -> Result<BulkOutcome> {
        let items = updates
            .iter()
            .map(|update| (update.gp_id, update.changes(updated_by)))
            .collect();
        self.apply("update_stats", items, period, scope).await
    }

    async fn apply(
        &self,
        operation: &str,
        items: Vec<(i64, StatChanges)>,
        period: Period,
        scope: &Scope,
    ) -> Result<BulkOutcome> {
        self.check_batch_size(items.len())?;

        let ids: Vec<i64> = items.iter().map(|(id, _)| *id).collect();
        let report = self.guard.verify(&ids, scope).await?;

        let mut outcome = BulkOutcome {
            invalid_ids: report.invalid_ids.clone(),
            ..Default::default()
        };

        for (id, changes) in items {
            if report.is_invalid(id) {
                outcome.failed += 1;
                outcome
                    .errors
                    .push(format!("GP {}: not accessible in scope {}", id, scope));
                continue;
            }

            match self.ledger.update(id, period, &changes).await {
                Ok(_) => outcome.success += 1,
                Err(e) => {
                    warn!(
                        operation,
                        gp_id = id,
                        transient = e.is_transient(),
                        error = %e,
                        "Bulk item failed"
                    );
                    outcome.failed += 1;
                    outcome.errors.push(format!("GP {}: {}", id, e));
                }
            }
        }

        info!(
            operation,
            scope = %scope,
            month = period.month,
            year = period.year,
            success = outcome.success,
            failed = outcome.failed,
            "Bulk mutation finished"
        );

        Ok(outcome)
    }

    /// Apply an imported mistake sheet: each name is resolved within `scope`
    /// (never creating presenters) and its mistakes set to the sheet's count.
    pub async fn sync_mistakes(
        &self,
        entries: &[MistakeEntry],
        period: Period,
        scope: &Scope,
        updated_by: Option<i64>,
    ) -> Result<SyncOutcome> {
        let mut outcome = SyncOutcome::default();

        for entry in entries {
            let found = match self.resolver.find_match(&entry.name, scope).await {
                Ok(found) => found,
                Err(Error::InvalidName(_)) => None,
                Err(e) => {
                    outcome.errors.push(format!("{}: {}", entry.name, e));
                    continue;
                }
            };

            let Some(found) = found else {
                outcome.not_found.push(entry.name.clone());
                continue;
            };

            let changes = StatChanges {
                mistakes: Some(FieldChange::Set(entry.count)),
                updated_by,
                ..Default::default()
            };
            match self.ledger.update(found.presenter.id, period, &changes).await {
                Ok(_) => outcome.updated += 1,
                Err(e) => outcome
                    .errors
                    .push(format!("GP {}: {}", found.presenter.id, e)),
            }
        }

        info!(
            scope = %scope,
            updated = outcome.updated,
            not_found = outcome.not_found.len(),
            "Mistake sheet applied"
        );

        Ok(outcome)
    }

    /// Administrative month-wide reset within `scope`
    pub async fn clear_month(
        &self,
        period: Period,
        scope: &Scope,
        updated_by: Option<i64>,
    ) -> Result<u64> {
        self.ledger.clear_month(scope, period, updated_by).await
    }
}
