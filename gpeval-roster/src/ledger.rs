//! Monthly cumulative ledger
//!
//! One `monthly_stats` row per (presenter, month, year), created lazily with zero
//! counters. Deltas are applied by the database in a single statement
//! (`attitude = attitude + ?`), never as a read-modify-write in this process, so
//! concurrent +1s are never lost.

use crate::roster::push_scope_condition;
use gpeval_common::db::{timestamp_now, MonthlyStat, MONTHLY_STAT_COLUMNS};
use gpeval_common::{Error, Result, Scope};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};

/// Oldest year accepted for a ledger period
pub const MIN_YEAR: i32 = 2020;
/// Newest year accepted for a ledger period
pub const MAX_YEAR: i32 = 2100;
/// Longest history window
pub const MAX_HISTORY_MONTHS: u32 = 24;

/// A validated calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Period {
    pub month: u32,
    pub year: i32,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidInput(format!(
                "month must be within 1..=12, got {}",
                month
            )));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(Error::InvalidInput(format!(
                "year must be within {}..={}, got {}",
                MIN_YEAR, MAX_YEAR, year
            )));
        }
        Ok(Self { month, year })
    }

    fn index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_index(index: i64) -> Self {
        Self {
            month: (index.rem_euclid(12) + 1) as u32,
            year: index.div_euclid(12) as i32,
        }
    }

    /// The period `months` before this one
    pub fn months_before(&self, months: u32) -> Self {
        Self::from_index(self.index() - i64::from(months))
    }
}

/// How a numeric field changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldChange {
    /// Write the literal value (idempotent)
    Set(i64),
    /// Add to the stored value inside the database
    Add(i64),
}

/// Partial update of a ledger row; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatChanges {
    pub attitude: Option<FieldChange>,
    pub mistakes: Option<FieldChange>,
    pub total_games: Option<FieldChange>,
    /// `Some(None)` clears the notes
    pub notes: Option<Option<String>>,
    pub updated_by: Option<i64>,
}

impl StatChanges {
    pub fn is_empty(&self) -> bool {
        self.attitude.is_none()
            && self.mistakes.is_none()
            && self.total_games.is_none()
            && self.notes.is_none()
            && self.updated_by.is_none()
    }

    fn validate(&self) -> Result<()> {
        for (field, change) in [("mistakes", self.mistakes), ("total_games", self.total_games)] {
            if let Some(FieldChange::Set(value)) = change {
                if value < 0 {
                    return Err(Error::InvalidInput(format!(
                        "{} cannot be negative, got {}",
                        field, value
                    )));
                }
            }
        }
        Ok(())
    }
}

fn push_change(
    qb: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    change: FieldChange,
    non_negative: bool,
) {
    qb.push(", ").push(column).push(" = ");
    match change {
        FieldChange::Set(value) => {
            qb.push_bind(value);
        }
        FieldChange::Add(delta) if non_negative => {
            qb.push("MAX(0, ").push(column).push(" + ").push_bind(delta).push(")");
        }
        FieldChange::Add(delta) => {
            qb.push(column).push(" + ").push_bind(delta);
        }
    }
}

/// Ledger row joined with the presenter's display name
#[derive(Debug, Clone, Serialize)]
pub struct PeriodEntry {
    pub display_name: String,
    #[serde(flatten)]
    pub stat: MonthlyStat,
}

/// One month of a presenter's history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub month: u32,
    pub year: i32,
    pub attitude: i64,
    pub mistakes: i64,
    pub total_games: i64,
    /// False when no ledger row exists for the month
    pub recorded: bool,
}

/// Per-(presenter, month, year) cumulative record store
#[derive(Clone)]
pub struct MonthlyLedger {
    db: SqlitePool,
}

impl MonthlyLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Fetch the row for a period, creating it with zero counters if absent
    ///
    /// Concurrent first creations collapse onto one row: the loser's insert is a
    /// no-op on the unique key and the following read returns the winner's row.
    pub async fn get_or_create(&self, presenter_id: i64, period: Period) -> Result<MonthlyStat> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO monthly_stats (presenter_id, month, year, team_id, owner_id, updated_at)
            SELECT id, ?, ?, team_id, owner_id, ? FROM presenters WHERE id = ?
            ON CONFLICT (presenter_id, month, year) DO NOTHING
            "#,
        )
        .bind(i64::from(period.month))
        .bind(i64::from(period.year))
        .bind(timestamp_now())
        .bind(presenter_id)
        .execute(&self.db)
        .await?;

        if inserted.rows_affected() > 0 {
            debug!(
                presenter_id,
                month = period.month,
                year = period.year,
                "Created monthly stats row"
            );
        }

        self.get(presenter_id, period)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Game presenter {}", presenter_id)))
    }

    /// Fetch the row for a period without creating it
    pub async fn get(&self, presenter_id: i64, period: Period) -> Result<Option<MonthlyStat>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM monthly_stats WHERE presenter_id = ? AND month = ? AND year = ?",
            MONTHLY_STAT_COLUMNS
        ))
        .bind(presenter_id)
        .bind(i64::from(period.month))
        .bind(i64::from(period.year))
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(MonthlyStat::from_row).transpose()
    }

    /// Apply a partial update and return the row as stored afterwards
    pub async fn update(
        &self,
        presenter_id: i64,
        period: Period,
        changes: &StatChanges,
    ) -> Result<MonthlyStat> {
        changes.validate()?;

        let current = self.get_or_create(presenter_id, period).await?;
        if changes.is_empty() {
            return Ok(current);
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE monthly_stats SET updated_at = ");
        qb.push_bind(timestamp_now());

        if let Some(change) = changes.attitude {
            push_change(&mut qb, "attitude", change, false);
        }
        if let Some(change) = changes.mistakes {
            push_change(&mut qb, "mistakes", change, true);
        }
        if let Some(change) = changes.total_games {
            push_change(&mut qb, "total_games", change, true);
        }
        if let Some(notes) = &changes.notes {
            qb.push(", notes = ").push_bind(notes.clone());
        }
        if let Some(user_id) = changes.updated_by {
            qb.push(", updated_by = ").push_bind(user_id);
        }

        qb.push(" WHERE id = ").push_bind(current.id);
        qb.push(" RETURNING ").push(MONTHLY_STAT_COLUMNS);

        let row = qb.build().fetch_one(&self.db).await?;
        MonthlyStat::from_row(&row)
    }

    /// Add `delta` to the cumulative attitude and return the new row
    pub async fn adjust_attitude(
        &self,
        presenter_id: i64,
        period: Period,
        delta: i64,
        updated_by: Option<i64>,
    ) -> Result<MonthlyStat> {
        let changes = StatChanges {
            attitude: Some(FieldChange::Add(delta)),
            updated_by,
            ..Default::default()
        };
        self.update(presenter_id, period, &changes).await
    }

    /// Count one more mistake for the period
    pub async fn increment_mistakes(
        &self,
        presenter_id: i64,
        period: Period,
        updated_by: Option<i64>,
    ) -> Result<MonthlyStat> {
        let changes = StatChanges {
            mistakes: Some(FieldChange::Add(1)),
            updated_by,
            ..Default::default()
        };
        self.update(presenter_id, period, &changes).await
    }

    /// All rows for a period visible in `scope`, ordered by presenter name
    pub async fn list_for_period(&self, scope: &Scope, period: Period) -> Result<Vec<PeriodEntry>> {
        let columns = MONTHLY_STAT_COLUMNS
            .split(", ")
            .map(|c| format!("s.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {}, p.display_name FROM monthly_stats s \
             JOIN presenters p ON p.id = s.presenter_id WHERE ",
            columns
        ));
        push_scope_condition(&mut qb, scope, "s.");
        qb.push(" AND s.month = ").push_bind(i64::from(period.month));
        qb.push(" AND s.year = ").push_bind(i64::from(period.year));
        qb.push(" ORDER BY p.display_name COLLATE NOCASE, s.presenter_id");

        let rows = qb.build().fetch_all(&self.db).await?;
        rows.iter()
            .map(|row| -> Result<PeriodEntry> {
                Ok(PeriodEntry {
                    display_name: row.try_get("display_name")?,
                    stat: MonthlyStat::from_row(row)?,
                })
            })
            .collect()
    }

    /// The last `months` periods up to and including `until`, oldest first
    ///
    /// Months without a ledger row are reported with zero counters; nothing is
    /// created.
    pub async fn history(
        &self,
        presenter_id: i64,
        months: u32,
        until: Period,
    ) -> Result<Vec<MonthSummary>> {
        if !(1..=MAX_HISTORY_MONTHS).contains(&months) {
            return Err(Error::InvalidInput(format!(
                "history window must be within 1..={} months, got {}",
                MAX_HISTORY_MONTHS, months
            )));
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM presenters WHERE id = ?)")
            .bind(presenter_id)
            .fetch_one(&self.db)
            .await?;
        if !exists {
            return Err(Error::NotFound(format!("Game presenter {}", presenter_id)));
        }

        let from = until.months_before(months - 1);
        let rows = sqlx::query(&format!(
            "SELECT {} FROM monthly_stats \
             WHERE presenter_id = ? AND (year * 12 + month - 1) BETWEEN ? AND ?",
            MONTHLY_STAT_COLUMNS
        ))
        .bind(presenter_id)
        .bind(from.index())
        .bind(until.index())
        .fetch_all(&self.db)
        .await?;

        let mut by_period: HashMap<(u32, i32), MonthlyStat> = HashMap::new();
        for row in &rows {
            let stat = MonthlyStat::from_row(row)?;
            by_period.insert((stat.month, stat.year), stat);
        }

        Ok((0..months)
            .rev()
            .map(|back| {
                let period = until.months_before(back);
                match by_period.get(&(period.month, period.year)) {
                    Some(stat) => MonthSummary {
                        month: period.month,
                        year: period.year,
                        attitude: stat.attitude,
                        mistakes: stat.mistakes,
                        total_games: stat.total_games,
                        recorded: true,
                    },
                    None => MonthSummary {
                        month: period.month,
                        year: period.year,
                        attitude: 0,
                        mistakes: 0,
                        total_games: 0,
                        recorded: false,
                    },
                }
            })
            .collect())
    }

    /// Reset every counter and note for a period within `scope`
    ///
    /// Administrative month-wide clear; rows are kept so the period still exists.
    pub async fn clear_month(
        &self,
        scope: &Scope,
        period: Period,
        updated_by: Option<i64>,
    ) -> Result<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "UPDATE monthly_stats SET attitude = 0, mistakes = 0, total_games = 0, notes = NULL, updated_by = ",
        );
        qb.push_bind(updated_by);
        qb.push(", updated_at = ").push_bind(timestamp_now());
        qb.push(" WHERE month = ").push_bind(i64::from(period.month));
        qb.push(" AND year = ").push_bind(i64::from(period.year));
        qb.push(" AND ");
        push_scope_condition(&mut qb, scope, "");

        let cleared = qb.build().execute(&self.db).await?.rows_affected();
        info!(
            scope = %scope,
            month = period.month,
            year = period.year,
            rows = cleared,
            "Cleared monthly stats"
        );
        Ok(cleared)
    }
}
