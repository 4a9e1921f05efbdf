//! Database models

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Columns selected for a [`GamePresenter`]
pub const PRESENTER_COLUMNS: &str =
    "id, display_name, canonical_name, team_id, owner_id, created_at";

/// Columns selected for a [`MonthlyStat`]
pub const MONTHLY_STAT_COLUMNS: &str = "id, presenter_id, month, year, attitude, mistakes, \
     total_games, notes, team_id, owner_id, updated_by, updated_at";

/// A game presenter on the roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePresenter {
    pub id: i64,
    /// Name as first received, shown in the UI
    pub display_name: String,
    /// Normalized form used only for matching
    pub canonical_name: String,
    pub team_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl GamePresenter {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let created_at: String = row.try_get("created_at")?;

        Ok(Self {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
            canonical_name: row.try_get("canonical_name")?,
            team_id: row.try_get("team_id")?,
            owner_id: row.try_get("owner_id")?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

/// Cumulative ledger row for one presenter and one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStat {
    pub id: i64,
    pub presenter_id: i64,
    pub month: u32,
    pub year: i32,
    /// Signed running total of +1/-1 attitude events
    pub attitude: i64,
    pub mistakes: i64,
    pub total_games: i64,
    pub notes: Option<String>,
    pub team_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl MonthlyStat {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let month: i64 = row.try_get("month")?;
        let year: i64 = row.try_get("year")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Self {
            id: row.try_get("id")?,
            presenter_id: row.try_get("presenter_id")?,
            month: u32::try_from(month)
                .map_err(|_| Error::Internal(format!("Stored month out of range: {}", month)))?,
            year: i32::try_from(year)
                .map_err(|_| Error::Internal(format!("Stored year out of range: {}", year)))?,
            attitude: row.try_get("attitude")?,
            mistakes: row.try_get("mistakes")?,
            total_games: row.try_get("total_games")?,
            notes: row.try_get("notes")?,
            team_id: row.try_get("team_id")?,
            owner_id: row.try_get("owner_id")?,
            updated_by: row.try_get("updated_by")?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

/// Current time in the fixed-width RFC 3339 form stored in TEXT columns.
///
/// Fixed width (microseconds, `Z` suffix) keeps lexical order equal to
/// chronological order, which the roster relies on for earliest-created ordering.
pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp {:?}: {}", value, e)))
}
