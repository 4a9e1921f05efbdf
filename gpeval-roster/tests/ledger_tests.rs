//! Integration tests for the monthly ledger
//!
//! Tests cover:
//! - Lazy row creation and race safety of first access
//! - Lost-update freedom of concurrent attitude deltas
//! - Counter floors, notes, scope columns copied from the presenter
//! - Period listing, history windows and month-wide clears

use gpeval_common::{Error, Scope};
use gpeval_roster::ledger::{FieldChange, MonthlyLedger, Period, StatChanges};
use gpeval_roster::roster::Roster;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::task::JoinSet;

async fn setup_test_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("Should create temp dir");
    let pool = gpeval_common::db::init_database(&dir.path().join("gpeval.db"))
        .await
        .expect("Should initialize database");
    (dir, pool)
}

/// Test helper: insert a presenter and return its id
async fn add_presenter(pool: &SqlitePool, name: &str, scope: Scope) -> i64 {
    let roster = Roster::new(pool.clone(), false);
    let (presenter, _) = roster
        .find_or_insert(name, &name.to_lowercase(), &scope)
        .await
        .expect("Should insert presenter");
    presenter.id
}

async fn stat_rows(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM monthly_stats")
        .fetch_one(pool)
        .await
        .expect("Should count rows")
}

fn june() -> Period {
    Period::new(6, 2025).unwrap()
}

// =============================================================================
// Row creation
// =============================================================================

#[tokio::test]
async fn test_get_or_create_starts_at_zero_with_presenter_scope() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let gp = add_presenter(&pool, "Kirke Kirs", Scope::Team(5)).await;

    let stat = ledger.get_or_create(gp, june()).await.unwrap();
    assert_eq!(stat.presenter_id, gp);
    assert_eq!((stat.month, stat.year), (6, 2025));
    assert_eq!((stat.attitude, stat.mistakes, stat.total_games), (0, 0, 0));
    assert_eq!(stat.team_id, Some(5));
    assert_eq!(stat.owner_id, None);
    assert_eq!(stat.notes, None);

    let again = ledger.get_or_create(gp, june()).await.unwrap();
    assert_eq!(again.id, stat.id);
    assert_eq!(stat_rows(&pool).await, 1);
}

#[tokio::test]
async fn test_get_or_create_unknown_presenter_is_not_found() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());

    let err = ledger.get_or_create(4242, june()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(stat_rows(&pool).await, 0);
}

#[tokio::test]
async fn test_get_does_not_create() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let gp = add_presenter(&pool, "Kirke Kirs", Scope::Team(5)).await;

    assert!(ledger.get(gp, june()).await.unwrap().is_none());
    assert_eq!(stat_rows(&pool).await, 0);
}

#[tokio::test]
async fn test_concurrent_get_or_create_yields_one_row() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let gp = add_presenter(&pool, "Kirke Kirs", Scope::Team(5)).await;

    let mut tasks = JoinSet::new();
    for _ in 0..20 {
        let ledger = ledger.clone();
        tasks.spawn(async move { ledger.get_or_create(gp, june()).await });
    }

    let mut ids = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let stat = joined.expect("task panicked").expect("get_or_create failed");
        ids.push(stat.id);
    }

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(stat_rows(&pool).await, 1);
}

// =============================================================================
// Deltas and absolute updates
// =============================================================================

#[tokio::test]
async fn test_concurrent_attitude_increments_are_not_lost() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let gp = add_presenter(&pool, "Kirke Kirs", Scope::Team(5)).await;

    let n = 25;
    let mut tasks = JoinSet::new();
    for _ in 0..n {
        let ledger = ledger.clone();
        tasks.spawn(async move { ledger.adjust_attitude(gp, june(), 1, Some(3)).await });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.expect("task panicked").expect("adjust failed");
    }

    let stat = ledger.get(gp, june()).await.unwrap().unwrap();
    assert_eq!(stat.attitude, n);
    assert_eq!(stat.updated_by, Some(3));
}

#[tokio::test]
async fn test_attitude_may_go_negative() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let gp = add_presenter(&pool, "Kirke Kirs", Scope::Team(5)).await;

    ledger.adjust_attitude(gp, june(), -1, None).await.unwrap();
    let stat = ledger.adjust_attitude(gp, june(), -1, None).await.unwrap();
    assert_eq!(stat.attitude, -2);
}

#[tokio::test]
async fn test_mistake_deltas_clamp_at_zero() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let gp = add_presenter(&pool, "Kirke Kirs", Scope::Team(5)).await;

    ledger.increment_mistakes(gp, june(), None).await.unwrap();
    let stat = ledger.increment_mistakes(gp, june(), None).await.unwrap();
    assert_eq!(stat.mistakes, 2);

    let changes = StatChanges {
        mistakes: Some(FieldChange::Add(-5)),
        ..Default::default()
    };
    let stat = ledger.update(gp, june(), &changes).await.unwrap();
    assert_eq!(stat.mistakes, 0);
}

#[tokio::test]
async fn test_negative_absolute_value_is_rejected() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let gp = add_presenter(&pool, "Kirke Kirs", Scope::Team(5)).await;

    let changes = StatChanges {
        total_games: Some(FieldChange::Set(-1)),
        ..Default::default()
    };
    let err = ledger.update(gp, june(), &changes).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(stat_rows(&pool).await, 0);
}

#[tokio::test]
async fn test_partial_update_leaves_other_fields() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let gp = add_presenter(&pool, "Kirke Kirs", Scope::Team(5)).await;

    ledger.adjust_attitude(gp, june(), 2, None).await.unwrap();

    let changes = StatChanges {
        total_games: Some(FieldChange::Set(40)),
        notes: Some(Some("late to table".to_string())),
        updated_by: Some(9),
        ..Default::default()
    };
    let stat = ledger.update(gp, june(), &changes).await.unwrap();
    assert_eq!(stat.attitude, 2);
    assert_eq!(stat.total_games, 40);
    assert_eq!(stat.notes.as_deref(), Some("late to table"));
    assert_eq!(stat.updated_by, Some(9));

    let clear = StatChanges {
        notes: Some(None),
        ..Default::default()
    };
    let stat = ledger.update(gp, june(), &clear).await.unwrap();
    assert_eq!(stat.notes, None);
    assert_eq!(stat.total_games, 40);
}

#[tokio::test]
async fn test_months_are_independent() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let gp = add_presenter(&pool, "Kirke Kirs", Scope::Team(5)).await;

    ledger.adjust_attitude(gp, june(), 1, None).await.unwrap();
    let july = ledger
        .adjust_attitude(gp, Period::new(7, 2025).unwrap(), -1, None)
        .await
        .unwrap();

    assert_eq!(july.attitude, -1);
    assert_eq!(ledger.get(gp, june()).await.unwrap().unwrap().attitude, 1);
}

// =============================================================================
// Reads across presenters and months
// =============================================================================

#[tokio::test]
async fn test_list_for_period_respects_scope() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let zed = add_presenter(&pool, "Zed", Scope::Team(5)).await;
    let anna = add_presenter(&pool, "Anna", Scope::Team(5)).await;
    let other = add_presenter(&pool, "Mike", Scope::Team(6)).await;

    for gp in [zed, anna, other] {
        ledger.adjust_attitude(gp, june(), 1, None).await.unwrap();
    }
    ledger
        .adjust_attitude(anna, Period::new(5, 2025).unwrap(), 1, None)
        .await
        .unwrap();

    let team = ledger.list_for_period(&Scope::Team(5), june()).await.unwrap();
    let names: Vec<_> = team.iter().map(|e| e.display_name.as_str()).collect();
    assert_eq!(names, vec!["Anna", "Zed"]);

    let all = ledger.list_for_period(&Scope::Global, june()).await.unwrap();
    assert_eq!(all.len(), 3);

    let none = ledger.list_for_period(&Scope::Owner(5), june()).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_history_fills_missing_months_without_creating_rows() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let gp = add_presenter(&pool, "Kirke Kirs", Scope::Team(5)).await;

    ledger
        .adjust_attitude(gp, Period::new(12, 2024).unwrap(), 3, None)
        .await
        .unwrap();
    ledger
        .increment_mistakes(gp, Period::new(2, 2025).unwrap(), None)
        .await
        .unwrap();

    let history = ledger
        .history(gp, 4, Period::new(2, 2025).unwrap())
        .await
        .unwrap();

    let periods: Vec<_> = history.iter().map(|m| (m.month, m.year)).collect();
    assert_eq!(periods, vec![(11, 2024), (12, 2024), (1, 2025), (2, 2025)]);

    let recorded: Vec<_> = history.iter().map(|m| m.recorded).collect();
    assert_eq!(recorded, vec![false, true, false, true]);
    assert_eq!(history[1].attitude, 3);
    assert_eq!(history[3].mistakes, 1);
    assert_eq!(history[0].attitude, 0);

    assert_eq!(stat_rows(&pool).await, 2);
}

#[tokio::test]
async fn test_history_validates_window_and_presenter() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let gp = add_presenter(&pool, "Kirke Kirs", Scope::Team(5)).await;

    assert!(matches!(
        ledger.history(gp, 0, june()).await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        ledger.history(gp, 25, june()).await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        ledger.history(4242, 6, june()).await,
        Err(Error::NotFound(_))
    ));
    assert_eq!(ledger.history(gp, 24, june()).await.unwrap().len(), 24);
}

#[tokio::test]
async fn test_clear_month_only_touches_scope_and_period() {
    let (_dir, pool) = setup_test_db().await;
    let ledger = MonthlyLedger::new(pool.clone());
    let mine = add_presenter(&pool, "Anna", Scope::Team(5)).await;
    let theirs = add_presenter(&pool, "Mike", Scope::Team(6)).await;
    let may = Period::new(5, 2025).unwrap();

    for gp in [mine, theirs] {
        ledger.adjust_attitude(gp, june(), 4, None).await.unwrap();
        ledger.increment_mistakes(gp, june(), None).await.unwrap();
    }
    ledger.adjust_attitude(mine, may, 2, None).await.unwrap();

    let cleared = ledger.clear_month(&Scope::Team(5), june(), Some(1)).await.unwrap();
    assert_eq!(cleared, 1);

    let stat = ledger.get(mine, june()).await.unwrap().unwrap();
    assert_eq!((stat.attitude, stat.mistakes), (0, 0));
    assert_eq!(stat.updated_by, Some(1));

    assert_eq!(ledger.get(theirs, june()).await.unwrap().unwrap().attitude, 4);
    assert_eq!(ledger.get(mine, may).await.unwrap().unwrap().attitude, 2);
    assert_eq!(stat_rows(&pool).await, 3);
}
