use chrono::NaiveDate;
use quiz_core::model::TestResult;
use storage::repository::{HistoryRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn result(day: u32, score: u32, passed: bool) -> TestResult {
    TestResult::new(
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        score,
        5,
        passed,
        600,
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_history_roundtrip_keeps_order() {
    let repo = connect("memdb_history_roundtrip").await;
    assert!(repo.load_history().await.unwrap().is_empty());

    let history = vec![result(3, 5, true), result(2, 3, false), result(1, 4, false)];
    repo.save_history(&history).await.unwrap();

    let loaded = repo.load_history().await.unwrap();
    assert_eq!(loaded, history);
}

#[tokio::test]
async fn sqlite_save_overwrites_single_record() {
    let repo = connect("memdb_history_overwrite").await;
    repo.save_history(&[result(1, 5, true)]).await.unwrap();
    repo.save_history(&[]).await.unwrap();

    assert!(repo.load_history().await.unwrap().is_empty());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_history_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    repo.save_history(&[result(4, 2, false)]).await.unwrap();
    assert_eq!(repo.load_history().await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_corrupt_record_surfaces_serialization_error() {
    let repo = connect("memdb_history_corrupt").await;
    repo.put_raw_history("[{\"date\": 12}]").await.unwrap();

    let err = repo.load_history().await.unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
}
