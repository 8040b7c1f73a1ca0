//! History durability across process restarts and the retention window.

use chrono::{Duration, Utc};
use tempfile::tempdir;
use vigil::storage::SqliteStore;

use super::helpers::sample_at;

#[tokio::test]
async fn test_history_survives_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("history.db");

    let store = SqliteStore::open(&db_path).await.unwrap();
    for i in 0..5 {
        store
            .insert(&sample_at(Utc::now(), 10.0 * i as f32, 20.0, 30.0))
            .await
            .unwrap();
    }
    store.close().await;

    let reopened = SqliteStore::open(&db_path).await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_thirty_day_sweep_retires_only_stale_history() {
    let temp_dir = tempdir().unwrap();
    let store = SqliteStore::open(temp_dir.path().join("history.db"))
        .await
        .unwrap();

    let now = Utc::now();

    // Five samples well past the window, five within it.
    for days in [31, 40, 60, 90, 365] {
        store
            .insert(&sample_at(now - Duration::days(days), 50.0, 50.0, 50.0))
            .await
            .unwrap();
    }
    for days in [0, 1, 7, 14, 29] {
        store
            .insert(&sample_at(now - Duration::days(days), 50.0, 50.0, 50.0))
            .await
            .unwrap();
    }

    let cutoff = now - Duration::days(30);
    let deleted = store.delete_older_than(cutoff).await.unwrap();

    assert_eq!(deleted, 5);
    assert_eq!(store.count().await.unwrap(), 5);

    // A second sweep with the same cutoff finds nothing left to retire.
    assert_eq!(store.delete_older_than(cutoff).await.unwrap(), 0);
}
