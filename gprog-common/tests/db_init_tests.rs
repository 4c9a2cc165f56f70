//! Tests for database initialization and seed data

use gprog_common::db::{init_database, seed_reference_data};
use tempfile::TempDir;

const EXPECTED_TABLES: [&str; 17] = [
    "announcer_stations",
    "announcers",
    "bank_entries",
    "categories",
    "commercials",
    "complements",
    "generated_programs",
    "grid_category_slots",
    "grid_interval_markers",
    "grids",
    "interpreters",
    "jingles",
    "song_titles",
    "songs",
    "stations",
    "styles",
    "tracks",
];

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("gprog.db");

    let pool = init_database(&db_path).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_all_tables_created() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("gprog.db")).await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(tables, EXPECTED_TABLES);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("gprog.db");

    let first = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO styles (name, created_at) VALUES ('Rock', '2024-01-01T00:00:00Z')")
        .execute(&first)
        .await
        .unwrap();
    first.close().await;

    // Re-running schema creation keeps existing rows
    let second = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM styles")
        .fetch_one(&second)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("gprog.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO grid_category_slots (grid_id, category_id, position, created_at)
         VALUES (999, 999, 1, '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Orphan grid slot should violate foreign key");
}

#[tokio::test]
async fn test_bank_speed_check_constraint() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("gprog.db")).await.unwrap();
    seed_reference_data(&pool).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO bank_entries (station_id, announcer_id, interpreter, speed, created_at, updated_at)
         VALUES (1, 1, 'X', 6, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Speed 6 should violate CHECK constraint");
}

#[tokio::test]
async fn test_seed_inserts_reference_data_once() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("gprog.db")).await.unwrap();

    let report = seed_reference_data(&pool).await.unwrap();
    assert_eq!(report.styles, 20);
    assert_eq!(report.categories, 5);
    assert_eq!(report.announcers, 5);
    assert_eq!(report.stations, 5);

    let again = seed_reference_data(&pool).await.unwrap();
    assert!(again.is_empty(), "Second seed should be skipped");

    let stations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stations, 5);
}
