//! Database initialization
//!
//! Opens (or creates) the catalog database and brings the schema up to
//! date. Every statement is `CREATE … IF NOT EXISTS`, so running it against
//! an existing database is a no-op.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every pooled connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas go on the connect options so every pooled connection gets
    // them, not just the first one.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every catalog table and index
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Reference entities
    create_categories_table(pool).await?;
    create_styles_table(pool).await?;
    create_songs_table(pool).await?;
    create_announcers_table(pool).await?;
    create_stations_table(pool).await?;

    // Announcer/station authorization and the announcement bank
    create_announcer_stations_table(pool).await?;
    create_bank_entries_table(pool).await?;

    // Program grids and their owned rows
    create_grids_tables(pool).await?;
    create_generated_programs_table(pool).await?;

    // Autocomplete vocabularies
    for table in ["interpreters", "song_titles", "complements"] {
        create_vocabulary_table(pool, table).await?;
    }

    // Jingles, tracks and commercials
    create_spot_tables(pool).await?;

    info!("Database schema ready");
    Ok(())
}

async fn create_categories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_styles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS styles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            interpreter1 TEXT NOT NULL,
            interpreter2 TEXT,
            interpreter3 TEXT,
            title TEXT NOT NULL,
            kind TEXT,
            category_id INTEGER REFERENCES categories(id),
            speed INTEGER,
            style_id INTEGER REFERENCES styles(id),
            release_year INTEGER,
            complement TEXT,
            interpreter1_birthday TEXT,
            interpreter2_birthday TEXT,
            interpreter3_birthday TEXT,
            default_duration TEXT NOT NULL DEFAULT '00:03:30',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_category ON songs(category_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_style ON songs(style_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_announcers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS announcers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_stations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            frequency TEXT,
            city TEXT,
            state TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_announcer_stations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS announcer_stations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            announcer_id INTEGER NOT NULL REFERENCES announcers(id),
            station_id INTEGER NOT NULL REFERENCES stations(id),
            active INTEGER NOT NULL DEFAULT 1,
            start_date TEXT,
            end_date TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (announcer_id, station_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_announcer_stations_station ON announcer_stations(station_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_bank_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bank_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            station_id INTEGER NOT NULL REFERENCES stations(id),
            announcer_id INTEGER NOT NULL REFERENCES announcers(id),
            interpreter TEXT NOT NULL,
            speed INTEGER NOT NULL CHECK (speed >= 1 AND speed <= 5),
            script TEXT,
            audio_file TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_bank_entries_pair ON bank_entries(station_id, announcer_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_grids_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grids (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            all_days INTEGER NOT NULL DEFAULT 0,
            monday_friday INTEGER NOT NULL DEFAULT 0,
            tuesday INTEGER NOT NULL DEFAULT 0,
            wednesday INTEGER NOT NULL DEFAULT 0,
            thursday INTEGER NOT NULL DEFAULT 0,
            friday INTEGER NOT NULL DEFAULT 0,
            saturday INTEGER NOT NULL DEFAULT 0,
            sunday INTEGER NOT NULL DEFAULT 0,
            weekend INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grid_category_slots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            grid_id INTEGER NOT NULL REFERENCES grids(id) ON DELETE CASCADE,
            category_id INTEGER NOT NULL REFERENCES categories(id),
            position INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grid_interval_markers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            grid_id INTEGER NOT NULL REFERENCES grids(id) ON DELETE CASCADE,
            at_time TEXT NOT NULL,
            kind TEXT NOT NULL,
            duration TEXT NOT NULL,
            position INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_grid_slots_grid ON grid_category_slots(grid_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_grid_markers_grid ON grid_interval_markers(grid_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_generated_programs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS generated_programs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            program_date TEXT NOT NULL,
            grid_id INTEGER REFERENCES grids(id) ON DELETE SET NULL,
            content TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Vocabulary tables share one shape; `table` is always a compiled-in name
async fn create_vocabulary_table(pool: &SqlitePool, table: &str) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            value TEXT NOT NULL UNIQUE,
            usage_count INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        table
    ))
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_spot_tables(pool: &SqlitePool) -> Result<()> {
    for (table, default_code) in [("jingles", "VH"), ("tracks", "TR")] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL DEFAULT '{}',
                name TEXT NOT NULL,
                kind TEXT,
                duration TEXT,
                typed_duration TEXT,
                audio_file TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            table, default_code
        ))
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS commercials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL DEFAULT 'COM',
            title TEXT NOT NULL,
            client TEXT NOT NULL,
            duration TEXT,
            typed_duration TEXT,
            audio_file TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
