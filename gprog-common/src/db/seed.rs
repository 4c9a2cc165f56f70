//! Reference data for a fresh installation
//!
//! Seeds styles, sample categories, announcers and stations. Seeding is
//! skipped entirely once any style exists, so it is safe to request on
//! every startup.

use crate::time::now;
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

const STYLES: [&str; 20] = [
    "Pop", "Rock", "MPB", "Sertanejo", "Funk", "Eletrônica", "Jazz", "Blues", "Reggae",
    "Hip Hop", "R&B", "Country", "Folk", "Classical", "Gospel", "Forró", "Axé", "Pagode",
    "Samba", "Bossa Nova",
];

const CATEGORIES: [(&str, &str, &str); 5] = [
    ("01", "Internacional Lenta FB", "Músicas internacionais lentas para Facebook"),
    ("02", "Nacional Pop", "Músicas nacionais pop"),
    ("03", "Rock Clássico", "Rock clássico nacional e internacional"),
    ("04", "MPB Contemporânea", "MPB contemporânea"),
    ("05", "Sertanejo Atual", "Sertanejo atual e universitário"),
];

const ANNOUNCERS: [(&str, &str); 5] = [
    ("Locutor 1", "João"),
    ("Locutor 2", "Maria"),
    ("Locutor 3", "Zé"),
    ("Locutor 4", "Ana"),
    ("Locutor 5", "Carlos"),
];

const STATIONS: [(&str, &str, &str); 5] = [
    ("Radio 1", "Educadora", "FM 104.9"),
    ("Radio 2", "Nativa", "FM 95.3"),
    ("Radio 3", "Band", "FM 96.1"),
    ("Radio 4", "Jovem Pan", "FM 100.9"),
    ("Radio 5", "Mix", "FM 106.3"),
];

/// Counts of rows inserted by [`seed_reference_data`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub styles: usize,
    pub categories: usize,
    pub announcers: usize,
    pub stations: usize,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Insert reference data unless the database is already seeded
pub async fn seed_reference_data(pool: &SqlitePool) -> Result<SeedReport> {
    let mut tx = super::begin_write(pool).await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM styles")
        .fetch_one(&mut *tx)
        .await?;
    if existing > 0 {
        info!("Database already seeded; skipping reference data");
        return Ok(SeedReport::default());
    }

    let ts = now();

    for name in STYLES {
        sqlx::query("INSERT INTO styles (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(ts)
            .execute(&mut *tx)
            .await?;
    }

    for (code, name, description) in CATEGORIES {
        sqlx::query(
            "INSERT OR IGNORE INTO categories (code, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(code)
        .bind(name)
        .bind(description)
        .bind(ts)
        .bind(ts)
        .execute(&mut *tx)
        .await?;
    }

    for (code, name) in ANNOUNCERS {
        sqlx::query(
            "INSERT OR IGNORE INTO announcers (code, name, active, created_at, updated_at)
             VALUES (?, ?, 1, ?, ?)",
        )
        .bind(code)
        .bind(name)
        .bind(ts)
        .bind(ts)
        .execute(&mut *tx)
        .await?;
    }

    for (code, name, frequency) in STATIONS {
        sqlx::query(
            "INSERT OR IGNORE INTO stations (code, name, frequency, active, created_at, updated_at)
             VALUES (?, ?, ?, 1, ?, ?)",
        )
        .bind(code)
        .bind(name)
        .bind(frequency)
        .bind(ts)
        .bind(ts)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let report = SeedReport {
        styles: STYLES.len(),
        categories: CATEGORIES.len(),
        announcers: ANNOUNCERS.len(),
        stations: STATIONS.len(),
    };
    info!(?report, "Seeded reference data");

    Ok(report)
}
