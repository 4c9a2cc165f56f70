//! Jingles and tracks
//!
//! Both are short audio pieces sharing one shape; they live in separate
//! tables distinguished by [`SpotKind`] and default code (`VH` / `TR`).

use super::{non_empty, require_text};
use chrono::{DateTime, NaiveTime, Utc};
use gprog_common::db::begin_write;
use gprog_common::time::{now, parse_optional_time};
use gprog_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

const COLUMNS: &str = "id, code, name, kind, duration, typed_duration, audio_file, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotKind {
    Jingle,
    Track,
}

impl SpotKind {
    fn table(self) -> &'static str {
        match self {
            SpotKind::Jingle => "jingles",
            SpotKind::Track => "tracks",
        }
    }

    pub fn default_code(self) -> &'static str {
        match self {
            SpotKind::Jingle => "VH",
            SpotKind::Track => "TR",
        }
    }

    fn label(self) -> &'static str {
        match self {
            SpotKind::Jingle => "Jingle",
            SpotKind::Track => "Track",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Spot {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub kind: Option<String>,
    pub duration: Option<NaiveTime>,
    /// Duration as typed by the operator, kept verbatim
    pub typed_duration: Option<String>,
    pub audio_file: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
    /// `HH:MM[:SS]`
    pub duration: Option<String>,
    pub typed_duration: Option<String>,
    pub audio_file: Option<String>,
}

async fn fetch(conn: &mut SqliteConnection, spot: SpotKind, id: i64) -> Result<Spot> {
    sqlx::query_as::<_, Spot>(&format!("SELECT {} FROM {} WHERE id = ?", COLUMNS, spot.table()))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("{} {} not found", spot.label(), id)))
}

pub async fn list(pool: &SqlitePool, spot: SpotKind) -> Result<Vec<Spot>> {
    let spots = sqlx::query_as::<_, Spot>(&format!(
        "SELECT {} FROM {} ORDER BY id",
        COLUMNS,
        spot.table()
    ))
    .fetch_all(pool)
    .await?;
    Ok(spots)
}

pub async fn get(pool: &SqlitePool, spot: SpotKind, id: i64) -> Result<Spot> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, spot, id).await
}

pub async fn create(pool: &SqlitePool, spot: SpotKind, input: SpotInput) -> Result<Spot> {
    let name = require_text("name", input.name)?;
    let duration = parse_optional_time("duration", input.duration.as_deref())?;

    let mut tx = begin_write(pool).await?;
    let ts = now();
    let id = sqlx::query(&format!(
        "INSERT INTO {} (code, name, kind, duration, typed_duration, audio_file, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        spot.table()
    ))
    .bind(non_empty(input.code).unwrap_or_else(|| spot.default_code().to_string()))
    .bind(&name)
    .bind(non_empty(input.kind))
    .bind(duration)
    .bind(non_empty(input.typed_duration))
    .bind(non_empty(input.audio_file))
    .bind(ts)
    .bind(ts)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let created = fetch(&mut tx, spot, id).await?;
    tx.commit().await?;

    info!(id, table = spot.table(), name = %created.name, "Created spot");
    Ok(created)
}

pub async fn update(pool: &SqlitePool, spot: SpotKind, id: i64, input: SpotInput) -> Result<Spot> {
    let duration = parse_optional_time("duration", input.duration.as_deref())?;

    let mut tx = begin_write(pool).await?;
    let existing = fetch(&mut tx, spot, id).await?;

    sqlx::query(&format!(
        "UPDATE {} SET code = ?, name = ?, kind = ?, duration = ?, typed_duration = ?,
             audio_file = ?, updated_at = ?
         WHERE id = ?",
        spot.table()
    ))
    .bind(non_empty(input.code).unwrap_or(existing.code))
    .bind(non_empty(input.name).unwrap_or(existing.name))
    .bind(non_empty(input.kind).or(existing.kind))
    .bind(duration.or(existing.duration))
    .bind(non_empty(input.typed_duration).or(existing.typed_duration))
    .bind(non_empty(input.audio_file).or(existing.audio_file))
    .bind(now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let updated = fetch(&mut tx, spot, id).await?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn delete(pool: &SqlitePool, spot: SpotKind, id: i64) -> Result<()> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", spot.table()))
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("{} {} not found", spot.label(), id)));
    }
    info!(id, table = spot.table(), "Deleted spot");
    Ok(())
}
