//! Commercial spots

use super::{non_empty, require_text};
use chrono::{DateTime, NaiveTime, Utc};
use gprog_common::db::begin_write;
use gprog_common::time::{now, parse_optional_time};
use gprog_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

const COLUMNS: &str =
    "id, code, title, client, duration, typed_duration, audio_file, created_at, updated_at";

/// Code given to commercials created without one
pub const DEFAULT_CODE: &str = "COM";

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Commercial {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub client: String,
    pub duration: Option<NaiveTime>,
    pub typed_duration: Option<String>,
    pub audio_file: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommercialInput {
    pub code: Option<String>,
    pub title: Option<String>,
    pub client: Option<String>,
    pub duration: Option<String>,
    pub typed_duration: Option<String>,
    pub audio_file: Option<String>,
}

async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Commercial> {
    sqlx::query_as::<_, Commercial>(&format!("SELECT {} FROM commercials WHERE id = ?", COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Commercial {} not found", id)))
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Commercial>> {
    let commercials =
        sqlx::query_as::<_, Commercial>(&format!("SELECT {} FROM commercials ORDER BY id", COLUMNS))
            .fetch_all(pool)
            .await?;
    Ok(commercials)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Commercial> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

pub async fn create(pool: &SqlitePool, input: CommercialInput) -> Result<Commercial> {
    let title = require_text("title", input.title)?;
    let client = require_text("client", input.client)?;
    let duration = parse_optional_time("duration", input.duration.as_deref())?;

    let mut tx = begin_write(pool).await?;
    let ts = now();
    let id = sqlx::query(
        "INSERT INTO commercials
            (code, title, client, duration, typed_duration, audio_file, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(non_empty(input.code).unwrap_or_else(|| DEFAULT_CODE.to_string()))
    .bind(&title)
    .bind(&client)
    .bind(duration)
    .bind(non_empty(input.typed_duration))
    .bind(non_empty(input.audio_file))
    .bind(ts)
    .bind(ts)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let commercial = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, client = %commercial.client, "Created commercial");
    Ok(commercial)
}

pub async fn update(pool: &SqlitePool, id: i64, input: CommercialInput) -> Result<Commercial> {
    let duration = parse_optional_time("duration", input.duration.as_deref())?;

    let mut tx = begin_write(pool).await?;
    let existing = fetch(&mut tx, id).await?;

    sqlx::query(
        "UPDATE commercials SET code = ?, title = ?, client = ?, duration = ?,
             typed_duration = ?, audio_file = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(non_empty(input.code).unwrap_or(existing.code))
    .bind(non_empty(input.title).unwrap_or(existing.title))
    .bind(non_empty(input.client).unwrap_or(existing.client))
    .bind(duration.or(existing.duration))
    .bind(non_empty(input.typed_duration).or(existing.typed_duration))
    .bind(non_empty(input.audio_file).or(existing.audio_file))
    .bind(now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let commercial = fetch(&mut tx, id).await?;
    tx.commit().await?;
    Ok(commercial)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM commercials WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Commercial {} not found", id)));
    }
    info!(id, "Deleted commercial");
    Ok(())
}
