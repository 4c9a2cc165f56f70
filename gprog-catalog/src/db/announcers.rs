//! Announcers (on-air voices)

use super::{count_references, non_empty, require_text};
use chrono::{DateTime, Utc};
use gprog_common::db::begin_write;
use gprog_common::time::now;
use gprog_common::{map_unique_violation, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

const COLUMNS: &str = "id, code, name, active, notes, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Announcer {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnouncerInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnnouncerFilter {
    pub active: Option<bool>,
}

pub(crate) async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Announcer>> {
    let announcer = sqlx::query_as::<_, Announcer>(&format!(
        "SELECT {} FROM announcers WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(announcer)
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Announcer> {
    find(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Announcer {} not found", id)))
}

fn duplicate(code: &str) -> Error {
    Error::DuplicateKey(format!("Announcer code '{}' already exists", code))
}

async fn code_taken(conn: &mut SqliteConnection, code: &str, except: i64) -> Result<bool> {
    let hit: Option<i64> =
        sqlx::query_scalar("SELECT id FROM announcers WHERE code = ? AND id != ?")
            .bind(code)
            .bind(except)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(hit.is_some())
}

/// Announcers ordered by code
pub async fn list(pool: &SqlitePool, filter: AnnouncerFilter) -> Result<Vec<Announcer>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM announcers WHERE 1 = 1", COLUMNS));
    if let Some(active) = filter.active {
        query.push(" AND active = ").push_bind(active);
    }
    query.push(" ORDER BY code");

    let announcers = query.build_query_as::<Announcer>().fetch_all(pool).await?;
    Ok(announcers)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Announcer> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

pub async fn create(pool: &SqlitePool, input: AnnouncerInput) -> Result<Announcer> {
    let code = require_text("code", input.code)?;
    let name = require_text("name", input.name)?;

    let mut tx = begin_write(pool).await?;
    if code_taken(&mut tx, &code, -1).await? {
        return Err(duplicate(&code));
    }

    let ts = now();
    let id = sqlx::query(
        "INSERT INTO announcers (code, name, active, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&code)
    .bind(&name)
    .bind(input.active.unwrap_or(true))
    .bind(non_empty(input.notes))
    .bind(ts)
    .bind(ts)
    .execute(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, || duplicate(&code)))?
    .last_insert_rowid();

    let announcer = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, code = %announcer.code, "Created announcer");
    Ok(announcer)
}

pub async fn update(pool: &SqlitePool, id: i64, input: AnnouncerInput) -> Result<Announcer> {
    let mut tx = begin_write(pool).await?;
    let existing = fetch(&mut tx, id).await?;

    let code = non_empty(input.code).unwrap_or(existing.code);
    if code_taken(&mut tx, &code, id).await? {
        return Err(duplicate(&code));
    }

    sqlx::query(
        "UPDATE announcers SET code = ?, name = ?, active = ?, notes = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&code)
    .bind(non_empty(input.name).unwrap_or(existing.name))
    .bind(input.active.unwrap_or(existing.active))
    .bind(non_empty(input.notes).or(existing.notes))
    .bind(now())
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, || duplicate(&code)))?;

    let announcer = fetch(&mut tx, id).await?;
    tx.commit().await?;
    Ok(announcer)
}

/// Delete an announcer with no associations or bank entries
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let mut tx = begin_write(pool).await?;
    let announcer = fetch(&mut tx, id).await?;

    let links = count_references(&mut tx, "announcer_stations", "announcer_id", id).await?;
    if links > 0 {
        return Err(Error::HasDependents(format!(
            "Announcer '{}' has {} station association(s)",
            announcer.code, links
        )));
    }
    let entries = count_references(&mut tx, "bank_entries", "announcer_id", id).await?;
    if entries > 0 {
        return Err(Error::HasDependents(format!(
            "Announcer '{}' has {} bank entries",
            announcer.code, entries
        )));
    }

    sqlx::query("DELETE FROM announcers WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(id, code = %announcer.code, "Deleted announcer");
    Ok(())
}
