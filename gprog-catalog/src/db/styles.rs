//! Musical styles, unique by name

use super::{count_references, require_text};
use chrono::{DateTime, Utc};
use gprog_common::db::begin_write;
use gprog_common::time::now;
use gprog_common::{map_unique_violation, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Style {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleInput {
    pub name: Option<String>,
}

pub(crate) async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Style>> {
    let style = sqlx::query_as::<_, Style>("SELECT id, name, created_at FROM styles WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(style)
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Style> {
    find(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Style {} not found", id)))
}

fn duplicate(name: &str) -> Error {
    Error::DuplicateKey(format!("Style '{}' already exists", name))
}

/// All styles ordered by name
pub async fn list(pool: &SqlitePool) -> Result<Vec<Style>> {
    let styles =
        sqlx::query_as::<_, Style>("SELECT id, name, created_at FROM styles ORDER BY name")
            .fetch_all(pool)
            .await?;
    Ok(styles)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Style> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

pub async fn create(pool: &SqlitePool, input: StyleInput) -> Result<Style> {
    let name = require_text("name", input.name)?;
    let mut tx = begin_write(pool).await?;

    let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM styles WHERE name = ?")
        .bind(&name)
        .fetch_optional(&mut *tx)
        .await?;
    if taken.is_some() {
        return Err(duplicate(&name));
    }

    let id = sqlx::query("INSERT INTO styles (name, created_at) VALUES (?, ?)")
        .bind(&name)
        .bind(now())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, || duplicate(&name)))?
        .last_insert_rowid();

    let style = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, name = %style.name, "Created style");
    Ok(style)
}

pub async fn update(pool: &SqlitePool, id: i64, input: StyleInput) -> Result<Style> {
    let mut tx = begin_write(pool).await?;
    let existing = fetch(&mut tx, id).await?;

    let Some(name) = super::non_empty(input.name) else {
        return Ok(existing);
    };

    let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM styles WHERE name = ? AND id != ?")
        .bind(&name)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if taken.is_some() {
        return Err(duplicate(&name));
    }

    sqlx::query("UPDATE styles SET name = ? WHERE id = ?")
        .bind(&name)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, || duplicate(&name)))?;

    let style = fetch(&mut tx, id).await?;
    tx.commit().await?;
    Ok(style)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let mut tx = begin_write(pool).await?;
    let style = fetch(&mut tx, id).await?;

    let songs = count_references(&mut tx, "songs", "style_id", id).await?;
    if songs > 0 {
        return Err(Error::HasDependents(format!(
            "Style '{}' is used by {} song(s)",
            style.name, songs
        )));
    }

    sqlx::query("DELETE FROM styles WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(id, name = %style.name, "Deleted style");
    Ok(())
}
