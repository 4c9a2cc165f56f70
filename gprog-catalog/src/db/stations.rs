//! Radio stations
//!
//! `state` holds a two-letter region code and is always stored upper-cased.

use super::{count_references, like_pattern, non_empty, require_text};
use chrono::{DateTime, Utc};
use gprog_common::db::begin_write;
use gprog_common::time::now;
use gprog_common::{map_unique_violation, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

const COLUMNS: &str =
    "id, code, name, frequency, city, state, active, notes, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Station {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub frequency: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub frequency: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StationFilter {
    pub active: Option<bool>,
    /// Case-insensitive substring
    pub city: Option<String>,
    /// Exact match after upper-casing
    pub state: Option<String>,
}

fn normalize_state(state: Option<String>) -> Option<String> {
    non_empty(state).map(|s| s.to_uppercase())
}

pub(crate) async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Station>> {
    let station = sqlx::query_as::<_, Station>(&format!(
        "SELECT {} FROM stations WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(station)
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Station> {
    find(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Station {} not found", id)))
}

fn duplicate(code: &str) -> Error {
    Error::DuplicateKey(format!("Station code '{}' already exists", code))
}

async fn code_taken(conn: &mut SqliteConnection, code: &str, except: i64) -> Result<bool> {
    let hit: Option<i64> = sqlx::query_scalar("SELECT id FROM stations WHERE code = ? AND id != ?")
        .bind(code)
        .bind(except)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(hit.is_some())
}

/// Stations ordered by code
pub async fn list(pool: &SqlitePool, filter: StationFilter) -> Result<Vec<Station>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM stations WHERE 1 = 1", COLUMNS));
    if let Some(active) = filter.active {
        query.push(" AND active = ").push_bind(active);
    }
    if let Some(city) = non_empty(filter.city) {
        query
            .push(" AND city LIKE ")
            .push_bind(like_pattern(&city))
            .push(" ESCAPE '\\'");
    }
    if let Some(state) = normalize_state(filter.state) {
        query.push(" AND state = ").push_bind(state);
    }
    query.push(" ORDER BY code");

    let stations = query.build_query_as::<Station>().fetch_all(pool).await?;
    Ok(stations)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Station> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

pub async fn create(pool: &SqlitePool, input: StationInput) -> Result<Station> {
    let code = require_text("code", input.code)?;
    let name = require_text("name", input.name)?;

    let mut tx = begin_write(pool).await?;
    if code_taken(&mut tx, &code, -1).await? {
        return Err(duplicate(&code));
    }

    let ts = now();
    let id = sqlx::query(
        "INSERT INTO stations
            (code, name, frequency, city, state, active, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&code)
    .bind(&name)
    .bind(non_empty(input.frequency))
    .bind(non_empty(input.city))
    .bind(normalize_state(input.state))
    .bind(input.active.unwrap_or(true))
    .bind(non_empty(input.notes))
    .bind(ts)
    .bind(ts)
    .execute(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, || duplicate(&code)))?
    .last_insert_rowid();

    let station = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, code = %station.code, "Created station");
    Ok(station)
}

pub async fn update(pool: &SqlitePool, id: i64, input: StationInput) -> Result<Station> {
    let mut tx = begin_write(pool).await?;
    let existing = fetch(&mut tx, id).await?;

    let code = non_empty(input.code).unwrap_or(existing.code);
    if code_taken(&mut tx, &code, id).await? {
        return Err(duplicate(&code));
    }

    sqlx::query(
        "UPDATE stations SET code = ?, name = ?, frequency = ?, city = ?, state = ?,
             active = ?, notes = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&code)
    .bind(non_empty(input.name).unwrap_or(existing.name))
    .bind(non_empty(input.frequency).or(existing.frequency))
    .bind(non_empty(input.city).or(existing.city))
    .bind(normalize_state(input.state).or(existing.state))
    .bind(input.active.unwrap_or(existing.active))
    .bind(non_empty(input.notes).or(existing.notes))
    .bind(now())
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, || duplicate(&code)))?;

    let station = fetch(&mut tx, id).await?;
    tx.commit().await?;
    Ok(station)
}

/// Delete a station with no associations or bank entries
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let mut tx = begin_write(pool).await?;
    let station = fetch(&mut tx, id).await?;

    let links = count_references(&mut tx, "announcer_stations", "station_id", id).await?;
    if links > 0 {
        return Err(Error::HasDependents(format!(
            "Station '{}' has {} announcer association(s)",
            station.code, links
        )));
    }
    let entries = count_references(&mut tx, "bank_entries", "station_id", id).await?;
    if entries > 0 {
        return Err(Error::HasDependents(format!(
            "Station '{}' has {} bank entries",
            station.code, entries
        )));
    }

    sqlx::query("DELETE FROM stations WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(id, code = %station.code, "Deleted station");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;

    fn input(code: &str, city: &str, state: &str) -> StationInput {
        StationInput {
            code: Some(code.into()),
            name: Some(format!("Station {}", code)),
            city: Some(city.into()),
            state: Some(state.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_state_is_upper_cased() {
        let (_dir, pool) = test_pool().await;
        let station = create(&pool, input("R1", "Curitiba", "pr")).await.unwrap();
        assert_eq!(station.state.as_deref(), Some("PR"));
        assert!(station.active);
    }

    #[tokio::test]
    async fn test_filters_combine() {
        let (_dir, pool) = test_pool().await;
        create(&pool, input("R2", "Curitiba", "PR")).await.unwrap();
        create(&pool, input("R1", "Campo Largo", "PR")).await.unwrap();
        create(&pool, input("R3", "São Paulo", "SP")).await.unwrap();

        let in_pr = list(&pool, StationFilter { state: Some("pr".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(in_pr.iter().map(|s| s.code.as_str()).collect::<Vec<_>>(), vec!["R1", "R2"]);

        let curitiba = list(
            &pool,
            StationFilter {
                city: Some("CURIT".into()),
                state: Some("PR".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(curitiba.len(), 1);
        assert_eq!(curitiba[0].code, "R2");
    }

    #[tokio::test]
    async fn test_duplicate_code_on_update() {
        let (_dir, pool) = test_pool().await;
        create(&pool, input("R1", "A", "PR")).await.unwrap();
        let second = create(&pool, input("R2", "B", "PR")).await.unwrap();

        let err = update(&pool, second.id, StationInput { code: Some("R1".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn test_duplicate_code_on_create() {
        let (_dir, pool) = test_pool().await;
        create(&pool, input("R1", "Curitiba", "PR")).await.unwrap();

        let err = create(&pool, input("R1", "Londrina", "PR")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
        assert_eq!(list(&pool, StationFilter::default()).await.unwrap().len(), 1);
    }
}
