//! Announcer-station associations
//!
//! Records which announcers are authorized to voice content for which
//! stations. A pair is unique regardless of its `active` flag; toggling the
//! flag is how an authorization is suspended or restored.

use super::announcers::{self, Announcer};
use super::stations::{self, Station};
use super::{non_empty, require};
use chrono::{DateTime, NaiveDate, Utc};
use gprog_common::db::begin_write;
use gprog_common::time::{now, parse_optional_date};
use gprog_common::{map_unique_violation, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::info;

const COLUMNS: &str =
    "id, announcer_id, station_id, active, start_date, end_date, notes, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Association {
    pub id: i64,
    pub announcer_id: i64,
    pub station_id: i64,
    pub active: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcer: Option<Announcer>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station: Option<Station>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssociationInput {
    pub announcer_id: Option<i64>,
    pub station_id: Option<i64>,
    pub active: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub notes: Option<String>,
}

/// Mutable fields of an existing association
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssociationPatch {
    pub active: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssociationFilter {
    pub active: Option<bool>,
    pub announcer_id: Option<i64>,
    pub station_id: Option<i64>,
}

/// A station an announcer is linked to, with the link itself
#[derive(Debug, Clone, Serialize)]
pub struct LinkedStation {
    pub association: Association,
    pub station: Station,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnouncerStations {
    pub announcer: Announcer,
    pub stations: Vec<LinkedStation>,
}

/// An announcer linked to a station, with the link itself
#[derive(Debug, Clone, Serialize)]
pub struct LinkedAnnouncer {
    pub association: Association,
    pub announcer: Announcer,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationAnnouncers {
    pub station: Station,
    pub announcers: Vec<LinkedAnnouncer>,
}

fn pair_conflict(announcer_id: i64, station_id: i64) -> Error {
    Error::Conflict(format!(
        "Announcer {} is already associated with station {}",
        announcer_id, station_id
    ))
}

async fn select(conn: &mut SqliteConnection, filter: AssociationFilter) -> Result<Vec<Association>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM announcer_stations WHERE 1 = 1", COLUMNS));
    if let Some(active) = filter.active {
        query.push(" AND active = ").push_bind(active);
    }
    if let Some(announcer_id) = filter.announcer_id {
        query.push(" AND announcer_id = ").push_bind(announcer_id);
    }
    if let Some(station_id) = filter.station_id {
        query.push(" AND station_id = ").push_bind(station_id);
    }
    query.push(" ORDER BY id");

    let rows = query.build_query_as::<Association>().fetch_all(&mut *conn).await?;
    Ok(rows)
}

async fn attach_references(
    conn: &mut SqliteConnection,
    mut rows: Vec<Association>,
) -> Result<Vec<Association>> {
    let mut announcer_cache: HashMap<i64, Option<Announcer>> = HashMap::new();
    let mut station_cache: HashMap<i64, Option<Station>> = HashMap::new();

    for row in &mut rows {
        if !announcer_cache.contains_key(&row.announcer_id) {
            let announcer = announcers::find(conn, row.announcer_id).await?;
            announcer_cache.insert(row.announcer_id, announcer);
        }
        if !station_cache.contains_key(&row.station_id) {
            let station = stations::find(conn, row.station_id).await?;
            station_cache.insert(row.station_id, station);
        }
        row.announcer = announcer_cache.get(&row.announcer_id).cloned().flatten();
        row.station = station_cache.get(&row.station_id).cloned().flatten();
    }

    Ok(rows)
}

async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Association> {
    let row = sqlx::query_as::<_, Association>(&format!(
        "SELECT {} FROM announcer_stations WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Association {} not found", id)))?;

    attach_references(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| Error::Internal("association vanished while loading references".into()))
}

/// True when an active association links the pair
pub(crate) async fn is_actively_associated(
    conn: &mut SqliteConnection,
    announcer_id: i64,
    station_id: i64,
) -> Result<bool> {
    let hit: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM announcer_stations
         WHERE announcer_id = ? AND station_id = ? AND active = 1",
    )
    .bind(announcer_id)
    .bind(station_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(hit.is_some())
}

pub async fn list(pool: &SqlitePool, filter: AssociationFilter) -> Result<Vec<Association>> {
    let mut conn = pool.acquire().await?;
    let rows = select(&mut conn, filter).await?;
    attach_references(&mut conn, rows).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Association> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

pub async fn create(pool: &SqlitePool, input: AssociationInput) -> Result<Association> {
    let announcer_id = require("announcer_id", input.announcer_id)?;
    let station_id = require("station_id", input.station_id)?;
    let start_date = parse_optional_date("start_date", input.start_date.as_deref())?;
    let end_date = parse_optional_date("end_date", input.end_date.as_deref())?;

    let mut tx = begin_write(pool).await?;

    announcers::fetch(&mut tx, announcer_id).await?;
    stations::fetch(&mut tx, station_id).await?;

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM announcer_stations WHERE announcer_id = ? AND station_id = ?",
    )
    .bind(announcer_id)
    .bind(station_id)
    .fetch_optional(&mut *tx)
    .await?;
    if existing.is_some() {
        return Err(pair_conflict(announcer_id, station_id));
    }

    let ts = now();
    let id = sqlx::query(
        "INSERT INTO announcer_stations
            (announcer_id, station_id, active, start_date, end_date, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(announcer_id)
    .bind(station_id)
    .bind(input.active.unwrap_or(true))
    .bind(start_date)
    .bind(end_date)
    .bind(non_empty(input.notes))
    .bind(ts)
    .bind(ts)
    .execute(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, || pair_conflict(announcer_id, station_id)))?
    .last_insert_rowid();

    let association = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, announcer_id, station_id, "Associated announcer with station");
    Ok(association)
}

pub async fn update(pool: &SqlitePool, id: i64, patch: AssociationPatch) -> Result<Association> {
    let start_date = parse_optional_date("start_date", patch.start_date.as_deref())?;
    let end_date = parse_optional_date("end_date", patch.end_date.as_deref())?;

    let mut tx = begin_write(pool).await?;
    let existing = fetch(&mut tx, id).await?;

    sqlx::query(
        "UPDATE announcer_stations
         SET active = ?, start_date = ?, end_date = ?, notes = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(patch.active.unwrap_or(existing.active))
    .bind(start_date.or(existing.start_date))
    .bind(end_date.or(existing.end_date))
    .bind(non_empty(patch.notes).or(existing.notes))
    .bind(now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let association = fetch(&mut tx, id).await?;
    tx.commit().await?;

    if association.active != existing.active {
        info!(id, active = association.active, "Association activity changed");
    }
    Ok(association)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM announcer_stations WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Association {} not found", id)));
    }
    info!(id, "Deleted association");
    Ok(())
}

/// Every station linked to an announcer, active or not
pub async fn stations_for_announcer(pool: &SqlitePool, announcer_id: i64) -> Result<AnnouncerStations> {
    let mut conn = pool.acquire().await?;
    let announcer = announcers::fetch(&mut conn, announcer_id).await?;

    let rows = select(
        &mut conn,
        AssociationFilter { announcer_id: Some(announcer_id), ..Default::default() },
    )
    .await?;

    let mut linked = Vec::with_capacity(rows.len());
    for association in rows {
        let station = stations::fetch(&mut conn, association.station_id).await?;
        linked.push(LinkedStation { association, station });
    }

    Ok(AnnouncerStations { announcer, stations: linked })
}

/// Every announcer linked to a station, active or not
pub async fn announcers_for_station(pool: &SqlitePool, station_id: i64) -> Result<StationAnnouncers> {
    let mut conn = pool.acquire().await?;
    let station = stations::fetch(&mut conn, station_id).await?;

    let rows = select(
        &mut conn,
        AssociationFilter { station_id: Some(station_id), ..Default::default() },
    )
    .await?;

    let mut linked = Vec::with_capacity(rows.len());
    for association in rows {
        let announcer = announcers::fetch(&mut conn, association.announcer_id).await?;
        linked.push(LinkedAnnouncer { association, announcer });
    }

    Ok(StationAnnouncers { station, announcers: linked })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::announcers::AnnouncerInput;
    use crate::db::stations::StationInput;
    use crate::db::test_support::test_pool;

    async fn setup(pool: &SqlitePool) -> (Announcer, Station) {
        let announcer = announcers::create(
            pool,
            AnnouncerInput {
                code: Some("L1".into()),
                name: Some("João".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let station = stations::create(
            pool,
            StationInput {
                code: Some("R1".into()),
                name: Some("Educadora".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (announcer, station)
    }

    fn pair(announcer: &Announcer, station: &Station) -> AssociationInput {
        AssociationInput {
            announcer_id: Some(announcer.id),
            station_id: Some(station.id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_nests_both_sides() {
        let (_dir, pool) = test_pool().await;
        let (announcer, station) = setup(&pool).await;

        let created = create(
            &pool,
            AssociationInput {
                start_date: Some("2024-01-01".into()),
                ..pair(&announcer, &station)
            },
        )
        .await
        .unwrap();

        assert!(created.active);
        assert_eq!(created.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(created.announcer.as_ref().map(|a| a.id), Some(announcer.id));
        assert_eq!(created.station.as_ref().map(|s| s.id), Some(station.id));
    }

    #[tokio::test]
    async fn test_duplicate_pair_conflicts_even_when_inactive() {
        let (_dir, pool) = test_pool().await;
        let (announcer, station) = setup(&pool).await;
        create(&pool, AssociationInput { active: Some(false), ..pair(&announcer, &station) })
            .await
            .unwrap();

        let err = create(&pool, pair(&announcer, &station)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_missing_and_unknown_ids() {
        let (_dir, pool) = test_pool().await;
        let (announcer, _) = setup(&pool).await;

        let err = create(
            &pool,
            AssociationInput { announcer_id: Some(announcer.id), ..Default::default() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::MissingField(f) if f == "station_id"));

        let err = create(
            &pool,
            AssociationInput {
                announcer_id: Some(announcer.id),
                station_id: Some(999),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bad_date_rejected_before_write() {
        let (_dir, pool) = test_pool().await;
        let (announcer, station) = setup(&pool).await;

        let err = create(
            &pool,
            AssociationInput { end_date: Some("2024-13-40".into()), ..pair(&announcer, &station) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
        assert!(list(&pool, AssociationFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deactivate_and_lookup_helpers() {
        let (_dir, pool) = test_pool().await;
        let (announcer, station) = setup(&pool).await;
        let created = create(&pool, pair(&announcer, &station)).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert!(is_actively_associated(&mut conn, announcer.id, station.id).await.unwrap());
        drop(conn);

        update(&pool, created.id, AssociationPatch { active: Some(false), ..Default::default() })
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert!(!is_actively_associated(&mut conn, announcer.id, station.id).await.unwrap());
        drop(conn);

        let linked = stations_for_announcer(&pool, announcer.id).await.unwrap();
        assert_eq!(linked.stations.len(), 1);
        assert!(!linked.stations[0].association.active);

        let linked = announcers_for_station(&pool, station.id).await.unwrap();
        assert_eq!(linked.announcers[0].announcer.code, "L1");
    }
}
