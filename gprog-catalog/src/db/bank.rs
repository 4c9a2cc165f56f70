//! Announcement bank
//!
//! Pre-recorded announcer lines, each tied to a station, an announcer, a
//! free-text interpreter name and a 1..5 speed. An entry can only be
//! written for an (announcer, station) pair that is actively associated at
//! the time of the write. Deactivating an association later leaves existing
//! entries untouched.
//!
//! The eligibility queries here drive the entry form: which stations can
//! be picked, which announcers are authorized for a station, which
//! interpreter names exist in the song catalog, and the speed vocabulary.

use super::announcers::{self, Announcer};
use super::associations::is_actively_associated;
use super::stations::{self, Station};
use super::{like_pattern, non_empty, require, require_text};
use chrono::{DateTime, Utc};
use gprog_common::db::begin_write;
use gprog_common::time::now;
use gprog_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

const COLUMNS: &str = "id, station_id, announcer_id, interpreter, speed, script, audio_file, \
    active, notes, created_at, updated_at";

/// Slowest permitted speed
pub const MIN_SPEED: i64 = 1;
/// Fastest permitted speed
pub const MAX_SPEED: i64 = 5;

/// Maximum number of interpreter search results
pub const INTERPRETER_SEARCH_LIMIT: usize = 20;

/// Minimum interpreter search length, after trimming
pub const MIN_SEARCH_CHARS: usize = 2;

/// Speed vocabulary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Speed {
    pub value: i64,
    pub label: &'static str,
}

pub static SPEEDS: [Speed; 5] = [
    Speed { value: 1, label: "Very slow" },
    Speed { value: 2, label: "Slow" },
    Speed { value: 3, label: "Normal" },
    Speed { value: 4, label: "Fast" },
    Speed { value: 5, label: "Very fast" },
];

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct BankEntry {
    pub id: i64,
    pub station_id: i64,
    pub announcer_id: i64,
    pub interpreter: String,
    pub speed: i64,
    pub script: Option<String>,
    pub audio_file: Option<String>,
    pub active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub station: Option<Station>,
    #[sqlx(skip)]
    pub announcer: Option<Announcer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BankEntryInput {
    pub station_id: Option<i64>,
    pub announcer_id: Option<i64>,
    pub interpreter: Option<String>,
    pub speed: Option<i64>,
    pub script: Option<String>,
    pub audio_file: Option<String>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BankFilter {
    pub active: Option<bool>,
    pub station_id: Option<i64>,
    pub announcer_id: Option<i64>,
    pub speed: Option<i64>,
    /// Case-insensitive substring
    pub interpreter: Option<String>,
}

fn check_speed(speed: i64) -> Result<()> {
    if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(Error::OutOfRange(format!(
            "speed must be between {} and {}, got {}",
            MIN_SPEED, MAX_SPEED, speed
        )));
    }
    Ok(())
}

async fn require_association(
    conn: &mut SqliteConnection,
    announcer: &Announcer,
    station: &Station,
) -> Result<()> {
    if !is_actively_associated(conn, announcer.id, station.id).await? {
        warn!(
            announcer = %announcer.code,
            station = %station.code,
            "Rejected bank entry for unassociated pair"
        );
        return Err(Error::NotAssociated(format!(
            "Announcer '{}' is not actively associated with station '{}'",
            announcer.code, station.code
        )));
    }
    Ok(())
}

async fn attach_references(conn: &mut SqliteConnection, mut rows: Vec<BankEntry>) -> Result<Vec<BankEntry>> {
    let mut station_cache: HashMap<i64, Option<Station>> = HashMap::new();
    let mut announcer_cache: HashMap<i64, Option<Announcer>> = HashMap::new();

    for row in &mut rows {
        if !station_cache.contains_key(&row.station_id) {
            let station = stations::find(conn, row.station_id).await?;
            station_cache.insert(row.station_id, station);
        }
        if !announcer_cache.contains_key(&row.announcer_id) {
            let announcer = announcers::find(conn, row.announcer_id).await?;
            announcer_cache.insert(row.announcer_id, announcer);
        }
        row.station = station_cache.get(&row.station_id).cloned().flatten();
        row.announcer = announcer_cache.get(&row.announcer_id).cloned().flatten();
    }

    Ok(rows)
}

async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<BankEntry>> {
    let entry = sqlx::query_as::<_, BankEntry>(&format!(
        "SELECT {} FROM bank_entries WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(entry)
}

async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<BankEntry> {
    let entry = find(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Bank entry {} not found", id)))?;
    attach_references(conn, vec![entry])
        .await?
        .pop()
        .ok_or_else(|| Error::Internal("bank entry vanished while loading references".into()))
}

/// Bank entries, newest first
pub async fn list(pool: &SqlitePool, filter: BankFilter) -> Result<Vec<BankEntry>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM bank_entries WHERE 1 = 1", COLUMNS));
    if let Some(active) = filter.active {
        query.push(" AND active = ").push_bind(active);
    }
    if let Some(station_id) = filter.station_id {
        query.push(" AND station_id = ").push_bind(station_id);
    }
    if let Some(announcer_id) = filter.announcer_id {
        query.push(" AND announcer_id = ").push_bind(announcer_id);
    }
    if let Some(speed) = filter.speed {
        query.push(" AND speed = ").push_bind(speed);
    }
    if let Some(interpreter) = non_empty(filter.interpreter) {
        query
            .push(" AND interpreter LIKE ")
            .push_bind(like_pattern(&interpreter))
            .push(" ESCAPE '\\'");
    }
    query.push(" ORDER BY created_at DESC, id DESC");

    let mut conn = pool.acquire().await?;
    let rows = query.build_query_as::<BankEntry>().fetch_all(&mut *conn).await?;
    attach_references(&mut conn, rows).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<BankEntry> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

/// Create an entry after running the eligibility checks in order:
/// required fields, station, announcer, active association, speed range
pub async fn create(pool: &SqlitePool, input: BankEntryInput) -> Result<BankEntry> {
    let station_id = require("station_id", input.station_id)?;
    let announcer_id = require("announcer_id", input.announcer_id)?;
    let interpreter = require_text("interpreter", input.interpreter)?;
    let speed = require("speed", input.speed)?;

    let mut tx = begin_write(pool).await?;

    let station = stations::fetch(&mut tx, station_id).await?;
    let announcer = announcers::fetch(&mut tx, announcer_id).await?;
    require_association(&mut tx, &announcer, &station).await?;
    check_speed(speed)?;

    let ts = now();
    let id = sqlx::query(
        "INSERT INTO bank_entries (
            station_id, announcer_id, interpreter, speed, script, audio_file, active, notes,
            created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(station_id)
    .bind(announcer_id)
    .bind(&interpreter)
    .bind(speed)
    .bind(non_empty(input.script))
    .bind(non_empty(input.audio_file))
    .bind(input.active.unwrap_or(true))
    .bind(non_empty(input.notes))
    .bind(ts)
    .bind(ts)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let entry = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(
        id,
        station = %station.code,
        announcer = %announcer.code,
        speed,
        "Created bank entry"
    );
    Ok(entry)
}

/// Update supplied fields only
///
/// Supplied ids must exist and a supplied speed must be in range. When the
/// (announcer, station) pair changes, the new pair must be actively
/// associated; an unchanged pair is not re-checked.
pub async fn update(pool: &SqlitePool, id: i64, input: BankEntryInput) -> Result<BankEntry> {
    let mut tx = begin_write(pool).await?;
    let existing = find(&mut tx, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Bank entry {} not found", id)))?;

    let station = match input.station_id {
        Some(station_id) => Some(stations::fetch(&mut tx, station_id).await?),
        None => None,
    };
    let announcer = match input.announcer_id {
        Some(announcer_id) => Some(announcers::fetch(&mut tx, announcer_id).await?),
        None => None,
    };

    let station_id = station.as_ref().map_or(existing.station_id, |s| s.id);
    let announcer_id = announcer.as_ref().map_or(existing.announcer_id, |a| a.id);
    if station_id != existing.station_id || announcer_id != existing.announcer_id {
        let station = match station {
            Some(station) => station,
            None => stations::fetch(&mut tx, station_id).await?,
        };
        let announcer = match announcer {
            Some(announcer) => announcer,
            None => announcers::fetch(&mut tx, announcer_id).await?,
        };
        require_association(&mut tx, &announcer, &station).await?;
    }

    if let Some(speed) = input.speed {
        check_speed(speed)?;
    }

    sqlx::query(
        "UPDATE bank_entries SET
            station_id = ?, announcer_id = ?, interpreter = ?, speed = ?, script = ?,
            audio_file = ?, active = ?, notes = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(station_id)
    .bind(announcer_id)
    .bind(non_empty(input.interpreter).unwrap_or(existing.interpreter))
    .bind(input.speed.unwrap_or(existing.speed))
    .bind(non_empty(input.script).or(existing.script))
    .bind(non_empty(input.audio_file).or(existing.audio_file))
    .bind(input.active.unwrap_or(existing.active))
    .bind(non_empty(input.notes).or(existing.notes))
    .bind(now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let entry = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, "Updated bank entry");
    Ok(entry)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM bank_entries WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Bank entry {} not found", id)));
    }
    info!(id, "Deleted bank entry");
    Ok(())
}

/// Stations an entry can be written for: active ones, by code
pub async fn eligible_stations(pool: &SqlitePool) -> Result<Vec<Station>> {
    stations::list(
        pool,
        stations::StationFilter { active: Some(true), ..Default::default() },
    )
    .await
}

/// Active announcers with an active association to the station, by code
pub async fn eligible_announcers(pool: &SqlitePool, station_id: i64) -> Result<Vec<Announcer>> {
    let mut conn = pool.acquire().await?;
    stations::fetch(&mut conn, station_id).await?;

    let announcers = sqlx::query_as::<_, Announcer>(
        "SELECT a.id, a.code, a.name, a.active, a.notes, a.created_at, a.updated_at
         FROM announcers a
         JOIN announcer_stations r ON r.announcer_id = a.id
         WHERE r.station_id = ? AND r.active = 1 AND a.active = 1
         ORDER BY a.code",
    )
    .bind(station_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(announcers)
}

/// Merge raw names into a case-insensitively distinct, sorted list
///
/// The first spelling seen (in sort order) represents each name.
pub fn merge_interpreters<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut names: Vec<String> = names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));

    let mut seen = HashSet::new();
    names.retain(|n| seen.insert(n.to_lowercase()));
    names
}

async fn interpreter_slots(conn: &mut SqliteConnection, pattern: Option<&str>) -> Result<Vec<String>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("");
    for (i, column) in ["interpreter1", "interpreter2", "interpreter3"].iter().enumerate() {
        if i > 0 {
            query.push(" UNION ");
        }
        query.push(format!(
            "SELECT {col} FROM songs WHERE {col} IS NOT NULL AND {col} != ''",
            col = column
        ));
        if let Some(pattern) = pattern {
            query
                .push(format!(" AND {} LIKE ", column))
                .push_bind(pattern.to_string())
                .push(" ESCAPE '\\'");
        }
    }

    let names = query.build_query_scalar::<String>().fetch_all(&mut *conn).await?;
    Ok(names)
}

/// Every interpreter named in any of the three song slots
pub async fn interpreters(pool: &SqlitePool) -> Result<Vec<String>> {
    let mut conn = pool.acquire().await?;
    let names = interpreter_slots(&mut conn, None).await?;
    Ok(merge_interpreters(names))
}

/// Interpreters containing `query`; short queries return nothing
pub async fn search_interpreters(pool: &SqlitePool, query: &str) -> Result<Vec<String>> {
    let query = query.trim();
    if query.chars().count() < MIN_SEARCH_CHARS {
        return Ok(Vec::new());
    }

    let mut conn = pool.acquire().await?;
    let names = interpreter_slots(&mut conn, Some(&like_pattern(query))).await?;
    let mut merged = merge_interpreters(names);
    merged.truncate(INTERPRETER_SEARCH_LIMIT);

    debug!(query, hits = merged.len(), "Interpreter search");
    Ok(merged)
}
