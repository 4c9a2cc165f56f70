//! Program grids
//!
//! A grid is a reusable programming template: an ordered rotation of
//! category slots, a set of time-anchored interval markers (commercial
//! breaks and music blocks) and day-applicability flags. The grid owns its
//! slots and markers; they are created, replaced and deleted together with
//! it.
//!
//! Day flags are independent booleans. Overlapping flags (e.g. `all_days`
//! together with `saturday`) are stored as given; the representation lists
//! every set flag in `applicable_days` and leaves precedence to consumers.
//!
//! Positions are caller-supplied. Children are returned in ascending
//! position order, ties broken by insertion order; gaps and duplicates are
//! kept as given.

use super::categories::{self, Category};
use super::{non_empty, require, require_text};
use chrono::{DateTime, NaiveTime, Utc};
use gprog_common::db::begin_write;
use gprog_common::time::{now, parse_time};
use gprog_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

const GRID_COLUMNS: &str = "id, name, description, all_days, monday_friday, tuesday, wednesday, \
    thursday, friday, saturday, sunday, weekend, active, created_at, updated_at";

/// Interval marker kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalKind {
    /// Commercial break
    #[serde(rename = "BC")]
    CommercialBreak,
    /// Music block
    #[serde(rename = "BM")]
    MusicBlock,
}

impl IntervalKind {
    pub fn code(self) -> &'static str {
        match self {
            IntervalKind::CommercialBreak => "BC",
            IntervalKind::MusicBlock => "BM",
        }
    }

    pub fn parse(field: &str, value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BC" => Ok(IntervalKind::CommercialBreak),
            "BM" => Ok(IntervalKind::MusicBlock),
            other => Err(Error::InvalidFormat(format!(
                "{} must be BC or BM, got '{}'",
                field, other
            ))),
        }
    }
}

/// Day-applicability flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DayFlags {
    pub all_days: bool,
    pub monday_friday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub weekend: bool,
}

/// Name of a single day flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayTag {
    AllDays,
    MondayFriday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    Weekend,
}

impl DayFlags {
    /// Every set flag, in declaration order
    pub fn applicable_days(&self) -> Vec<DayTag> {
        [
            (self.all_days, DayTag::AllDays),
            (self.monday_friday, DayTag::MondayFriday),
            (self.tuesday, DayTag::Tuesday),
            (self.wednesday, DayTag::Wednesday),
            (self.thursday, DayTag::Thursday),
            (self.friday, DayTag::Friday),
            (self.saturday, DayTag::Saturday),
            (self.sunday, DayTag::Sunday),
            (self.weekend, DayTag::Weekend),
        ]
        .into_iter()
        .filter_map(|(set, tag)| set.then_some(tag))
        .collect()
    }
}

/// Partial day flags; `None` keeps the current value
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DayFlagsPatch {
    pub all_days: Option<bool>,
    pub monday_friday: Option<bool>,
    pub tuesday: Option<bool>,
    pub wednesday: Option<bool>,
    pub thursday: Option<bool>,
    pub friday: Option<bool>,
    pub saturday: Option<bool>,
    pub sunday: Option<bool>,
    pub weekend: Option<bool>,
}

impl DayFlagsPatch {
    pub fn apply(&self, base: DayFlags) -> DayFlags {
        DayFlags {
            all_days: self.all_days.unwrap_or(base.all_days),
            monday_friday: self.monday_friday.unwrap_or(base.monday_friday),
            tuesday: self.tuesday.unwrap_or(base.tuesday),
            wednesday: self.wednesday.unwrap_or(base.wednesday),
            thursday: self.thursday.unwrap_or(base.thursday),
            friday: self.friday.unwrap_or(base.friday),
            saturday: self.saturday.unwrap_or(base.saturday),
            sunday: self.sunday.unwrap_or(base.sunday),
            weekend: self.weekend.unwrap_or(base.weekend),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotInput {
    pub category_id: Option<i64>,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkerInput {
    /// Time of day, `HH:MM[:SS]`
    pub time: Option<String>,
    /// `BC` or `BM`
    pub kind: Option<String>,
    /// `HH:MM[:SS]`
    pub duration: Option<String>,
    pub position: Option<i64>,
}

/// Create/update payload
///
/// On update, a supplied `categories` or `intervals` list replaces the
/// existing children wholesale; an omitted list leaves them untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GridInput {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub days: DayFlagsPatch,
    pub active: Option<bool>,
    pub categories: Option<Vec<SlotInput>>,
    pub intervals: Option<Vec<MarkerInput>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GridFilter {
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSlot {
    pub id: i64,
    pub category_id: i64,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalMarker {
    pub id: i64,
    #[serde(rename = "time")]
    pub at_time: NaiveTime,
    pub kind: IntervalKind,
    pub duration: NaiveTime,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub days: DayFlags,
    pub applicable_days: Vec<DayTag>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub categories: Vec<GridSlot>,
    pub intervals: Vec<IntervalMarker>,
}

#[derive(sqlx::FromRow)]
struct GridRow {
    id: i64,
    name: String,
    description: Option<String>,
    #[sqlx(flatten)]
    days: DayFlags,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SlotRow {
    id: i64,
    category_id: i64,
    position: i64,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MarkerRow {
    id: i64,
    at_time: NaiveTime,
    kind: String,
    duration: NaiveTime,
    position: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NewSlot {
    category_id: i64,
    position: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NewMarker {
    at_time: NaiveTime,
    kind: IntervalKind,
    duration: NaiveTime,
    position: i64,
}

fn validate_slots(slots: Option<&[SlotInput]>) -> Result<Option<Vec<NewSlot>>> {
    let Some(slots) = slots else {
        return Ok(None);
    };
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| -> Result<NewSlot> {
            Ok(NewSlot {
                category_id: require(&format!("categories[{}].category_id", i), slot.category_id)?,
                position: require(&format!("categories[{}].position", i), slot.position)?,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn validate_markers(markers: Option<&[MarkerInput]>) -> Result<Option<Vec<NewMarker>>> {
    let Some(markers) = markers else {
        return Ok(None);
    };
    markers
        .iter()
        .enumerate()
        .map(|(i, marker)| -> Result<NewMarker> {
            let field = |name: &str| format!("intervals[{}].{}", i, name);
            let time = require_text(&field("time"), marker.time.clone())?;
            let kind = require_text(&field("kind"), marker.kind.clone())?;
            let duration = require_text(&field("duration"), marker.duration.clone())?;
            let position = require(&field("position"), marker.position)?;
            Ok(NewMarker {
                at_time: parse_time(&field("time"), &time)?,
                kind: IntervalKind::parse(&field("kind"), &kind)?,
                duration: parse_time(&field("duration"), &duration)?,
                position,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

async fn check_categories(conn: &mut SqliteConnection, slots: Option<&[NewSlot]>) -> Result<()> {
    for slot in slots.unwrap_or_default() {
        categories::fetch(conn, slot.category_id).await?;
    }
    Ok(())
}

async fn replace_slots(conn: &mut SqliteConnection, grid_id: i64, slots: &[NewSlot]) -> Result<()> {
    sqlx::query("DELETE FROM grid_category_slots WHERE grid_id = ?")
        .bind(grid_id)
        .execute(&mut *conn)
        .await?;

    let ts = now();
    for slot in slots {
        sqlx::query(
            "INSERT INTO grid_category_slots (grid_id, category_id, position, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(grid_id)
        .bind(slot.category_id)
        .bind(slot.position)
        .bind(ts)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn replace_markers(conn: &mut SqliteConnection, grid_id: i64, markers: &[NewMarker]) -> Result<()> {
    sqlx::query("DELETE FROM grid_interval_markers WHERE grid_id = ?")
        .bind(grid_id)
        .execute(&mut *conn)
        .await?;

    let ts = now();
    for marker in markers {
        sqlx::query(
            "INSERT INTO grid_interval_markers (grid_id, at_time, kind, duration, position, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(grid_id)
        .bind(marker.at_time)
        .bind(marker.kind.code())
        .bind(marker.duration)
        .bind(marker.position)
        .bind(ts)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Assemble the full representation from a grid row
async fn assemble(conn: &mut SqliteConnection, row: GridRow) -> Result<Grid> {
    let slot_rows = sqlx::query_as::<_, SlotRow>(
        "SELECT id, category_id, position, created_at FROM grid_category_slots
         WHERE grid_id = ? ORDER BY position, id",
    )
    .bind(row.id)
    .fetch_all(&mut *conn)
    .await?;

    let mut slots = Vec::with_capacity(slot_rows.len());
    for slot in slot_rows {
        let category = categories::fetch(conn, slot.category_id).await?;
        slots.push(GridSlot {
            id: slot.id,
            category_id: slot.category_id,
            position: slot.position,
            created_at: slot.created_at,
            category,
        });
    }

    let marker_rows = sqlx::query_as::<_, MarkerRow>(
        "SELECT id, at_time, kind, duration, position, created_at FROM grid_interval_markers
         WHERE grid_id = ? ORDER BY position, id",
    )
    .bind(row.id)
    .fetch_all(&mut *conn)
    .await?;

    let intervals = marker_rows
        .into_iter()
        .map(|m| -> Result<IntervalMarker> {
            let kind = IntervalKind::parse("kind", &m.kind)
                .map_err(|e| Error::Internal(format!("Stored marker {}: {}", m.id, e)))?;
            Ok(IntervalMarker {
                id: m.id,
                at_time: m.at_time,
                kind,
                duration: m.duration,
                position: m.position,
                created_at: m.created_at,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Grid {
        id: row.id,
        name: row.name,
        description: row.description,
        applicable_days: row.days.applicable_days(),
        days: row.days,
        active: row.active,
        created_at: row.created_at,
        updated_at: row.updated_at,
        categories: slots,
        intervals,
    })
}

async fn find_row(conn: &mut SqliteConnection, id: i64) -> Result<GridRow> {
    sqlx::query_as::<_, GridRow>(&format!("SELECT {} FROM grids WHERE id = ?", GRID_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Grid {} not found", id)))
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Grid> {
    let row = find_row(conn, id).await?;
    assemble(conn, row).await
}

/// Grids ordered by name
pub async fn list(pool: &SqlitePool, filter: GridFilter) -> Result<Vec<Grid>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM grids WHERE 1 = 1", GRID_COLUMNS));
    if let Some(active) = filter.active {
        query.push(" AND active = ").push_bind(active);
    }
    query.push(" ORDER BY name, id");

    let mut conn = pool.acquire().await?;
    let rows = query.build_query_as::<GridRow>().fetch_all(&mut *conn).await?;

    let mut grids = Vec::with_capacity(rows.len());
    for row in rows {
        grids.push(assemble(&mut conn, row).await?);
    }
    debug!(count = grids.len(), "Listed grids");
    Ok(grids)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Grid> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

pub async fn create(pool: &SqlitePool, input: GridInput) -> Result<Grid> {
    let name = require_text("name", input.name)?;
    let slots = validate_slots(input.categories.as_deref())?;
    let markers = validate_markers(input.intervals.as_deref())?;
    let days = input.days.apply(DayFlags::default());

    let mut tx = begin_write(pool).await?;
    check_categories(&mut tx, slots.as_deref()).await?;

    let ts = now();
    let id = sqlx::query(
        "INSERT INTO grids (
            name, description, all_days, monday_friday, tuesday, wednesday, thursday, friday,
            saturday, sunday, weekend, active, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&name)
    .bind(non_empty(input.description))
    .bind(days.all_days)
    .bind(days.monday_friday)
    .bind(days.tuesday)
    .bind(days.wednesday)
    .bind(days.thursday)
    .bind(days.friday)
    .bind(days.saturday)
    .bind(days.sunday)
    .bind(days.weekend)
    .bind(input.active.unwrap_or(true))
    .bind(ts)
    .bind(ts)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    replace_slots(&mut tx, id, slots.as_deref().unwrap_or_default()).await?;
    replace_markers(&mut tx, id, markers.as_deref().unwrap_or_default()).await?;

    let grid = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(
        id,
        name = %grid.name,
        slots = grid.categories.len(),
        markers = grid.intervals.len(),
        "Created grid"
    );
    Ok(grid)
}

pub async fn update(pool: &SqlitePool, id: i64, input: GridInput) -> Result<Grid> {
    let slots = validate_slots(input.categories.as_deref())?;
    let markers = validate_markers(input.intervals.as_deref())?;

    let mut tx = begin_write(pool).await?;
    let existing = find_row(&mut tx, id).await?;
    check_categories(&mut tx, slots.as_deref()).await?;

    let days = input.days.apply(existing.days);
    sqlx::query(
        "UPDATE grids SET
            name = ?, description = ?, all_days = ?, monday_friday = ?, tuesday = ?,
            wednesday = ?, thursday = ?, friday = ?, saturday = ?, sunday = ?, weekend = ?,
            active = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(non_empty(input.name).unwrap_or(existing.name))
    .bind(non_empty(input.description).or(existing.description))
    .bind(days.all_days)
    .bind(days.monday_friday)
    .bind(days.tuesday)
    .bind(days.wednesday)
    .bind(days.thursday)
    .bind(days.friday)
    .bind(days.saturday)
    .bind(days.sunday)
    .bind(days.weekend)
    .bind(input.active.unwrap_or(existing.active))
    .bind(now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if let Some(slots) = &slots {
        replace_slots(&mut tx, id, slots).await?;
    }
    if let Some(markers) = &markers {
        replace_markers(&mut tx, id, markers).await?;
    }

    let grid = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, "Updated grid");
    Ok(grid)
}

/// Delete a grid together with its slots and markers
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let mut tx = begin_write(pool).await?;
    let row = find_row(&mut tx, id).await?;

    sqlx::query("DELETE FROM grid_category_slots WHERE grid_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM grid_interval_markers WHERE grid_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM grids WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(id, name = %row.name, "Deleted grid");
    Ok(())
}
