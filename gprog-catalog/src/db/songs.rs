//! Song catalog
//!
//! Songs reference a category (required at creation) and optionally a
//! style. Every write feeds the interpreter, title and complement values
//! into the autocomplete vocabularies inside the same transaction.

use super::categories::{self, Category};
use super::styles::{self, Style};
use super::vocabulary::{self, Vocabulary};
use super::{non_empty, require, require_text};
use crate::pagination::{calculate_pagination, PageLimits};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use gprog_common::db::begin_write;
use gprog_common::time::{default_song_duration, now, parse_optional_date, parse_optional_time};
use gprog_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};

const COLUMNS: &str = "id, interpreter1, interpreter2, interpreter3, title, kind, category_id, \
    speed, style_id, release_year, complement, interpreter1_birthday, interpreter2_birthday, \
    interpreter3_birthday, default_duration, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Song {
    pub id: i64,
    pub interpreter1: String,
    pub interpreter2: Option<String>,
    pub interpreter3: Option<String>,
    pub title: String,
    /// Free-form short code (AC, AV, ER, RMX, ...)
    pub kind: Option<String>,
    pub category_id: Option<i64>,
    /// 1 slow, 2 medium, 3 fast; not range-checked
    pub speed: Option<i64>,
    pub style_id: Option<i64>,
    pub release_year: Option<i64>,
    pub complement: Option<String>,
    pub interpreter1_birthday: Option<NaiveDate>,
    pub interpreter2_birthday: Option<NaiveDate>,
    pub interpreter3_birthday: Option<NaiveDate>,
    pub default_duration: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub category: Option<Category>,
    #[sqlx(skip)]
    pub style: Option<Style>,
}

/// Create/update payload. Dates are `YYYY-MM-DD`, the duration `HH:MM[:SS]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongInput {
    pub interpreter1: Option<String>,
    pub interpreter2: Option<String>,
    pub interpreter3: Option<String>,
    pub title: Option<String>,
    pub kind: Option<String>,
    pub category_id: Option<i64>,
    pub speed: Option<i64>,
    pub style_id: Option<i64>,
    pub release_year: Option<i64>,
    pub complement: Option<String>,
    pub interpreter1_birthday: Option<String>,
    pub interpreter2_birthday: Option<String>,
    pub interpreter3_birthday: Option<String>,
    pub default_duration: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SongFilter {
    pub category_id: Option<i64>,
    pub style_id: Option<i64>,
    pub speed: Option<i64>,
    pub year: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// One page of songs with paging metadata
#[derive(Debug, Clone, Serialize)]
pub struct SongPage {
    pub songs: Vec<Song>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

/// Input fields that parse into typed values
struct ParsedFields {
    birthdays: [Option<NaiveDate>; 3],
    default_duration: Option<NaiveTime>,
}

impl ParsedFields {
    fn from_input(input: &SongInput) -> Result<Self> {
        Ok(Self {
            birthdays: [
                parse_optional_date("interpreter1_birthday", input.interpreter1_birthday.as_deref())?,
                parse_optional_date("interpreter2_birthday", input.interpreter2_birthday.as_deref())?,
                parse_optional_date("interpreter3_birthday", input.interpreter3_birthday.as_deref())?,
            ],
            default_duration: parse_optional_time(
                "default_duration",
                input.default_duration.as_deref(),
            )?,
        })
    }
}

async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Song>> {
    let song = sqlx::query_as::<_, Song>(&format!("SELECT {} FROM songs WHERE id = ?", COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(song)
}

async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Song> {
    let song = find(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Song {} not found", id)))?;
    let mut songs = attach_references(conn, vec![song]).await?;
    songs
        .pop()
        .ok_or_else(|| Error::Internal("song vanished while loading references".into()))
}

/// Fill in nested category and style, loading each referenced row once
async fn attach_references(conn: &mut SqliteConnection, mut songs: Vec<Song>) -> Result<Vec<Song>> {
    let mut category_cache: HashMap<i64, Option<Category>> = HashMap::new();
    let mut style_cache: HashMap<i64, Option<Style>> = HashMap::new();

    for song in &mut songs {
        if let Some(category_id) = song.category_id {
            if !category_cache.contains_key(&category_id) {
                let category = categories::find(conn, category_id).await?;
                category_cache.insert(category_id, category);
            }
            song.category = category_cache.get(&category_id).cloned().flatten();
        }
        if let Some(style_id) = song.style_id {
            if !style_cache.contains_key(&style_id) {
                let style = styles::find(conn, style_id).await?;
                style_cache.insert(style_id, style);
            }
            song.style = style_cache.get(&style_id).cloned().flatten();
        }
    }

    Ok(songs)
}

/// Feed the supplied names into their vocabularies
async fn remember_values(conn: &mut SqliteConnection, input: &SongInput) -> Result<()> {
    let values = [
        (Vocabulary::Interpreter, &input.interpreter1),
        (Vocabulary::Interpreter, &input.interpreter2),
        (Vocabulary::Interpreter, &input.interpreter3),
        (Vocabulary::SongTitle, &input.title),
        (Vocabulary::Complement, &input.complement),
    ];
    for (kind, value) in values {
        if let Some(value) = value {
            vocabulary::memorize(conn, kind, value).await?;
        }
    }
    Ok(())
}

/// One page of songs in id order
pub async fn list(pool: &SqlitePool, filter: SongFilter, limits: PageLimits) -> Result<SongPage> {
    fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &SongFilter) {
        if let Some(category_id) = filter.category_id {
            query.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(style_id) = filter.style_id {
            query.push(" AND style_id = ").push_bind(style_id);
        }
        if let Some(speed) = filter.speed {
            query.push(" AND speed = ").push_bind(speed);
        }
        if let Some(year) = filter.year {
            query.push(" AND release_year = ").push_bind(year);
        }
    }

    let mut conn = pool.acquire().await?;

    let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM songs WHERE 1 = 1");
    push_filters(&mut count, &filter);
    let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

    let per_page = limits.resolve(filter.per_page);
    let paging = calculate_pagination(total, filter.page.unwrap_or(1), per_page);

    let mut select: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM songs WHERE 1 = 1", COLUMNS));
    push_filters(&mut select, &filter);
    select
        .push(" ORDER BY id LIMIT ")
        .push_bind(paging.per_page)
        .push(" OFFSET ")
        .push_bind(paging.offset);
    let rows = select.build_query_as::<Song>().fetch_all(&mut *conn).await?;
    let songs = attach_references(&mut conn, rows).await?;

    debug!(total, page = paging.page, returned = songs.len(), "Listed songs");
    Ok(SongPage {
        songs,
        total,
        pages: paging.total_pages,
        current_page: paging.page,
        per_page: paging.per_page,
    })
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Song> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

pub async fn create(pool: &SqlitePool, input: SongInput) -> Result<Song> {
    let interpreter1 = require_text("interpreter1", input.interpreter1.clone())?;
    let title = require_text("title", input.title.clone())?;
    let release_year = require("release_year", input.release_year)?;
    let category_id = require("category_id", input.category_id)?;
    let parsed = ParsedFields::from_input(&input)?;

    let mut tx = begin_write(pool).await?;

    categories::fetch(&mut tx, category_id).await?;
    if let Some(style_id) = input.style_id {
        styles::fetch(&mut tx, style_id).await?;
    }

    let ts = now();
    let [birthday1, birthday2, birthday3] = parsed.birthdays;
    let id = sqlx::query(
        "INSERT INTO songs (
            interpreter1, interpreter2, interpreter3, title, kind, category_id, speed,
            style_id, release_year, complement, interpreter1_birthday, interpreter2_birthday,
            interpreter3_birthday, default_duration, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&interpreter1)
    .bind(non_empty(input.interpreter2.clone()))
    .bind(non_empty(input.interpreter3.clone()))
    .bind(&title)
    .bind(non_empty(input.kind.clone()))
    .bind(category_id)
    .bind(input.speed)
    .bind(input.style_id)
    .bind(release_year)
    .bind(non_empty(input.complement.clone()))
    .bind(birthday1)
    .bind(birthday2)
    .bind(birthday3)
    .bind(parsed.default_duration.unwrap_or_else(default_song_duration))
    .bind(ts)
    .bind(ts)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    remember_values(&mut tx, &input).await?;

    let song = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, title = %song.title, interpreter = %song.interpreter1, "Created song");
    Ok(song)
}

pub async fn update(pool: &SqlitePool, id: i64, input: SongInput) -> Result<Song> {
    let parsed = ParsedFields::from_input(&input)?;

    let mut tx = begin_write(pool).await?;
    let existing = find(&mut tx, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Song {} not found", id)))?;

    if let Some(category_id) = input.category_id {
        categories::fetch(&mut tx, category_id).await?;
    }
    if let Some(style_id) = input.style_id {
        styles::fetch(&mut tx, style_id).await?;
    }

    let [birthday1, birthday2, birthday3] = parsed.birthdays;
    sqlx::query(
        "UPDATE songs SET
            interpreter1 = ?, interpreter2 = ?, interpreter3 = ?, title = ?, kind = ?,
            category_id = ?, speed = ?, style_id = ?, release_year = ?, complement = ?,
            interpreter1_birthday = ?, interpreter2_birthday = ?, interpreter3_birthday = ?,
            default_duration = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(non_empty(input.interpreter1.clone()).unwrap_or(existing.interpreter1))
    .bind(non_empty(input.interpreter2.clone()).or(existing.interpreter2))
    .bind(non_empty(input.interpreter3.clone()).or(existing.interpreter3))
    .bind(non_empty(input.title.clone()).unwrap_or(existing.title))
    .bind(non_empty(input.kind.clone()).or(existing.kind))
    .bind(input.category_id.or(existing.category_id))
    .bind(input.speed.or(existing.speed))
    .bind(input.style_id.or(existing.style_id))
    .bind(input.release_year.or(existing.release_year))
    .bind(non_empty(input.complement.clone()).or(existing.complement))
    .bind(birthday1.or(existing.interpreter1_birthday))
    .bind(birthday2.or(existing.interpreter2_birthday))
    .bind(birthday3.or(existing.interpreter3_birthday))
    .bind(parsed.default_duration.unwrap_or(existing.default_duration))
    .bind(now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    remember_values(&mut tx, &input).await?;

    let song = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, "Updated song");
    Ok(song)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM songs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Song {} not found", id)));
    }
    info!(id, "Deleted song");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::categories::CategoryInput;
    use crate::db::styles::StyleInput;
    use crate::db::test_support::test_pool;

    async fn category(pool: &SqlitePool, code: &str) -> Category {
        categories::create(
            pool,
            CategoryInput {
                code: Some(code.into()),
                name: Some(format!("Category {}", code)),
                description: None,
            },
        )
        .await
        .unwrap()
    }

    fn song(interpreter: &str, title: &str, category_id: i64) -> SongInput {
        SongInput {
            interpreter1: Some(interpreter.into()),
            title: Some(title.into()),
            release_year: Some(1985),
            category_id: Some(category_id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_nests_references_and_defaults_duration() {
        let (_dir, pool) = test_pool().await;
        let cat = category(&pool, "01").await;
        let style = styles::create(&pool, StyleInput { name: Some("Rock".into()) })
            .await
            .unwrap();

        let created = create(
            &pool,
            SongInput {
                style_id: Some(style.id),
                interpreter1_birthday: Some("1946-09-05".into()),
                ..song("Queen", "Bohemian Rhapsody", cat.id)
            },
        )
        .await
        .unwrap();

        assert_eq!(created.category.as_ref().map(|c| c.code.as_str()), Some("01"));
        assert_eq!(created.style.as_ref().map(|s| s.name.as_str()), Some("Rock"));
        assert_eq!(created.default_duration, default_song_duration());
        assert_eq!(
            created.interpreter1_birthday,
            NaiveDate::from_ymd_opt(1946, 9, 5)
        );
    }

    #[tokio::test]
    async fn test_required_fields_checked_in_order() {
        let (_dir, pool) = test_pool().await;
        let err = create(&pool, SongInput::default()).await.unwrap_err();
        assert!(matches!(err, Error::MissingField(f) if f == "interpreter1"));

        let err = create(
            &pool,
            SongInput { release_year: None, ..song("Queen", "Innuendo", 1) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::MissingField(f) if f == "release_year"));
    }

    #[tokio::test]
    async fn test_unknown_category_is_not_found() {
        let (_dir, pool) = test_pool().await;
        let err = create(&pool, song("Queen", "Innuendo", 99)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bad_birthday_is_invalid_format() {
        let (_dir, pool) = test_pool().await;
        let cat = category(&pool, "01").await;
        let err = create(
            &pool,
            SongInput {
                interpreter1_birthday: Some("05/09/1946".into()),
                ..song("Queen", "Innuendo", cat.id)
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn test_three_songs_same_interpreter_counted_three_times() {
        let (_dir, pool) = test_pool().await;
        let cat = category(&pool, "01").await;
        for title in ["One", "Two", "Three"] {
            create(&pool, song("Test Artist", title, cat.id)).await.unwrap();
        }

        let hits = vocabulary::autocomplete(&pool, Vocabulary::Interpreter, "Test")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].usage_count, 3);
    }

    #[tokio::test]
    async fn test_update_merges_and_memorizes() {
        let (_dir, pool) = test_pool().await;
        let cat = category(&pool, "01").await;
        let created = create(&pool, song("Queen", "Innuendo", cat.id)).await.unwrap();

        let updated = update(
            &pool,
            created.id,
            SongInput {
                complement: Some("Live at Wembley".into()),
                speed: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "Innuendo");
        assert_eq!(updated.speed, Some(2));
        assert_eq!(updated.complement.as_deref(), Some("Live at Wembley"));

        let hits = vocabulary::autocomplete(&pool, Vocabulary::Complement, "wembley")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let (_dir, pool) = test_pool().await;
        let a = category(&pool, "01").await;
        let b = category(&pool, "02").await;
        for i in 0..5 {
            create(&pool, song("Artist", &format!("A{}", i), a.id)).await.unwrap();
        }
        create(&pool, song("Artist", "B0", b.id)).await.unwrap();

        let page = list(
            &pool,
            SongFilter {
                category_id: Some(a.id),
                page: Some(2),
                per_page: Some(2),
                ..Default::default()
            },
            PageLimits::default(),
        )
        .await
        .unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        assert_eq!(page.current_page, 2);
        let titles: Vec<_> = page.songs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A2", "A3"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, pool) = test_pool().await;
        let cat = category(&pool, "01").await;
        let created = create(&pool, song("Queen", "Innuendo", cat.id)).await.unwrap();

        delete(&pool, created.id).await.unwrap();
        assert!(matches!(get(&pool, created.id).await, Err(Error::NotFound(_))));
        assert!(matches!(delete(&pool, created.id).await, Err(Error::NotFound(_))));
    }
}
