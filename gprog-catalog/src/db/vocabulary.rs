//! Autocomplete vocabularies
//!
//! Interpreter names, song titles and complements are remembered each time a
//! song is written. Each distinct value keeps a usage counter, and
//! autocomplete ranks matches by that counter.
//!
//! The counter is merged with a single `INSERT … ON CONFLICT DO UPDATE`
//! statement, so concurrent writers of the same value never lose an
//! increment.

use super::like_pattern;
use chrono::{DateTime, Utc};
use gprog_common::time::now;
use gprog_common::Result;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

/// Queries shorter than this (after trimming) return nothing
pub const MIN_QUERY_CHARS: usize = 2;

/// Maximum number of autocomplete suggestions
pub const AUTOCOMPLETE_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    Interpreter,
    SongTitle,
    Complement,
}

impl Vocabulary {
    fn table(self) -> &'static str {
        match self {
            Vocabulary::Interpreter => "interpreters",
            Vocabulary::SongTitle => "song_titles",
            Vocabulary::Complement => "complements",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct VocabularyEntry {
    pub id: i64,
    pub value: String,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Record one use of `value`; blank values are ignored
pub async fn memorize(conn: &mut SqliteConnection, vocabulary: Vocabulary, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }

    let ts = now();
    sqlx::query(&format!(
        "INSERT INTO {} (value, usage_count, created_at, updated_at) VALUES (?, 1, ?, ?)
         ON CONFLICT(value) DO UPDATE SET
             usage_count = usage_count + 1,
             updated_at = excluded.updated_at",
        vocabulary.table()
    ))
    .bind(value)
    .bind(ts)
    .bind(ts)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Suggestions containing `query`, most used first
pub async fn autocomplete(
    pool: &SqlitePool,
    vocabulary: Vocabulary,
    query: &str,
) -> Result<Vec<VocabularyEntry>> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Ok(Vec::new());
    }

    let entries = sqlx::query_as::<_, VocabularyEntry>(&format!(
        "SELECT id, value, usage_count, created_at, updated_at FROM {}
         WHERE value LIKE ? ESCAPE '\\'
         ORDER BY usage_count DESC, value ASC
         LIMIT ?",
        vocabulary.table()
    ))
    .bind(like_pattern(query))
    .bind(AUTOCOMPLETE_LIMIT)
    .fetch_all(pool)
    .await?;

    debug!(table = vocabulary.table(), query, hits = entries.len(), "Autocomplete");
    Ok(entries)
}
