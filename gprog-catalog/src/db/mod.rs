//! Catalog store
//!
//! One module per entity. Public operations take the pool, run inside a
//! single transaction when they mutate, and return fully materialized
//! records with referenced entities nested one level deep. Lookup helpers
//! that take a `&mut SqliteConnection` are shared between modules so that
//! existence checks run inside the caller's transaction. Write transactions
//! come from `gprog_common::db::begin_write`, so pre-check reads already hold
//! the write lock.

pub mod announcers;
pub mod associations;
pub mod bank;
pub mod categories;
pub mod commercials;
pub mod generated;
pub mod grids;
pub mod songs;
pub mod spots;
pub mod stations;
pub mod styles;
pub mod vocabulary;

use gprog_common::{Error, Result};
use sqlx::SqliteConnection;

/// Drop blank strings, trimming the rest
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Required text field; blank counts as missing
pub fn require_text(field: &str, value: Option<String>) -> Result<String> {
    non_empty(value).ok_or_else(|| Error::MissingField(field.to_string()))
}

/// Required non-text field
pub fn require<T>(field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| Error::MissingField(field.to_string()))
}

/// Parse a `true` / `false` filter value (case-insensitive)
pub fn parse_bool_filter(field: &str, value: Option<&str>) -> Result<Option<bool>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(v) => Err(Error::InvalidFormat(format!(
            "{} must be true or false, got '{}'",
            field, v
        ))),
    }
}

/// Build a `LIKE` pattern matching `fragment` anywhere, for use with `ESCAPE '\'`
pub fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Count rows in `table` whose `column` equals `id`
///
/// Both names are compiled-in constants at every call site.
pub(crate) async fn count_references(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    id: i64,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?",
        table, column
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    /// Fresh on-disk database; keep the `TempDir` alive for the test's duration
    pub async fn test_pool() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().expect("temp dir");
        let pool = gprog_common::db::init_database(&dir.path().join("test.db"))
            .await
            .expect("database init");
        (dir, pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_trims_and_drops_blank() {
        assert_eq!(non_empty(Some("  Queen ".into())), Some("Queen".into()));
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_require_text_reports_field() {
        let err = require_text("interpreter1", Some(String::new())).unwrap_err();
        assert!(matches!(err, Error::MissingField(f) if f == "interpreter1"));
    }

    #[test]
    fn test_parse_bool_filter() {
        assert_eq!(parse_bool_filter("active", Some("TRUE")).unwrap(), Some(true));
        assert_eq!(parse_bool_filter("active", Some("false")).unwrap(), Some(false));
        assert_eq!(parse_bool_filter("active", None).unwrap(), None);
        assert!(matches!(
            parse_bool_filter("active", Some("yes")),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ab"), "%ab%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
