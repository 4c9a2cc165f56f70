//! Generated programs
//!
//! A generated program is a dated snapshot produced from a grid by an
//! external generator. Its `content` is opaque JSON: it is stored as text
//! and returned byte-for-byte as it was submitted.

use super::grids::{self, Grid};
use super::require_text;
use chrono::{DateTime, NaiveDate, Utc};
use gprog_common::db::begin_write;
use gprog_common::time::{now, parse_date, parse_optional_date};
use gprog_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

const COLUMNS: &str = "id, program_date, grid_id, content, created_at";

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedProgram {
    pub id: i64,
    pub program_date: NaiveDate,
    pub grid_id: Option<i64>,
    pub content: Option<Box<RawValue>>,
    pub created_at: DateTime<Utc>,
    pub grid: Option<Grid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GeneratedProgramInput {
    /// `YYYY-MM-DD`
    pub program_date: Option<String>,
    pub grid_id: Option<i64>,
    pub content: Option<Box<RawValue>>,
}

#[derive(Debug, Clone, Default)]
pub struct GeneratedProgramFilter {
    pub grid_id: Option<i64>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ProgramRow {
    id: i64,
    program_date: NaiveDate,
    grid_id: Option<i64>,
    content: Option<String>,
    created_at: DateTime<Utc>,
}

async fn assemble(conn: &mut SqliteConnection, row: ProgramRow) -> Result<GeneratedProgram> {
    let content = row
        .content
        .map(RawValue::from_string)
        .transpose()
        .map_err(|e| Error::Internal(format!("Stored content of program {} is not JSON: {}", row.id, e)))?;
    let grid = match row.grid_id {
        Some(grid_id) => Some(grids::fetch(conn, grid_id).await?),
        None => None,
    };

    Ok(GeneratedProgram {
        id: row.id,
        program_date: row.program_date,
        grid_id: row.grid_id,
        content,
        created_at: row.created_at,
        grid,
    })
}

async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<GeneratedProgram> {
    let row = sqlx::query_as::<_, ProgramRow>(&format!(
        "SELECT {} FROM generated_programs WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Generated program {} not found", id)))?;
    assemble(conn, row).await
}

/// Programs, most recent date first
pub async fn list(pool: &SqlitePool, filter: GeneratedProgramFilter) -> Result<Vec<GeneratedProgram>> {
    let date = parse_optional_date("date", filter.date.as_deref())?;

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM generated_programs WHERE 1 = 1", COLUMNS));
    if let Some(grid_id) = filter.grid_id {
        query.push(" AND grid_id = ").push_bind(grid_id);
    }
    if let Some(date) = date {
        query.push(" AND program_date = ").push_bind(date);
    }
    query.push(" ORDER BY program_date DESC, id DESC");

    let mut conn = pool.acquire().await?;
    let rows = query.build_query_as::<ProgramRow>().fetch_all(&mut *conn).await?;

    let mut programs = Vec::with_capacity(rows.len());
    for row in rows {
        programs.push(assemble(&mut conn, row).await?);
    }
    Ok(programs)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<GeneratedProgram> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

pub async fn create(pool: &SqlitePool, input: GeneratedProgramInput) -> Result<GeneratedProgram> {
    let raw_date = require_text("program_date", input.program_date)?;
    let program_date = parse_date("program_date", &raw_date)?;

    let mut tx = begin_write(pool).await?;
    if let Some(grid_id) = input.grid_id {
        grids::fetch(&mut tx, grid_id).await?;
    }

    let id = sqlx::query(
        "INSERT INTO generated_programs (program_date, grid_id, content, created_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(program_date)
    .bind(input.grid_id)
    .bind(input.content.as_ref().map(|c| c.get()))
    .bind(now())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let program = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, %program_date, grid_id = ?program.grid_id, "Stored generated program");
    Ok(program)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM generated_programs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Generated program {} not found", id)));
    }
    info!(id, "Deleted generated program");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::grids::GridInput;
    use crate::db::test_support::test_pool;

    fn raw(json: &str) -> Option<Box<RawValue>> {
        Some(RawValue::from_string(json.to_string()).unwrap())
    }

    async fn grid(pool: &SqlitePool) -> Grid {
        grids::create(pool, GridInput { name: Some("Manhã".into()), ..Default::default() })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_content_returned_verbatim() {
        let (_dir, pool) = test_pool().await;
        let body = r#"{"z":1,"a":[3,2,1],"m":{"k":null}}"#;
        let created = create(
            &pool,
            GeneratedProgramInput {
                program_date: Some("2024-03-01".into()),
                content: raw(body),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let fetched = get(&pool, created.id).await.unwrap();
        assert_eq!(fetched.content.as_ref().map(|c| c.get()), Some(body));
        assert!(fetched.grid.is_none());
    }

    #[tokio::test]
    async fn test_unknown_grid_rejected() {
        let (_dir, pool) = test_pool().await;
        let err = create(
            &pool,
            GeneratedProgramInput {
                program_date: Some("2024-03-01".into()),
                grid_id: Some(77),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_date_required_and_parsed() {
        let (_dir, pool) = test_pool().await;
        let err = create(&pool, GeneratedProgramInput::default()).await.unwrap_err();
        assert!(matches!(err, Error::MissingField(_)));

        let err = create(
            &pool,
            GeneratedProgramInput { program_date: Some("01/03/2024".into()), ..Default::default() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn test_grid_delete_detaches_programs() {
        let (_dir, pool) = test_pool().await;
        let g = grid(&pool).await;
        let created = create(
            &pool,
            GeneratedProgramInput {
                program_date: Some("2024-03-01".into()),
                grid_id: Some(g.id),
                content: raw("[]"),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.grid.as_ref().map(|g| g.name.as_str()), Some("Manhã"));

        grids::delete(&pool, g.id).await.unwrap();

        let fetched = get(&pool, created.id).await.unwrap();
        assert_eq!(fetched.grid_id, None);
        assert!(fetched.grid.is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_by_date() {
        let (_dir, pool) = test_pool().await;
        let g = grid(&pool).await;
        for (date, grid_id) in [("2024-03-01", Some(g.id)), ("2024-03-02", Some(g.id)), ("2024-03-02", None)] {
            create(
                &pool,
                GeneratedProgramInput {
                    program_date: Some(date.into()),
                    grid_id,
                    content: None,
                },
            )
            .await
            .unwrap();
        }

        let all = list(&pool, GeneratedProgramFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].program_date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());

        let for_grid = list(
            &pool,
            GeneratedProgramFilter { grid_id: Some(g.id), date: Some("2024-03-02".into()) },
        )
        .await
        .unwrap();
        assert_eq!(for_grid.len(), 1);

        let err = list(
            &pool,
            GeneratedProgramFilter { date: Some("March".into()), ..Default::default() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }
}
