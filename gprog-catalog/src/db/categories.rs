//! Song categories
//!
//! A category is identified by a unique short code. It cannot be deleted
//! while songs or grid slots still reference it.

use super::{count_references, non_empty, require_text};
use chrono::{DateTime, Utc};
use gprog_common::db::begin_write;
use gprog_common::time::now;
use gprog_common::{map_unique_violation, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload; `None` leaves the stored value unchanged on update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

pub(crate) async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT id, code, name, description, created_at, updated_at FROM categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(category)
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Category> {
    find(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Category {} not found", id)))
}

async fn code_taken(conn: &mut SqliteConnection, code: &str, except: Option<i64>) -> Result<bool> {
    let hit: Option<i64> =
        sqlx::query_scalar("SELECT id FROM categories WHERE code = ? AND id != ?")
            .bind(code)
            .bind(except.unwrap_or(-1))
            .fetch_optional(&mut *conn)
            .await?;
    Ok(hit.is_some())
}

/// All categories in creation order
pub async fn list(pool: &SqlitePool) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, code, name, description, created_at, updated_at FROM categories ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Category> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

pub async fn create(pool: &SqlitePool, input: CategoryInput) -> Result<Category> {
    let code = require_text("code", input.code)?;
    let name = require_text("name", input.name)?;

    let mut tx = begin_write(pool).await?;

    if code_taken(&mut tx, &code, None).await? {
        return Err(Error::DuplicateKey(format!("Category code '{}' already exists", code)));
    }

    let ts = now();
    let id = sqlx::query(
        "INSERT INTO categories (code, name, description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&code)
    .bind(&name)
    .bind(non_empty(input.description))
    .bind(ts)
    .bind(ts)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        map_unique_violation(e, || {
            Error::DuplicateKey(format!("Category code '{}' already exists", code))
        })
    })?
    .last_insert_rowid();

    let category = fetch(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, code = %category.code, "Created category");
    Ok(category)
}

pub async fn update(pool: &SqlitePool, id: i64, input: CategoryInput) -> Result<Category> {
    let mut tx = begin_write(pool).await?;
    let existing = fetch(&mut tx, id).await?;

    let code = non_empty(input.code).unwrap_or(existing.code);
    if code_taken(&mut tx, &code, Some(id)).await? {
        return Err(Error::DuplicateKey(format!("Category code '{}' already exists", code)));
    }
    let name = non_empty(input.name).unwrap_or(existing.name);
    let description = non_empty(input.description).or(existing.description);

    sqlx::query(
        "UPDATE categories SET code = ?, name = ?, description = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&code)
    .bind(&name)
    .bind(&description)
    .bind(now())
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        map_unique_violation(e, || {
            Error::DuplicateKey(format!("Category code '{}' already exists", code))
        })
    })?;

    let category = fetch(&mut tx, id).await?;
    tx.commit().await?;
    Ok(category)
}

/// Delete a category nothing references
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let mut tx = begin_write(pool).await?;
    let category = fetch(&mut tx, id).await?;

    let songs = count_references(&mut tx, "songs", "category_id", id).await?;
    if songs > 0 {
        return Err(Error::HasDependents(format!(
            "Category '{}' is used by {} song(s)",
            category.code, songs
        )));
    }
    let slots = count_references(&mut tx, "grid_category_slots", "category_id", id).await?;
    if slots > 0 {
        return Err(Error::HasDependents(format!(
            "Category '{}' is used by {} grid slot(s)",
            category.code, slots
        )));
    }

    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(id, code = %category.code, "Deleted category");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;

    fn input(code: &str, name: &str) -> CategoryInput {
        CategoryInput {
            code: Some(code.into()),
            name: Some(name.into()),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_in_creation_order() {
        let (_dir, pool) = test_pool().await;
        create(&pool, input("02", "Nacional Pop")).await.unwrap();
        create(&pool, input("01", "Internacional")).await.unwrap();

        let codes: Vec<_> = list(&pool).await.unwrap().into_iter().map(|c| c.code).collect();
        assert_eq!(codes, vec!["02", "01"]);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let (_dir, pool) = test_pool().await;
        create(&pool, input("01", "A")).await.unwrap();
        let err = create(&pool, input("01", "B")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn test_missing_code_rejected() {
        let (_dir, pool) = test_pool().await;
        let err = create(&pool, CategoryInput { name: Some("A".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingField(f) if f == "code"));
    }

    #[tokio::test]
    async fn test_update_keeps_omitted_fields() {
        let (_dir, pool) = test_pool().await;
        let created = create(
            &pool,
            CategoryInput {
                description: Some("slow songs".into()),
                ..input("01", "Lentas")
            },
        )
        .await
        .unwrap();

        let updated = update(
            &pool,
            created.id,
            CategoryInput { name: Some("Lentas FB".into()), ..Default::default() },
        )
        .await
        .unwrap();

        assert_eq!(updated.code, "01");
        assert_eq!(updated.name, "Lentas FB");
        assert_eq!(updated.description.as_deref(), Some("slow songs"));
    }

    #[tokio::test]
    async fn test_update_to_taken_code_rejected() {
        let (_dir, pool) = test_pool().await;
        create(&pool, input("01", "A")).await.unwrap();
        let b = create(&pool, input("02", "B")).await.unwrap();

        let err = update(&pool, b.id, CategoryInput { code: Some("01".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (_dir, pool) = test_pool().await;
        assert!(matches!(delete(&pool, 42).await, Err(Error::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_parallel_creates_all_succeed() {
        let (_dir, pool) = test_pool().await;

        let mut handles = Vec::new();
        for i in 0..32 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                create(&pool, input(&format!("C{}", i), "Parallel")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(list(&pool).await.unwrap().len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_parallel_duplicates_yield_one_row() {
        let (_dir, pool) = test_pool().await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move { create(&pool, input("01", "Same")).await }));
        }
        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, Error::DuplicateKey(_)), "{:?}", err),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(list(&pool).await.unwrap().len(), 1);
    }
}
