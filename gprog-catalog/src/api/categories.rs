//! Category endpoints

use super::{deleted, DeleteResponse};
use crate::db::categories::{self, Category, CategoryInput};
use crate::{ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(categories::list(&state.db).await?))
}

/// POST /api/categories
///
/// **Request:** `{"code": "01", "name": "...", "description": "..."}`
///
/// **Errors:** 400 missing code/name, 409 duplicate code
pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let Json(input) = payload?;
    let category = categories::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/categories/:id
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Category>> {
    Ok(Json(categories::get(&state.db, id).await?))
}

/// PUT /api/categories/:id
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> ApiResult<Json<Category>> {
    let Json(input) = payload?;
    Ok(Json(categories::update(&state.db, id, input).await?))
}

/// DELETE /api/categories/:id
///
/// **Errors:** 404 unknown id, 409 still used by songs or grid slots
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    categories::delete(&state.db, id).await?;
    Ok(deleted("Category", id))
}

/// Build category routes
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}
