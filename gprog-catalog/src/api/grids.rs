//! Program grid endpoints

use super::{deleted, DeleteResponse};
use crate::db::grids::{self, Grid, GridFilter, GridInput};
use crate::db::parse_bool_filter;
use crate::{ApiResult, AppState};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct GridQuery {
    pub active: Option<String>,
}

/// GET /api/grids?active=
pub async fn list_grids(
    State(state): State<AppState>,
    query: Result<Query<GridQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Grid>>> {
    let Query(query) = query?;
    let filter = GridFilter {
        active: parse_bool_filter("active", query.active.as_deref())?,
    };
    Ok(Json(grids::list(&state.db, filter).await?))
}

/// POST /api/grids
///
/// **Request:**
/// ```json
/// {
///   "name": "Morning",
///   "monday_friday": true,
///   "categories": [{"category_id": 1, "position": 1}],
///   "intervals": [{"time": "07:30:00", "kind": "BC", "duration": "00:02:00", "position": 1}]
/// }
/// ```
///
/// **Errors:** 400 missing name or malformed marker, 404 unknown category
pub async fn create_grid(
    State(state): State<AppState>,
    payload: Result<Json<GridInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Grid>)> {
    let Json(input) = payload?;
    let grid = grids::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(grid)))
}

pub async fn get_grid(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Grid>> {
    Ok(Json(grids::get(&state.db, id).await?))
}

/// PUT /api/grids/:id
///
/// Supplied `categories` / `intervals` replace the current lists; omitted
/// lists are kept.
pub async fn update_grid(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<GridInput>, JsonRejection>,
) -> ApiResult<Json<Grid>> {
    let Json(input) = payload?;
    Ok(Json(grids::update(&state.db, id, input).await?))
}

pub async fn delete_grid(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    grids::delete(&state.db, id).await?;
    Ok(deleted("Grid", id))
}

/// Build grid routes
pub fn grid_routes() -> Router<AppState> {
    Router::new()
        .route("/api/grids", get(list_grids).post(create_grid))
        .route(
            "/api/grids/:id",
            get(get_grid).put(update_grid).delete(delete_grid),
        )
}
