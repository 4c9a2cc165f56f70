//! Generated program endpoints

use super::{deleted, DeleteResponse};
use crate::db::generated::{self, GeneratedProgram, GeneratedProgramFilter, GeneratedProgramInput};
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
pub struct GeneratedProgramQuery {
    pub grid_id: Option<i64>,
    pub date: Option<String>,
}

/// GET /api/generated-programs?grid_id=&date=
pub async fn list_programs(
    State(state): State<AppState>,
    query: Result<Query<GeneratedProgramQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<GeneratedProgram>>> {
    let Query(query) = query?;
    let filter = GeneratedProgramFilter {
        grid_id: query.grid_id,
        date: query.date,
    };
    Ok(Json(generated::list(&state.db, filter).await?))
}

/// POST /api/generated-programs
///
/// **Request:** `{"program_date": "2024-03-01", "grid_id": 1, "content": <any JSON>}`
pub async fn create_program(
    State(state): State<AppState>,
    payload: Result<Json<GeneratedProgramInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<GeneratedProgram>)> {
    let Json(input) = payload?;
    let program = generated::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(program)))
}

pub async fn get_program(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<GeneratedProgram>> {
    Ok(Json(generated::get(&state.db, id).await?))
}

pub async fn delete_program(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    generated::delete(&state.db, id).await?;
    Ok(deleted("Generated program", id))
}

/// Build generated program routes
pub fn generated_program_routes() -> Router<AppState> {
    Router::new()
        .route("/api/generated-programs", get(list_programs).post(create_program))
        .route(
            "/api/generated-programs/:id",
            get(get_program).delete(delete_program),
        )
}
