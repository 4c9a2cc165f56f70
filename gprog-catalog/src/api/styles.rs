//! Style endpoints

use super::{deleted, DeleteResponse};
use crate::db::styles::{self, Style, StyleInput};
use crate::{ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

pub async fn list_styles(State(state): State<AppState>) -> ApiResult<Json<Vec<Style>>> {
    Ok(Json(styles::list(&state.db).await?))
}

pub async fn create_style(
    State(state): State<AppState>,
    payload: Result<Json<StyleInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Style>)> {
    let Json(input) = payload?;
    let style = styles::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(style)))
}

pub async fn get_style(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Style>> {
    Ok(Json(styles::get(&state.db, id).await?))
}

pub async fn update_style(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<StyleInput>, JsonRejection>,
) -> ApiResult<Json<Style>> {
    let Json(input) = payload?;
    Ok(Json(styles::update(&state.db, id, input).await?))
}

pub async fn delete_style(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    styles::delete(&state.db, id).await?;
    Ok(deleted("Style", id))
}

/// Build style routes
pub fn style_routes() -> Router<AppState> {
    Router::new()
        .route("/api/styles", get(list_styles).post(create_style))
        .route(
            "/api/styles/:id",
            get(get_style).put(update_style).delete(delete_style),
        )
}
