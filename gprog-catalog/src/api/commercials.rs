//! Commercial endpoints

use super::{deleted, DeleteResponse};
use crate::db::commercials::{self, Commercial, CommercialInput};
use crate::{ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

pub async fn list_commercials(State(state): State<AppState>) -> ApiResult<Json<Vec<Commercial>>> {
    Ok(Json(commercials::list(&state.db).await?))
}

/// POST /api/commercials
///
/// **Errors:** 400 missing title or client, malformed duration
pub async fn create_commercial(
    State(state): State<AppState>,
    payload: Result<Json<CommercialInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Commercial>)> {
    let Json(input) = payload?;
    let commercial = commercials::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(commercial)))
}

pub async fn get_commercial(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Commercial>> {
    Ok(Json(commercials::get(&state.db, id).await?))
}

pub async fn update_commercial(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<CommercialInput>, JsonRejection>,
) -> ApiResult<Json<Commercial>> {
    let Json(input) = payload?;
    Ok(Json(commercials::update(&state.db, id, input).await?))
}

pub async fn delete_commercial(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    commercials::delete(&state.db, id).await?;
    Ok(deleted("Commercial", id))
}

/// Build commercial routes
pub fn commercial_routes() -> Router<AppState> {
    Router::new()
        .route("/api/commercials", get(list_commercials).post(create_commercial))
        .route(
            "/api/commercials/:id",
            get(get_commercial)
                .put(update_commercial)
                .delete(delete_commercial),
        )
}
