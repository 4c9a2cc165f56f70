//! Jingle and track endpoints
//!
//! Both resources share one set of handlers, parameterized by [`SpotKind`].

use super::{deleted, DeleteResponse};
use crate::db::spots::{self, Spot, SpotInput, SpotKind};
use crate::{ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

async fn list_spots(state: AppState, kind: SpotKind) -> ApiResult<Json<Vec<Spot>>> {
    Ok(Json(spots::list(&state.db, kind).await?))
}

async fn create_spot(
    state: AppState,
    kind: SpotKind,
    payload: Result<Json<SpotInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Spot>)> {
    let Json(input) = payload?;
    let spot = spots::create(&state.db, kind, input).await?;
    Ok((StatusCode::CREATED, Json(spot)))
}

async fn get_spot(state: AppState, kind: SpotKind, id: i64) -> ApiResult<Json<Spot>> {
    Ok(Json(spots::get(&state.db, kind, id).await?))
}

async fn update_spot(
    state: AppState,
    kind: SpotKind,
    id: i64,
    payload: Result<Json<SpotInput>, JsonRejection>,
) -> ApiResult<Json<Spot>> {
    let Json(input) = payload?;
    Ok(Json(spots::update(&state.db, kind, id, input).await?))
}

async fn delete_spot(state: AppState, kind: SpotKind, id: i64) -> ApiResult<Json<DeleteResponse>> {
    spots::delete(&state.db, kind, id).await?;
    let what = match kind {
        SpotKind::Jingle => "Jingle",
        SpotKind::Track => "Track",
    };
    Ok(deleted(what, id))
}

fn spot_routes(kind: SpotKind, collection: &str) -> Router<AppState> {
    let item = format!("{}/:id", collection);
    Router::new()
        .route(
            collection,
            get(move |State(state): State<AppState>| list_spots(state, kind)).post(
                move |State(state): State<AppState>, payload: Result<Json<SpotInput>, JsonRejection>| {
                    create_spot(state, kind, payload)
                },
            ),
        )
        .route(
            &item,
            get(move |State(state): State<AppState>, Path(id): Path<i64>| get_spot(state, kind, id))
                .put(
                    move |State(state): State<AppState>,
                          Path(id): Path<i64>,
                          payload: Result<Json<SpotInput>, JsonRejection>| {
                        update_spot(state, kind, id, payload)
                    },
                )
                .delete(move |State(state): State<AppState>, Path(id): Path<i64>| {
                    delete_spot(state, kind, id)
                }),
        )
}

/// Build jingle routes (`/api/jingles`)
pub fn jingle_routes() -> Router<AppState> {
    spot_routes(SpotKind::Jingle, "/api/jingles")
}

/// Build track routes (`/api/tracks`)
pub fn track_routes() -> Router<AppState> {
    spot_routes(SpotKind::Track, "/api/tracks")
}
