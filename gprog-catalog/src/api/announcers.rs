//! Announcer endpoints

use super::{deleted, DeleteResponse};
use crate::db::announcers::{self, Announcer, AnnouncerFilter, AnnouncerInput};
use crate::db::associations::{self, AnnouncerStations};
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
pub struct AnnouncerQuery {
    pub active: Option<String>,
}

/// GET /api/announcers?active=
pub async fn list_announcers(
    State(state): State<AppState>,
    query: Result<Query<AnnouncerQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Announcer>>> {
    let Query(query) = query?;
    let filter = AnnouncerFilter {
        active: parse_bool_filter("active", query.active.as_deref())?,
    };
    Ok(Json(announcers::list(&state.db, filter).await?))
}

pub async fn create_announcer(
    State(state): State<AppState>,
    payload: Result<Json<AnnouncerInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Announcer>)> {
    let Json(input) = payload?;
    let announcer = announcers::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(announcer)))
}

pub async fn get_announcer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Announcer>> {
    Ok(Json(announcers::get(&state.db, id).await?))
}

pub async fn update_announcer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<AnnouncerInput>, JsonRejection>,
) -> ApiResult<Json<Announcer>> {
    let Json(input) = payload?;
    Ok(Json(announcers::update(&state.db, id, input).await?))
}

/// DELETE /api/announcers/:id
///
/// **Errors:** 409 while any station association exists
pub async fn delete_announcer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    announcers::delete(&state.db, id).await?;
    Ok(deleted("Announcer", id))
}

/// GET /api/announcers/:id/stations
pub async fn announcer_stations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AnnouncerStations>> {
    Ok(Json(associations::stations_for_announcer(&state.db, id).await?))
}

/// Build announcer routes
pub fn announcer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/announcers", get(list_announcers).post(create_announcer))
        .route(
            "/api/announcers/:id",
            get(get_announcer).put(update_announcer).delete(delete_announcer),
        )
        .route("/api/announcers/:id/stations", get(announcer_stations))
}
