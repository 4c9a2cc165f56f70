//! Station endpoints

use super::{deleted, DeleteResponse};
use crate::db::associations::{self, StationAnnouncers};
use crate::db::parse_bool_filter;
use crate::db::stations::{self, Station, StationFilter, StationInput};
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
pub struct StationQuery {
    pub active: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// GET /api/stations?active=&city=&state=
pub async fn list_stations(
    State(state): State<AppState>,
    query: Result<Query<StationQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Station>>> {
    let Query(query) = query?;
    let filter = StationFilter {
        active: parse_bool_filter("active", query.active.as_deref())?,
        city: query.city,
        state: query.state,
    };
    Ok(Json(stations::list(&state.db, filter).await?))
}

pub async fn create_station(
    State(state): State<AppState>,
    payload: Result<Json<StationInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Station>)> {
    let Json(input) = payload?;
    let station = stations::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(station)))
}

pub async fn get_station(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Station>> {
    Ok(Json(stations::get(&state.db, id).await?))
}

pub async fn update_station(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<StationInput>, JsonRejection>,
) -> ApiResult<Json<Station>> {
    let Json(input) = payload?;
    Ok(Json(stations::update(&state.db, id, input).await?))
}

pub async fn delete_station(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    stations::delete(&state.db, id).await?;
    Ok(deleted("Station", id))
}

/// GET /api/stations/:id/announcers
pub async fn station_announcers(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<StationAnnouncers>> {
    Ok(Json(associations::announcers_for_station(&state.db, id).await?))
}

/// Build station routes
pub fn station_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stations", get(list_stations).post(create_station))
        .route(
            "/api/stations/:id",
            get(get_station).put(update_station).delete(delete_station),
        )
        .route("/api/stations/:id/announcers", get(station_announcers))
}
