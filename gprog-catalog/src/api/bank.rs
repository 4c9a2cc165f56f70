//! Announcement bank endpoints
//!
//! Besides CRUD, the bank exposes the lookups an entry form needs: eligible
//! stations, announcers authorized for a station, interpreter names from the
//! song catalog and the speed vocabulary.

use super::{deleted, DeleteResponse};
use crate::db::announcers::Announcer;
use crate::db::bank::{self, BankEntry, BankEntryInput, BankFilter, Speed, SPEEDS};
use crate::db::parse_bool_filter;
use crate::db::stations::Station;
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
pub struct BankQuery {
    pub active: Option<String>,
    pub station_id: Option<i64>,
    pub announcer_id: Option<i64>,
    pub speed: Option<i64>,
    pub interpreter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/bank
pub async fn list_entries(
    State(state): State<AppState>,
    query: Result<Query<BankQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<BankEntry>>> {
    let Query(query) = query?;
    let filter = BankFilter {
        active: parse_bool_filter("active", query.active.as_deref())?,
        station_id: query.station_id,
        announcer_id: query.announcer_id,
        speed: query.speed,
        interpreter: query.interpreter,
    };
    Ok(Json(bank::list(&state.db, filter).await?))
}

/// POST /api/bank
///
/// **Request:** `{"station_id": 1, "announcer_id": 2, "interpreter": "...",
/// "speed": 3, "script": "...", "audio_file": "..."}`
///
/// **Errors:**
/// - 400 missing field, announcer not actively associated with the station,
///   speed outside 1..5
/// - 404 unknown station or announcer
pub async fn create_entry(
    State(state): State<AppState>,
    payload: Result<Json<BankEntryInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BankEntry>)> {
    let Json(input) = payload?;
    let entry = bank::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BankEntry>> {
    Ok(Json(bank::get(&state.db, id).await?))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<BankEntryInput>, JsonRejection>,
) -> ApiResult<Json<BankEntry>> {
    let Json(input) = payload?;
    Ok(Json(bank::update(&state.db, id, input).await?))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    bank::delete(&state.db, id).await?;
    Ok(deleted("Bank entry", id))
}

/// GET /api/bank/stations
pub async fn eligible_stations(State(state): State<AppState>) -> ApiResult<Json<Vec<Station>>> {
    Ok(Json(bank::eligible_stations(&state.db).await?))
}

/// GET /api/bank/stations/:id/announcers
pub async fn eligible_announcers(
    State(state): State<AppState>,
    Path(station_id): Path<i64>,
) -> ApiResult<Json<Vec<Announcer>>> {
    Ok(Json(bank::eligible_announcers(&state.db, station_id).await?))
}

/// GET /api/bank/interpreters
pub async fn interpreters(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(bank::interpreters(&state.db).await?))
}

/// GET /api/bank/interpreters/search?q=
pub async fn search_interpreters(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<String>>> {
    let Query(query) = query?;
    Ok(Json(bank::search_interpreters(&state.db, &query.q).await?))
}

/// GET /api/bank/speeds
pub async fn speeds() -> Json<&'static [Speed]> {
    Json(&SPEEDS[..])
}

/// Build bank routes
pub fn bank_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bank", get(list_entries).post(create_entry))
        .route(
            "/api/bank/:id",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .route("/api/bank/stations", get(eligible_stations))
        .route("/api/bank/stations/:id/announcers", get(eligible_announcers))
        .route("/api/bank/interpreters", get(interpreters))
        .route("/api/bank/interpreters/search", get(search_interpreters))
        .route("/api/bank/speeds", get(speeds))
}
