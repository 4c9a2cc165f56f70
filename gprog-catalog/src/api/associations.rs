//! Announcer-station association endpoints

use super::{deleted, DeleteResponse};
use crate::db::associations::{
    self, Association, AssociationFilter, AssociationInput, AssociationPatch,
};
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
pub struct AssociationQuery {
    pub active: Option<String>,
    pub announcer_id: Option<i64>,
    pub station_id: Option<i64>,
}

/// GET /api/associations?active=&announcer_id=&station_id=
pub async fn list_associations(
    State(state): State<AppState>,
    query: Result<Query<AssociationQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Association>>> {
    let Query(query) = query?;
    let filter = AssociationFilter {
        active: parse_bool_filter("active", query.active.as_deref())?,
        announcer_id: query.announcer_id,
        station_id: query.station_id,
    };
    Ok(Json(associations::list(&state.db, filter).await?))
}

/// POST /api/associations
///
/// **Request:** `{"announcer_id": 1, "station_id": 2, "active": true,
/// "start_date": "2024-01-01", "end_date": null, "notes": "..."}`
///
/// **Errors:** 400 missing id or bad date, 404 unknown announcer/station,
/// 409 pair already associated
pub async fn create_association(
    State(state): State<AppState>,
    payload: Result<Json<AssociationInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Association>)> {
    let Json(input) = payload?;
    let association = associations::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(association)))
}

pub async fn get_association(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Association>> {
    Ok(Json(associations::get(&state.db, id).await?))
}

/// PUT /api/associations/:id
///
/// Only `active`, `start_date`, `end_date` and `notes` can change.
pub async fn update_association(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<AssociationPatch>, JsonRejection>,
) -> ApiResult<Json<Association>> {
    let Json(patch) = payload?;
    Ok(Json(associations::update(&state.db, id, patch).await?))
}

pub async fn delete_association(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    associations::delete(&state.db, id).await?;
    Ok(deleted("Association", id))
}

/// Build association routes
pub fn association_routes() -> Router<AppState> {
    Router::new()
        .route("/api/associations", get(list_associations).post(create_association))
        .route(
            "/api/associations/:id",
            get(get_association)
                .put(update_association)
                .delete(delete_association),
        )
}
