//! HTTP API handlers for gprog-catalog
//!
//! Every resource lives under `/api`; each module contributes a router that
//! `build_router` merges. Request bodies and query strings are extracted as
//! `Result`s so that malformed input is reported in the common JSON error
//! shape instead of axum's plain-text rejection.

pub mod announcers;
pub mod associations;
pub mod bank;
pub mod categories;
pub mod commercials;
pub mod generated;
pub mod grids;
pub mod health;
pub mod songs;
pub mod spots;
pub mod stations;
pub mod styles;

pub use announcers::announcer_routes;
pub use associations::association_routes;
pub use bank::bank_routes;
pub use categories::category_routes;
pub use commercials::commercial_routes;
pub use generated::generated_program_routes;
pub use grids::grid_routes;
pub use health::health_routes;
pub use songs::song_routes;
pub use spots::{jingle_routes, track_routes};
pub use stations::station_routes;
pub use styles::style_routes;

use axum::Json;
use serde::Serialize;

/// Body returned by every successful delete
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

pub(crate) fn deleted(what: &str, id: i64) -> Json<DeleteResponse> {
    Json(DeleteResponse {
        message: format!("{} {} deleted", what, id),
    })
}
