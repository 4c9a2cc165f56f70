//! gprog-catalog library interface
//!
//! Exposes the store, the HTTP handlers and the router so integration tests
//! can drive the service without binding a socket.

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use pagination::PageLimits;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Song listing page sizes
    pub page_limits: PageLimits,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            page_limits: PageLimits::default(),
        }
    }

    pub fn with_page_limits(mut self, page_limits: PageLimits) -> Self {
        self.page_limits = page_limits;
        self
    }
}

fn api_router() -> Router<AppState> {
    Router::new()
        .merge(api::health_routes())
        .merge(api::category_routes())
        .merge(api::style_routes())
        .merge(api::song_routes())
        .merge(api::announcer_routes())
        .merge(api::station_routes())
        .merge(api::association_routes())
        .merge(api::bank_routes())
        .merge(api::grid_routes())
        .merge(api::generated_program_routes())
        .merge(api::jingle_routes())
        .merge(api::track_routes())
        .merge(api::commercial_routes())
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    build_router_with_static(state, None)
}

/// Build application router, serving a web front end from `static_dir`
///
/// Unknown non-API paths fall back to `index.html` so client-side routes
/// resolve.
pub fn build_router_with_static(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let mut router = api_router();

    if let Some(dir) = static_dir {
        let index = dir.join("index.html");
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
