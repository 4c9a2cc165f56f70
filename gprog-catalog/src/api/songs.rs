//! Song endpoints and autocomplete

use super::{deleted, DeleteResponse};
use crate::db::songs::{self, Song, SongFilter, SongInput, SongPage};
use crate::db::vocabulary::{self, Vocabulary, VocabularyEntry};
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

/// Query parameters for GET /api/songs
#[derive(Debug, Default, Deserialize)]
pub struct SongQuery {
    pub category_id: Option<i64>,
    pub style_id: Option<i64>,
    pub speed: Option<i64>,
    pub year: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Query parameters for the autocomplete endpoints
#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/songs
///
/// **Response:** `{"songs": [...], "total", "pages", "current_page", "per_page"}`
pub async fn list_songs(
    State(state): State<AppState>,
    query: Result<Query<SongQuery>, QueryRejection>,
) -> ApiResult<Json<SongPage>> {
    let Query(query) = query?;
    let filter = SongFilter {
        category_id: query.category_id,
        style_id: query.style_id,
        speed: query.speed,
        year: query.year,
        page: query.page,
        per_page: query.per_page,
    };
    Ok(Json(songs::list(&state.db, filter, state.page_limits).await?))
}

/// POST /api/songs
///
/// **Errors:** 400 missing interpreter1/title/release_year/category_id or bad
/// date, 404 unknown category or style
pub async fn create_song(
    State(state): State<AppState>,
    payload: Result<Json<SongInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Song>)> {
    let Json(input) = payload?;
    let song = songs::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(song)))
}

pub async fn get_song(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Song>> {
    Ok(Json(songs::get(&state.db, id).await?))
}

pub async fn update_song(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<SongInput>, JsonRejection>,
) -> ApiResult<Json<Song>> {
    let Json(input) = payload?;
    Ok(Json(songs::update(&state.db, id, input).await?))
}

pub async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    songs::delete(&state.db, id).await?;
    Ok(deleted("Song", id))
}

async fn autocomplete(
    state: AppState,
    vocabulary: Vocabulary,
    query: Result<Query<AutocompleteQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<VocabularyEntry>>> {
    let Query(query) = query?;
    Ok(Json(vocabulary::autocomplete(&state.db, vocabulary, &query.q).await?))
}

/// GET /api/songs/autocomplete/interpreters?q=
pub async fn autocomplete_interpreters(
    State(state): State<AppState>,
    query: Result<Query<AutocompleteQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<VocabularyEntry>>> {
    autocomplete(state, Vocabulary::Interpreter, query).await
}

/// GET /api/songs/autocomplete/titles?q=
pub async fn autocomplete_titles(
    State(state): State<AppState>,
    query: Result<Query<AutocompleteQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<VocabularyEntry>>> {
    autocomplete(state, Vocabulary::SongTitle, query).await
}

/// GET /api/songs/autocomplete/complements?q=
pub async fn autocomplete_complements(
    State(state): State<AppState>,
    query: Result<Query<AutocompleteQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<VocabularyEntry>>> {
    autocomplete(state, Vocabulary::Complement, query).await
}

/// Build song routes
pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/api/songs", get(list_songs).post(create_song))
        .route(
            "/api/songs/:id",
            get(get_song).put(update_song).delete(delete_song),
        )
        .route("/api/songs/autocomplete/interpreters", get(autocomplete_interpreters))
        .route("/api/songs/autocomplete/titles", get(autocomplete_titles))
        .route("/api/songs/autocomplete/complements", get(autocomplete_complements))
}
