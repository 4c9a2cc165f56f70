//! HTTP API integration tests
//!
//! Each test builds the full router over a fresh database file and drives it
//! with `oneshot` requests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use gprog_catalog::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

async fn test_app() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let pool = gprog_common::db::init_database(&dir.path().join("test.db"))
        .await
        .unwrap();
    (dir, build_router(AppState::new(pool)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create(app: &Router, uri: &str, body: Value) -> Value {
    let (status, value) = send(app, "POST", uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "POST {} failed: {}", uri, value);
    value
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn health_reports_ok() {
    let (_dir, app) = test_app().await;

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "gprog-catalog");

    let (status, info) = send(&app, "GET", "/api/buildinfo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));
    assert!(info["git_hash"].is_string());
}

#[tokio::test]
async fn duplicate_category_code_is_conflict() {
    let (_dir, app) = test_app().await;

    let category = create(&app, "/api/categories", json!({"code": "01", "name": "Slow"})).await;
    assert_eq!(category["code"], "01");

    let (status, body) = send(
        &app,
        "POST",
        "/api/categories",
        Some(json!({"code": "01", "name": "Other"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "DUPLICATE_KEY");
    assert!(body["error"]["message"].as_str().unwrap().contains("01"));
}

#[tokio::test]
async fn missing_required_field_is_bad_request() {
    let (_dir, app) = test_app().await;

    let (status, body) = send(&app, "POST", "/api/stations", Some(json!({"code": "R1"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "MISSING_FIELD");
}

#[tokio::test]
async fn malformed_body_uses_error_shape() {
    let (_dir, app) = test_app().await;

    let (status, body) = send(&app, "POST", "/api/styles", Some(json!({"name": 42}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_FORMAT");
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let (_dir, app) = test_app().await;

    let (status, body) = send(&app, "GET", "/api/announcers/999", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn bank_entry_requires_active_association() {
    let (_dir, app) = test_app().await;

    let station = create(
        &app,
        "/api/stations",
        json!({"code": "Radio 1", "name": "Educadora", "state": "sp"}),
    )
    .await;
    let announcer = create(&app, "/api/announcers", json!({"code": "Loc 1", "name": "Ana"})).await;
    let station_id = station["id"].as_i64().unwrap();
    let announcer_id = announcer["id"].as_i64().unwrap();
    assert_eq!(station["state"], "SP");

    // Not associated yet
    let entry = json!({
        "station_id": station_id,
        "announcer_id": announcer_id,
        "interpreter": "Test Artist",
        "speed": 3
    });
    let (status, body) = send(&app, "POST", "/api/bank", Some(entry.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "NOT_ASSOCIATED");

    let association = create(
        &app,
        "/api/associations",
        json!({"announcer_id": announcer_id, "station_id": station_id, "start_date": "2024-01-01"}),
    )
    .await;
    assert_eq!(association["active"], true);
    assert_eq!(association["announcer"]["code"], "Loc 1");

    // Same pair again
    let (status, body) = send(
        &app,
        "POST",
        "/api/associations",
        Some(json!({"announcer_id": announcer_id, "station_id": station_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");

    let (status, eligible) = send(
        &app,
        "GET",
        &format!("/api/bank/stations/{}/announcers", station_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(eligible.as_array().unwrap().len(), 1);

    let created = create(&app, "/api/bank", entry.clone()).await;
    assert_eq!(created["station"]["code"], "Radio 1");
    assert_eq!(created["announcer"]["name"], "Ana");

    let (status, listed) = send(
        &app,
        "GET",
        &format!("/api/bank?station_id={}&active=true", station_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/associations/{}", association["id"]),
        Some(json!({"active": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/api/bank", Some(entry)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "NOT_ASSOCIATED");

    let (_, eligible) = send(
        &app,
        "GET",
        &format!("/api/bank/stations/{}/announcers", station_id),
        None,
    )
    .await;
    assert!(eligible.as_array().unwrap().is_empty());

    // Station still referenced by the bank entry
    let (status, body) = send(&app, "DELETE", &format!("/api/stations/{}", station_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "HAS_DEPENDENTS");
}

#[tokio::test]
async fn bank_speed_outside_range_is_rejected() {
    let (_dir, app) = test_app().await;

    let station = create(&app, "/api/stations", json!({"code": "R1", "name": "Mix"})).await;
    let announcer = create(&app, "/api/announcers", json!({"code": "L1", "name": "Zé"})).await;
    create(
        &app,
        "/api/associations",
        json!({"announcer_id": announcer["id"], "station_id": station["id"]}),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/bank",
        Some(json!({
            "station_id": station["id"],
            "announcer_id": announcer["id"],
            "interpreter": "Someone",
            "speed": 7
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "OUT_OF_RANGE");

    let (status, speeds) = send(&app, "GET", "/api/bank/speeds", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(speeds.as_array().unwrap().len(), 5);
    assert_eq!(speeds[0]["value"], 1);
}

#[tokio::test]
async fn category_delete_blocked_until_songs_move() {
    let (_dir, app) = test_app().await;

    let first = create(&app, "/api/categories", json!({"code": "01", "name": "Slow"})).await;
    let second = create(&app, "/api/categories", json!({"code": "02", "name": "Pop"})).await;
    let song = create(
        &app,
        "/api/songs",
        json!({
            "interpreter1": "Test Artist",
            "title": "First Song",
            "release_year": 1999,
            "category_id": first["id"]
        }),
    )
    .await;
    assert_eq!(song["category"]["code"], "01");
    assert_eq!(song["default_duration"], "00:03:30");

    let (status, body) = send(&app, "DELETE", &format!("/api/categories/{}", first["id"]), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "HAS_DEPENDENTS");

    let (status, moved) = send(
        &app,
        "PUT",
        &format!("/api/songs/{}", song["id"]),
        Some(json!({"category_id": second["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["category"]["code"], "02");
    assert_eq!(moved["title"], "First Song");

    let (status, body) = send(&app, "DELETE", &format!("/api/categories/{}", first["id"]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("deleted"));
}

#[tokio::test]
async fn song_values_feed_autocomplete() {
    let (_dir, app) = test_app().await;

    let category = create(&app, "/api/categories", json!({"code": "01", "name": "Slow"})).await;
    for title in ["One", "Two", "Three"] {
        create(
            &app,
            "/api/songs",
            json!({
                "interpreter1": "Test Artist",
                "title": title,
                "release_year": 2001,
                "category_id": category["id"]
            }),
        )
        .await;
    }

    let (status, entries) = send(&app, "GET", "/api/songs/autocomplete/interpreters?q=test", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["value"], "Test Artist");
    assert_eq!(entries[0]["usage_count"], 3);

    // Below the minimum query length
    let (_, entries) = send(&app, "GET", "/api/songs/autocomplete/titles?q=o", None).await;
    assert!(entries.as_array().unwrap().is_empty());

    let (_, names) = send(&app, "GET", "/api/bank/interpreters/search?q=art", None).await;
    assert_eq!(names, json!(["Test Artist"]));
}

#[tokio::test]
async fn song_listing_is_paginated() {
    let (_dir, app) = test_app().await;

    let category = create(&app, "/api/categories", json!({"code": "01", "name": "Slow"})).await;
    for year in [1990, 1991, 1992] {
        create(
            &app,
            "/api/songs",
            json!({
                "interpreter1": "Band",
                "title": format!("Song {}", year),
                "release_year": year,
                "category_id": category["id"]
            }),
        )
        .await;
    }

    let (status, page) = send(&app, "GET", "/api/songs?per_page=2&page=2", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["pages"], 2);
    assert_eq!(page["current_page"], 2);
    assert_eq!(page["per_page"], 2);
    assert_eq!(page["songs"].as_array().unwrap().len(), 1);
    assert_eq!(page["songs"][0]["release_year"], 1992);

    let (_, filtered) = send(&app, "GET", "/api/songs?year=1991", None).await;
    assert_eq!(filtered["total"], 1);
}

#[tokio::test]
async fn invalid_boolean_filter_is_bad_request() {
    let (_dir, app) = test_app().await;

    let (status, body) = send(&app, "GET", "/api/stations?active=maybe", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_FORMAT");

    let (status, _) = send(&app, "GET", "/api/stations?active=TRUE", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn grid_round_trip() {
    let (_dir, app) = test_app().await;

    let category = create(&app, "/api/categories", json!({"code": "01", "name": "Slow"})).await;
    let grid = create(
        &app,
        "/api/grids",
        json!({
            "name": "Morning",
            "monday_friday": true,
            "categories": [
                {"category_id": category["id"], "position": 2},
                {"category_id": category["id"], "position": 1}
            ],
            "intervals": [
                {"time": "07:30:00", "kind": "bc", "duration": "00:02:00", "position": 1}
            ]
        }),
    )
    .await;

    let (status, fetched) = send(&app, "GET", &format!("/api/grids/{}", grid["id"]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["monday_friday"], true);
    assert_eq!(fetched["applicable_days"], json!(["monday_friday"]));
    assert_eq!(fetched["categories"].as_array().unwrap().len(), 2);
    assert_eq!(fetched["categories"][0]["position"], 1);
    assert_eq!(fetched["categories"][0]["category"]["code"], "01");
    assert_eq!(fetched["intervals"][0]["kind"], "BC");
    assert_eq!(fetched["intervals"][0]["time"], "07:30:00");

    // Omitted lists are kept, supplied lists replace
    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/grids/{}", grid["id"]),
        Some(json!({"intervals": []})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["categories"].as_array().unwrap().len(), 2);
    assert!(updated["intervals"].as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        "POST",
        "/api/grids",
        Some(json!({
            "name": "Broken",
            "intervals": [{"time": "07:30:00", "kind": "XX", "duration": "00:02:00", "position": 1}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_FORMAT");
}

#[tokio::test]
async fn generated_program_content_is_verbatim() {
    let (_dir, app) = test_app().await;

    let grid = create(&app, "/api/grids", json!({"name": "Night"})).await;
    let content = json!({"blocks": [{"slot": 1, "song": "A"}, {"slot": 2, "song": null}]});
    let program = create(
        &app,
        "/api/generated-programs",
        json!({"program_date": "2024-03-01", "grid_id": grid["id"], "content": content}),
    )
    .await;
    assert_eq!(program["content"], content);
    assert_eq!(program["grid"]["name"], "Night");

    let (status, listed) = send(&app, "GET", "/api/generated-programs?date=2024-03-01", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["content"], content);

    let (status, body) = send(
        &app,
        "POST",
        "/api/generated-programs",
        Some(json!({"program_date": "01/03/2024"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_FORMAT");
}

#[tokio::test]
async fn spots_default_their_codes() {
    let (_dir, app) = test_app().await;

    let jingle = create(&app, "/api/jingles", json!({"name": "Station ID"})).await;
    assert_eq!(jingle["code"], "VH");

    let track = create(&app, "/api/tracks", json!({"name": "Bed", "duration": "00:00:30"})).await;
    assert_eq!(track["code"], "TR");
    assert_eq!(track["duration"], "00:00:30");

    let commercial = create(
        &app,
        "/api/commercials",
        json!({"title": "Sale", "client": "Shop"}),
    )
    .await;
    assert_eq!(commercial["code"], "COM");

    let (_, jingles) = send(&app, "GET", "/api/jingles", None).await;
    assert_eq!(jingles.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/api/jingles/{}", jingle["id"]), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &format!("/api/jingles/{}", jingle["id"]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
