// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use trainquest::config::Config;
use trainquest::db::JsonFileStore;
use trainquest::routes::create_router;
use trainquest::services::{Ledger, RouteService};
use trainquest::AppState;

pub const ROUTE_FILE: &str = "data/duronto_route.geojson";

/// Two well-formed wallet addresses.
#[allow(dead_code)]
pub const ALICE: &str = "0xAbCdEf0123456789abcdef0123456789ABCDEF01";
#[allow(dead_code)]
pub const BOB: &str = "0x1111111111111111111111111111111111111111";

/// Load the shipped route catalog.
#[allow(dead_code)]
pub fn test_route() -> Arc<RouteService> {
    Arc::new(RouteService::load_from_file(ROUTE_FILE).expect("Failed to load route"))
}

/// Create a test app backed by a ledger file in a fresh temp directory.
/// Returns the router, the shared state, and the directory (keep it alive).
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config {
        data_file: dir.path().join("wallet_data.json"),
        ..Config::default()
    };
    let ledger = Ledger::new(JsonFileStore::new(&config.data_file));

    let state = Arc::new(AppState {
        config,
        ledger,
        route: test_route(),
    });

    (create_router(state.clone()), state, dir)
}

/// Send a request to the router and decode the JSON response.
#[allow(dead_code)]
pub async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Register a wallet and return its session id.
#[allow(dead_code)]
pub async fn register(app: &axum::Router, address: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/wallet",
        Some(serde_json::json!({ "walletAddress": address, "loginMethod": "manual" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "registration failed: {body}");
    body["sessionId"].as_str().unwrap().to_string()
}

/// Overwrite a session's card list.
#[allow(dead_code)]
pub async fn set_cards(app: &axum::Router, session_id: &str, cards: &[&str]) {
    let (status, body) = send(
        app,
        "POST",
        "/api/progress",
        Some(serde_json::json!({
            "sessionId": session_id,
            "gameProgress": { "collectedCards": cards }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "progress update failed: {body}");
}
