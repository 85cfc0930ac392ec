// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod journey;
pub mod progress;
pub mod trade;
pub mod wallet;

use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::http::{header, HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "TrainQuest wallet server is running".to_string(),
        timestamp: now_rfc3339(),
        build_id,
    })
}

/// CORS policy.
///
/// With a configured frontend only that origin (and localhost for dev) is
/// allowed. Without one, any origin is accepted so players on the train's
/// Wi-Fi can reach the server by IP.
fn cors_layer(frontend_url: Option<String>) -> CorsLayer {
    let origin = match frontend_url {
        Some(frontend_url) => AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.frontend_url.clone());

    Router::new()
        .route("/api/health", get(health_check))
        .merge(wallet::routes())
        .merge(progress::routes())
        .merge(trade::routes())
        .merge(journey::routes())
        .layer(middleware::from_fn(crate::middleware::add_api_headers))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
