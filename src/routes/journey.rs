// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route catalog and journey evaluation.
//!
//! Both endpoints are pure computations over the loaded catalog; nothing
//! here touches the ledger.

use crate::error::{AppError, Result};
use crate::models::{CollectibleCard, QuestType, RouteInfo};
use crate::services::{JourneyProgress, JourneyTracker};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use geo::Point;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/route", get(get_route))
        .route("/api/journey/check", post(check_journey))
}

// ─── Catalog ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct StationView {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub lat: f64,
    pub lng: f64,
    pub arrival_time: Option<String>,
    pub departure_time: Option<String>,
    pub platform: Option<String>,
    pub distance_from_source: f64,
    pub proximity_radius: f64,
    pub quest_type: QuestType,
    pub quest_title: String,
    pub quest_description: String,
    /// Generic blurb for the quest type
    pub quest_type_description: String,
    pub card_reward: String,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub route: RouteInfo,
    pub stations: Vec<StationView>,
    pub cards: Vec<CollectibleCard>,
}

async fn get_route(State(state): State<Arc<AppState>>) -> Json<RouteResponse> {
    let stations = state
        .route
        .stations()
        .iter()
        .map(|s| StationView {
            id: s.id,
            code: s.code.clone(),
            name: s.name.clone(),
            city: s.city.clone(),
            state: s.state.clone(),
            lat: s.lat(),
            lng: s.lng(),
            arrival_time: s.arrival_time.clone(),
            departure_time: s.departure_time.clone(),
            platform: s.platform.clone(),
            distance_from_source: s.distance_from_source_km,
            proximity_radius: s.proximity_radius_m,
            quest_type: s.quest.quest_type,
            quest_title: s.quest.title.clone(),
            quest_description: s.quest.description.clone(),
            quest_type_description: s.quest.quest_type.description().to_string(),
            card_reward: s.card_reward.clone(),
        })
        .collect();

    Json(RouteResponse {
        route: state.route.info().clone(),
        stations,
        cards: state.route.cards().to_vec(),
    })
}

// ─── Journey Check ───────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct JourneyCheckRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub completed_stations: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct JourneyCheckResponse {
    #[serde(flatten)]
    pub journey: JourneyProgress,
    pub location_message: String,
}

async fn check_journey(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<JourneyCheckRequest>, JsonRejection>,
) -> Result<Json<JourneyCheckResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if !(-90.0..=90.0).contains(&request.lat) || !(-180.0..=180.0).contains(&request.lng) {
        return Err(AppError::BadRequest(format!(
            "coordinates out of range: {}, {}",
            request.lat, request.lng
        )));
    }

    let tracker = JourneyTracker::new(&state.route);
    let journey = tracker.evaluate(
        Point::new(request.lng, request.lat),
        &request.completed_stations,
    );
    let location_message = tracker.location_message(&journey);

    Ok(Json(JourneyCheckResponse {
        journey,
        location_message,
    }))
}
