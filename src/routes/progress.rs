// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session progress routes.

use crate::error::{AppError, Result};
use crate::models::session::deserialize_opt_session_id;
use crate::models::{ProgressPatch, Session, UserProgress};
use crate::services::ledger::SessionDiagnostics;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/progress", post(update_progress))
        .route("/api/session/{session_id}", get(get_session))
        .route("/api/verify/{session_id}", get(verify_session))
}

/// Progress sync request. `gameProgress` should be a full snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateRequest {
    #[serde(
        default,
        deserialize_with = "deserialize_opt_session_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<String>,
    #[serde(default)]
    pub game_progress: ProgressPatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateResponse {
    pub success: bool,
    pub message: String,
    pub session_id: String,
    pub game_progress: UserProgress,
}

async fn update_progress(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ProgressUpdateRequest>, JsonRejection>,
) -> Result<Json<ProgressUpdateResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let session_id = request
        .session_id
        .ok_or(AppError::MissingField("Session ID"))?;

    let game_progress = state
        .ledger
        .update_progress(&session_id, request.game_progress)
        .await?;

    Ok(Json(ProgressUpdateResponse {
        success: true,
        message: "Game progress updated".to_string(),
        session_id,
        game_progress,
    }))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>> {
    Ok(Json(state.ledger.get_session(&session_id).await?))
}

/// Diagnostic counts for support and airdrop checks.
async fn verify_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDiagnostics>> {
    Ok(Json(state.ledger.verify_session(&session_id).await?))
}
