// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Card trading and airdrop export.

use crate::error::{AppError, Result};
use crate::services::ledger::{ExportRecord, TradeRequest};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/trade", post(trade_card))
        .route("/api/export", get(export_wallets))
}

// ─── Trading ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequestBody {
    #[validate(length(max = 64))]
    pub from_address: Option<String>,
    #[validate(length(max = 64))]
    pub to_address: Option<String>,
    #[validate(length(max = 128))]
    pub card_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::models::session::deserialize_opt_session_id",
        skip_serializing_if = "Option::is_none"
    )]
    #[validate(length(max = 64))]
    pub from_session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
    pub success: bool,
    pub message: String,
    pub sender_cards: Vec<String>,
    pub recipient_cards: Vec<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::MissingField(field))
}

async fn trade_card(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<TradeRequestBody>, JsonRejection>,
) -> Result<Json<TradeResponse>> {
    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let request = TradeRequest {
        from_address: required(body.from_address, "fromAddress")?,
        to_address: required(body.to_address, "toAddress")?,
        card_id: required(body.card_id, "cardId")?,
        from_session_id: required(body.from_session_id, "fromSessionId")?,
    };
    let message = format!("Card {} sent", request.card_id);

    let result = state.ledger.execute_trade(request).await?;

    Ok(Json(TradeResponse {
        success: true,
        message,
        sender_cards: result.sender_cards,
        recipient_cards: result.recipient_cards,
    }))
}

// ─── Export ──────────────────────────────────────────────────

/// Airdrop export.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub export_time: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_users: u64,
    pub eligible_users: usize,
    pub wallets: Vec<ExportRecord>,
}

async fn export_wallets(State(state): State<Arc<AppState>>) -> Result<Json<ExportResponse>> {
    let wallets = state.ledger.export_all().await?;
    let eligible_users = wallets.iter().filter(|w| w.eligible_for_nft).count();

    tracing::info!(
        total = wallets.len(),
        eligible = eligible_users,
        "Wallet export generated"
    );

    Ok(Json(ExportResponse {
        export_time: now_rfc3339(),
        total_users: wallets.len() as u64,
        eligible_users,
        wallets,
    }))
}
