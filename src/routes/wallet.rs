// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wallet registration and listing.

use crate::error::{AppError, Result};
use crate::models::session::deserialize_opt_session_id;
use crate::models::WalletSummary;
use crate::services::ledger::Registration;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, Extensions, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/wallet", post(register_wallet))
        .route("/api/wallets", get(list_wallets))
}

// ─── Registration ────────────────────────────────────────────

/// Wallet login request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RegisterWalletRequest {
    #[validate(length(max = 64))]
    pub wallet_address: Option<String>,
    #[validate(length(max = 32))]
    pub login_method: Option<String>,
    /// Client-side registration time (ISO 8601)
    #[validate(length(max = 64))]
    pub timestamp: Option<String>,
    /// Session id to reuse; string or number
    #[serde(
        default,
        deserialize_with = "deserialize_opt_session_id",
        skip_serializing_if = "Option::is_none"
    )]
    #[validate(length(max = 64))]
    pub game_session: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RegisterWalletResponse {
    pub success: bool,
    pub message: String,
    pub session_id: String,
    pub wallet_address: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_users: u64,
    pub is_new_wallet: bool,
}

/// Caller IP: first `X-Forwarded-For` hop, else the socket peer.
fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    forwarded.or_else(|| {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

async fn register_wallet(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    extensions: Extensions,
    payload: std::result::Result<Json<RegisterWalletRequest>, JsonRejection>,
) -> Result<Json<RegisterWalletResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let wallet_address = request
        .wallet_address
        .filter(|a| !a.trim().is_empty())
        .ok_or(AppError::MissingField("Wallet address"))?;

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let result = state
        .ledger
        .register_wallet(Registration {
            wallet_address,
            login_method: request.login_method.unwrap_or_default(),
            timestamp: request.timestamp,
            session_hint: request.game_session,
            ip_address: client_ip(&headers, &extensions),
            user_agent,
        })
        .await?;

    let message = if result.is_new_wallet {
        "Wallet registered successfully"
    } else {
        "Wallet updated successfully"
    };

    Ok(Json(RegisterWalletResponse {
        success: true,
        message: message.to_string(),
        session_id: result.session_id,
        wallet_address: result.wallet_address,
        total_users: result.total_users,
        is_new_wallet: result.is_new_wallet,
    }))
}

// ─── Admin Listing ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ListingMetadata {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_users: u64,
    pub created: String,
}

/// Sanitized wallet list (no IP addresses or user agents).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct WalletListResponse {
    pub wallets: Vec<WalletSummary>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_users: u64,
    pub metadata: ListingMetadata,
}

async fn list_wallets(State(state): State<Arc<AppState>>) -> Result<Json<WalletListResponse>> {
    let listing = state.ledger.list_wallets().await?;
    Ok(Json(WalletListResponse {
        wallets: listing.wallets,
        total_users: listing.total_users,
        metadata: ListingMetadata {
            total_users: listing.total_users,
            created: listing.created,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 5], 4000))));

        assert_eq!(client_ip(&headers, &extensions).as_deref(), Some("192.168.1.5"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers, &extensions).as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn test_numeric_session_hint_accepted() {
        let request: RegisterWalletRequest = serde_json::from_value(serde_json::json!({
            "walletAddress": "0xabc",
            "loginMethod": "manual",
            "gameSession": 1735689600000u64
        }))
        .unwrap();
        assert_eq!(request.game_session.as_deref(), Some("1735689600000"));
    }
}
