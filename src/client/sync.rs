// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ledger sync client.

use crate::client::ClientError;
use crate::models::{ProgressPatch, Session, UserProgress};
use crate::routes::progress::{ProgressUpdateRequest, ProgressUpdateResponse};
use crate::routes::trade::{TradeRequestBody, TradeResponse};
use crate::routes::wallet::{RegisterWalletRequest, RegisterWalletResponse};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Destination for progress snapshots.
#[async_trait]
pub trait ProgressSync: Send + Sync {
    /// Push a full progress snapshot for a session. Returns the stored copy.
    async fn push_progress(
        &self,
        session_id: &str,
        progress: &UserProgress,
    ) -> Result<UserProgress, ClientError>;
}

/// HTTP client for the wallet server.
#[derive(Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    details: Option<String>,
}

impl LedgerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Log in with a wallet address, optionally reusing a session.
    pub async fn register_wallet(
        &self,
        wallet_address: &str,
        login_method: &str,
        session_hint: Option<&str>,
    ) -> Result<RegisterWalletResponse, ClientError> {
        let body = RegisterWalletRequest {
            wallet_address: Some(wallet_address.to_string()),
            login_method: Some(login_method.to_string()),
            timestamp: Some(crate::time_utils::now_rfc3339()),
            game_session: session_hint.map(str::to_string),
        };
        let response = self
            .http
            .post(format!("{}/api/wallet", self.base_url))
            .json(&body)
            .send()
            .await?;
        check_response_json(response).await
    }

    pub async fn fetch_session(&self, session_id: &str) -> Result<Session, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/session/{}", self.base_url, session_id))
            .send()
            .await?;
        check_response_json(response).await
    }

    pub async fn trade(
        &self,
        from_address: &str,
        to_address: &str,
        card_id: &str,
        from_session_id: &str,
    ) -> Result<TradeResponse, ClientError> {
        let body = TradeRequestBody {
            from_address: Some(from_address.to_string()),
            to_address: Some(to_address.to_string()),
            card_id: Some(card_id.to_string()),
            from_session_id: Some(from_session_id.to_string()),
        };
        let response = self
            .http
            .post(format!("{}/api/trade", self.base_url))
            .json(&body)
            .send()
            .await?;
        check_response_json(response).await
    }
}

#[async_trait]
impl ProgressSync for LedgerClient {
    async fn push_progress(
        &self,
        session_id: &str,
        progress: &UserProgress,
    ) -> Result<UserProgress, ClientError> {
        let body = ProgressUpdateRequest {
            session_id: Some(session_id.to_string()),
            game_progress: ProgressPatch::snapshot(progress),
        };
        let response = self
            .http
            .post(format!("{}/api/progress", self.base_url))
            .json(&body)
            .send()
            .await?;
        let updated: ProgressUpdateResponse = check_response_json(response).await?;
        Ok(updated.game_progress)
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let (code, details) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error, body.details),
        Err(_) => (format!("http_{}", status.as_u16()), Some(text)),
    };
    Err(ClientError::Server {
        status: status.as_u16(),
        code,
        details,
    })
}
