// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wallet/session ledger.
//!
//! Owns wallet registration, per-session progress and card trades. Every
//! mutation is a read-modify-write of the whole store, and mutations are
//! serialized through a single async mutex so concurrent requests cannot
//! lose each other's updates. Reads go straight to the store.

use crate::db::{JsonFileStore, LedgerDocument};
use crate::error::{AppError, Result};
use crate::models::wallet::{is_valid_wallet_address, normalize_address, same_address};
use crate::models::{LoginMethod, ProgressPatch, Session, UserProgress, Wallet, WalletSummary};
use crate::time_utils::now_rfc3339;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Completed stations needed to qualify for the NFT airdrop.
pub const NFT_ELIGIBILITY_STATIONS: usize = 3;

/// Input for [`Ledger::register_wallet`].
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub wallet_address: String,
    pub login_method: String,
    /// Client-supplied registration time (ISO 8601)
    pub timestamp: Option<String>,
    /// Caller-chosen session id
    pub session_hint: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationResult {
    pub session_id: String,
    pub wallet_address: String,
    pub total_users: u64,
    /// False when an existing wallet logged in again
    pub is_new_wallet: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeResult {
    pub sender_cards: Vec<String>,
    pub recipient_cards: Vec<String>,
}

/// Input for [`Ledger::execute_trade`].
#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub from_address: String,
    pub to_address: String,
    pub card_id: String,
    pub from_session_id: String,
}

/// One wallet's airdrop eligibility.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub wallet_address: String,
    pub login_method: LoginMethod,
    pub registration_time: String,
    pub last_active: String,
    pub game_progress: Option<UserProgress>,
    pub completed_stations: usize,
    #[serde(rename = "totalXP")]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_xp: u64,
    #[serde(rename = "eligibleForNFT")]
    pub eligible_for_nft: bool,
}

/// Diagnostic counts for one session.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SessionDiagnostics {
    pub session_id: String,
    pub wallet_address: String,
    pub wallet_registered: bool,
    pub completed_stations: usize,
    pub collected_cards: usize,
    pub unique_cards: usize,
    #[serde(rename = "totalXP")]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_xp: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub tokens: u64,
    #[serde(rename = "eligibleForNFT")]
    pub eligible_for_nft: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub version: u64,
    pub last_updated: Option<String>,
}

/// Wallet listing without request metadata.
#[derive(Debug, Clone)]
pub struct WalletListing {
    pub wallets: Vec<WalletSummary>,
    pub total_users: u64,
    pub created: String,
}

/// Server-side wallet and session ledger.
pub struct Ledger {
    store: JsonFileStore,
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(store: JsonFileStore) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &JsonFileStore {
        &self.store
    }

    /// Run one read-modify-write cycle.
    ///
    /// If `f` fails nothing is written.
    async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut LedgerDocument) -> Result<T>,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.store.load().await?;
        let out = f(&mut doc)?;
        self.store.save(&doc).await?;
        Ok(out)
    }

    /// Register a wallet login and open a session for it.
    pub async fn register_wallet(&self, registration: Registration) -> Result<RegistrationResult> {
        let address = registration.wallet_address.as_str();
        if address.trim().is_empty() {
            return Err(AppError::MissingField("Wallet address"));
        }
        // Checked as given: surrounding whitespace is not a valid address.
        if !is_valid_wallet_address(address) {
            return Err(AppError::InvalidAddress(address.to_string()));
        }
        let login_method: LoginMethod = registration
            .login_method
            .parse()
            .map_err(|_| AppError::InvalidLoginMethod(registration.login_method.clone()))?;
        let address = normalize_address(address);

        let result = self
            .mutate(|doc| {
                let now = now_rfc3339();
                let session_id = choose_session_id(doc, &address, registration.session_hint);

                let is_new_wallet = match doc
                    .wallets
                    .iter_mut()
                    .find(|w| same_address(&w.wallet_address, &address))
                {
                    Some(wallet) => {
                        wallet.login_method = login_method;
                        wallet.last_active = now.clone();
                        wallet.session_id = Some(session_id.clone());
                        if registration.ip_address.is_some() {
                            wallet.ip_address = registration.ip_address;
                        }
                        if registration.user_agent.is_some() {
                            wallet.user_agent = registration.user_agent;
                        }
                        false
                    }
                    None => {
                        doc.wallets.push(Wallet {
                            wallet_address: address.clone(),
                            login_method,
                            registered_at: registration.timestamp.unwrap_or_else(|| now.clone()),
                            last_active: now,
                            session_id: Some(session_id.clone()),
                            ip_address: registration.ip_address,
                            user_agent: registration.user_agent,
                        });
                        doc.metadata.total_users = doc.wallets.len() as u64;
                        true
                    }
                };

                match doc.sessions.get_mut(&session_id) {
                    // Re-login with the wallet's own session keeps its progress.
                    Some(session) => session.login_method = login_method,
                    None => {
                        doc.sessions.insert(
                            session_id.clone(),
                            Session::new(session_id.clone(), address.clone(), login_method),
                        );
                    }
                }

                Ok(RegistrationResult {
                    session_id,
                    wallet_address: address.clone(),
                    total_users: doc.metadata.total_users,
                    is_new_wallet,
                })
            })
            .await?;

        if result.is_new_wallet {
            tracing::info!(
                wallet = %result.wallet_address,
                login_method = %login_method,
                total_users = result.total_users,
                "New wallet registered"
            );
        } else {
            tracing::info!(wallet = %result.wallet_address, "Existing wallet logged in");
        }
        Ok(result)
    }

    /// Overwrite fields of a session's progress.
    pub async fn update_progress(&self, session_id: &str, patch: ProgressPatch) -> Result<UserProgress> {
        let progress = self
            .mutate(|doc| {
                let session = doc
                    .sessions
                    .get_mut(session_id)
                    .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;

                if let Some(expected) = patch.base_version {
                    let actual = session.game_progress.version;
                    if expected != actual {
                        return Err(AppError::VersionConflict { expected, actual });
                    }
                }

                session.game_progress.apply_patch(patch);
                session.touch();
                Ok(session.game_progress.clone())
            })
            .await?;

        tracing::debug!(
            session_id,
            completed = progress.completed_stations.len(),
            version = progress.version,
            "Progress updated"
        );
        Ok(progress)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        let doc = self.store.load().await?;
        doc.sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))
    }

    /// Move one copy of a card from the sender's session to the recipient's.
    ///
    /// If the recipient already holds the card, the sender still loses it.
    pub async fn execute_trade(&self, request: TradeRequest) -> Result<TradeResult> {
        if same_address(&request.from_address, &request.to_address) {
            return Err(AppError::SelfTradeNotAllowed);
        }
        let card_id = request.card_id.as_str();

        let result = self
            .mutate(|doc| {
                let sender = doc
                    .sessions
                    .get(&request.from_session_id)
                    .filter(|s| same_address(&s.wallet_address, &request.from_address))
                    .ok_or_else(|| AppError::InvalidSenderSession(request.from_session_id.clone()))?;

                if !sender.game_progress.has_card(card_id) {
                    return Err(AppError::CardNotOwned(card_id.to_string()));
                }

                if !doc
                    .wallets
                    .iter()
                    .any(|w| same_address(&w.wallet_address, &request.to_address))
                {
                    return Err(AppError::RecipientNotRegistered(normalize_address(
                        &request.to_address,
                    )));
                }

                let recipient_id = resolve_session_id(doc, &request.to_address).ok_or_else(|| {
                    AppError::RecipientHasNoProgress(normalize_address(&request.to_address))
                })?;

                let sender_cards = {
                    let sender = doc
                        .sessions
                        .get_mut(&request.from_session_id)
                        .ok_or_else(|| AppError::InvalidSenderSession(request.from_session_id.clone()))?;
                    let cards = &mut sender.game_progress.collected_cards;
                    if let Some(pos) = cards.iter().position(|c| c == card_id) {
                        cards.remove(pos);
                    }
                    sender.touch();
                    sender.game_progress.collected_cards.clone()
                };

                let recipient = doc
                    .sessions
                    .get_mut(&recipient_id)
                    .ok_or_else(|| AppError::RecipientHasNoProgress(normalize_address(&request.to_address)))?;
                if !recipient.game_progress.has_card(card_id) {
                    recipient.game_progress.collected_cards.push(card_id.to_string());
                }
                recipient.touch();

                Ok(TradeResult {
                    sender_cards,
                    recipient_cards: recipient.game_progress.collected_cards.clone(),
                })
            })
            .await?;

        tracing::info!(
            from = %normalize_address(&request.from_address),
            to = %normalize_address(&request.to_address),
            card_id,
            "Card traded"
        );
        Ok(result)
    }

    /// Airdrop eligibility for every wallet.
    pub async fn export_all(&self) -> Result<Vec<ExportRecord>> {
        let doc = self.store.load().await?;
        Ok(doc
            .wallets
            .iter()
            .map(|wallet| {
                let progress = resolve_session_id(&doc, &wallet.wallet_address)
                    .and_then(|id| doc.sessions.get(&id))
                    .map(|s| s.game_progress.clone());
                let completed = progress
                    .as_ref()
                    .map(|p| p.completed_stations.len())
                    .unwrap_or(0);
                ExportRecord {
                    wallet_address: wallet.wallet_address.clone(),
                    login_method: wallet.login_method,
                    registration_time: wallet.registered_at.clone(),
                    last_active: wallet.last_active.clone(),
                    completed_stations: completed,
                    total_xp: progress.as_ref().map(|p| p.total_xp).unwrap_or(0),
                    eligible_for_nft: completed >= NFT_ELIGIBILITY_STATIONS,
                    game_progress: progress,
                }
            })
            .collect())
    }

    pub async fn list_wallets(&self) -> Result<WalletListing> {
        let doc = self.store.load().await?;
        Ok(WalletListing {
            wallets: doc.wallets.iter().map(WalletSummary::from).collect(),
            total_users: doc.metadata.total_users,
            created: doc.metadata.created,
        })
    }

    pub async fn verify_session(&self, session_id: &str) -> Result<SessionDiagnostics> {
        let doc = self.store.load().await?;
        let session = doc
            .sessions
            .get(session_id)
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;
        let progress = &session.game_progress;

        Ok(SessionDiagnostics {
            session_id: session_id.to_string(),
            wallet_address: session.wallet_address.clone(),
            wallet_registered: doc
                .wallets
                .iter()
                .any(|w| same_address(&w.wallet_address, &session.wallet_address)),
            completed_stations: progress.completed_stations.len(),
            collected_cards: progress.collected_cards.len(),
            unique_cards: progress.unique_cards(),
            total_xp: progress.total_xp,
            tokens: progress.tokens,
            eligible_for_nft: progress.completed_stations.len() >= NFT_ELIGIBILITY_STATIONS,
            version: progress.version,
            last_updated: progress.last_updated.clone(),
        })
    }
}

/// Pick the session id for a login.
///
/// A hint naming another wallet's session is ignored so one player cannot
/// take over another's progress.
fn choose_session_id(doc: &LedgerDocument, address: &str, hint: Option<String>) -> String {
    if let Some(hint) = hint {
        match doc.sessions.get(&hint) {
            Some(existing) if !same_address(&existing.wallet_address, address) => {
                tracing::warn!(session_id = %hint, "Session hint belongs to another wallet");
            }
            _ => return hint,
        }
    }

    let mut candidate = Utc::now().timestamp_millis();
    while doc.sessions.contains_key(&candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

/// The session a wallet trades and exports from.
///
/// Uses the wallet's active-session pointer when it resolves to a session
/// owned by that wallet, otherwise the first session (by id) for the address.
fn resolve_session_id(doc: &LedgerDocument, address: &str) -> Option<String> {
    let active = doc
        .wallets
        .iter()
        .find(|w| same_address(&w.wallet_address, address))
        .and_then(|w| w.session_id.as_ref())
        .filter(|id| {
            doc.sessions
                .get(*id)
                .is_some_and(|s| same_address(&s.wallet_address, address))
        });
    if let Some(id) = active {
        return Some(id.clone());
    }

    doc.sessions
        .values()
        .find(|s| same_address(&s.wallet_address, address))
        .map(|s| s.session_id.clone())
}
