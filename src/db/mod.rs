// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable record store (single JSON document with a backup sibling).

pub mod json_file;

pub use json_file::JsonFileStore;

use crate::models::{Session, Wallet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The whole persisted ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerDocument {
    #[serde(default)]
    pub wallets: Vec<Wallet>,
    /// Sessions keyed by session id
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Document-level bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default = "crate::time_utils::now_rfc3339")]
    pub created: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            total_users: 0,
            created: crate::time_utils::now_rfc3339(),
        }
    }
}

impl Default for LedgerDocument {
    fn default() -> Self {
        Self {
            wallets: Vec::new(),
            sessions: BTreeMap::new(),
            metadata: Metadata::default(),
        }
    }
}

impl LedgerDocument {
    /// Fill session ids from map keys for files written without them.
    pub(crate) fn normalize(&mut self) {
        for (id, session) in self.sessions.iter_mut() {
            if session.session_id.is_empty() {
                session.session_id = id.clone();
            }
        }
    }
}

/// Errors from the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Failed to encode ledger: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}
