// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Game session model.

use crate::models::{LoginMethod, UserProgress};
use serde::{Deserialize, Deserializer, Serialize};

/// One player's run, linked to a wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Also the key in the session map; older files omit it
    #[serde(default)]
    pub session_id: String,
    /// Lowercased owner address
    pub wallet_address: String,
    pub login_method: LoginMethod,
    pub start_time: String,
    #[serde(default)]
    pub game_progress: UserProgress,
}

impl Session {
    pub fn new(session_id: String, wallet_address: String, login_method: LoginMethod) -> Self {
        Self {
            session_id,
            wallet_address,
            login_method,
            start_time: crate::time_utils::now_rfc3339(),
            game_progress: UserProgress::default(),
        }
    }

    /// Record a write to this session's progress.
    pub fn touch(&mut self) {
        self.game_progress.version += 1;
        self.game_progress.last_updated = Some(crate::time_utils::now_rfc3339());
    }
}

/// Session ids arrive as JSON strings or as numbers (millisecond timestamps).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSessionId {
    Text(String),
    Number(u64),
}

impl From<RawSessionId> for String {
    fn from(raw: RawSessionId) -> Self {
        match raw {
            RawSessionId::Text(s) => s,
            RawSessionId::Number(n) => n.to_string(),
        }
    }
}

/// Deserialize an optional session id given as string or number.
pub fn deserialize_opt_session_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawSessionId> = Option::deserialize(deserializer)?;
    Ok(raw.map(String::from).filter(|s| !s.trim().is_empty()))
}
