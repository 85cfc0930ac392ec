// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local progress store.
//!
//! A single JSON file of named slots standing in for browser local storage.
//! Writes go to a temp file that is renamed over the real one, so a crash
//! mid-write leaves the previous contents intact.

use crate::client::ClientError;
use crate::models::{LocationEstimate, LocationSource, UserProgress};
use crate::time_utils::now_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;

/// A progress snapshot waiting to be pushed to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAction {
    pub session_id: String,
    pub snapshot: UserProgress,
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Slots {
    #[serde(default)]
    user_progress: Option<UserProgress>,
    #[serde(default)]
    offline_actions: Vec<QueuedAction>,
    #[serde(default)]
    last_location: Option<LocationEstimate>,
    #[serde(default)]
    offline_mode: bool,
}

/// File-backed key/value store for one player's client state.
#[derive(Debug)]
pub struct LocalProgressStore {
    path: PathBuf,
    tmp_path: PathBuf,
    lock: Mutex<()>,
}

impl LocalProgressStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut tmp: OsString = path.as_os_str().to_owned();
        tmp.push(".tmp");
        Self {
            tmp_path: PathBuf::from(tmp),
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Slots, ClientError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Slots::default()),
            Err(source) => {
                return Err(ClientError::Storage {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        match serde_json::from_str(&raw) {
            Ok(slots) => Ok(slots),
            Err(e) => {
                // Local state is only a cache of the ledger.
                tracing::warn!(path = %self.path.display(), error = %e, "Discarding unreadable local state");
                Ok(Slots::default())
            }
        }
    }

    async fn write(&self, slots: &Slots) -> Result<(), ClientError> {
        let json = serde_json::to_string_pretty(slots)?;
        let storage_err = |source| ClientError::Storage {
            path: self.path.display().to_string(),
            source,
        };
        fs::write(&self.tmp_path, json).await.map_err(storage_err)?;
        fs::rename(&self.tmp_path, &self.path)
            .await
            .map_err(storage_err)
    }

    async fn update<T>(&self, f: impl FnOnce(&mut Slots) -> T) -> Result<T, ClientError> {
        let _guard = self.lock.lock().await;
        let mut slots = self.read().await?;
        let out = f(&mut slots);
        self.write(&slots).await?;
        Ok(out)
    }

    /// Save progress, stamping `lastUpdated`. Returns the stored copy.
    pub async fn save_progress(&self, progress: &UserProgress) -> Result<UserProgress, ClientError> {
        let mut stamped = progress.clone();
        stamped.last_updated = Some(now_rfc3339());
        let stored = stamped.clone();
        self.update(|slots| slots.user_progress = Some(stamped)).await?;
        Ok(stored)
    }

    pub async fn load_progress(&self) -> Result<Option<UserProgress>, ClientError> {
        Ok(self.read().await?.user_progress)
    }

    pub async fn save_last_location(&self, estimate: &LocationEstimate) -> Result<(), ClientError> {
        let estimate = estimate.clone();
        self.update(|slots| slots.last_location = Some(estimate)).await
    }

    /// The last saved location if it is younger than `max_age`, marked as cached.
    pub async fn last_known_location(
        &self,
        max_age: Duration,
    ) -> Result<Option<LocationEstimate>, ClientError> {
        let Some(saved) = self.read().await?.last_location else {
            return Ok(None);
        };
        let age = Utc::now().signed_duration_since(saved.captured_at);
        let fresh = age.to_std().map(|age| age <= max_age).unwrap_or(true);
        if !fresh {
            return Ok(None);
        }

        Ok(Some(LocationEstimate {
            source: LocationSource::Cached,
            note: Some("Using last known location".to_string()),
            ..saved
        }))
    }

    pub async fn queue_action(&self, action: QueuedAction) -> Result<usize, ClientError> {
        self.update(|slots| {
            slots.offline_actions.push(action);
            slots.offline_actions.len()
        })
        .await
    }

    pub async fn queued_actions(&self) -> Result<Vec<QueuedAction>, ClientError> {
        Ok(self.read().await?.offline_actions)
    }

    /// Replace the queue with `remaining` (empty to clear it).
    pub async fn replace_queue(&self, remaining: Vec<QueuedAction>) -> Result<(), ClientError> {
        self.update(|slots| slots.offline_actions = remaining).await
    }

    pub async fn set_offline_mode(&self, offline: bool) -> Result<(), ClientError> {
        self.update(|slots| slots.offline_mode = offline).await
    }

    pub async fn is_offline_mode(&self) -> bool {
        self.read().await.map(|s| s.offline_mode).unwrap_or(false)
    }
}
