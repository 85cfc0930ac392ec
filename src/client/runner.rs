// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Journey runner: applies location updates to one player's progress.
//!
//! Each refresh evaluates the tracker, applies auto-completions and unlocks
//! as a single progress update, saves it locally, then syncs it to the
//! ledger. Local state is always written first; a failed sync queues the
//! snapshot and switches to offline mode instead of failing the refresh.

use crate::client::{
    ClientError, FallbackLocationProvider, LocalProgressStore, ProgressSync, QueuedAction,
};
use crate::models::{LocationEstimate, StationStatus, UserProgress};
use crate::services::quest::{apply_completions, CompletionOutcome};
use crate::services::{JourneyProgress, JourneyTracker, RouteService};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// What happened to a refresh request.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// Another refresh was already running
    Skipped,
    /// The estimate was older than one already applied
    Stale,
    Applied(Box<RefreshReport>),
}

#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub estimate: LocationEstimate,
    pub journey: JourneyProgress,
    pub message: String,
    /// `None` when nothing new was completed
    pub completed: Option<CompletionOutcome>,
    pub newly_unlocked: Vec<u32>,
    /// False when the update was queued for later sync
    pub synced: bool,
}

#[derive(Debug, Default)]
struct PlayerState {
    progress: UserProgress,
    unlocked: BTreeSet<u32>,
    last_applied: Option<DateTime<Utc>>,
    status: Option<String>,
}

/// Drives the journey tracker for one player session.
pub struct JourneyRunner {
    session_id: String,
    route: Arc<RouteService>,
    locator: FallbackLocationProvider,
    store: Arc<LocalProgressStore>,
    sync: Arc<dyn ProgressSync>,
    state: Mutex<PlayerState>,
}

impl JourneyRunner {
    /// Resume a player from the local store (or start fresh).
    pub async fn resume(
        session_id: impl Into<String>,
        route: Arc<RouteService>,
        locator: FallbackLocationProvider,
        store: Arc<LocalProgressStore>,
        sync: Arc<dyn ProgressSync>,
    ) -> Self {
        let progress = match store.load_progress().await {
            Ok(progress) => progress.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not load saved progress, starting fresh");
                UserProgress::default()
            }
        };

        // Every completed station was unlocked, and so is the one after it.
        let unlocked = progress
            .completed_stations
            .iter()
            .flat_map(|&id| [id, id + 1])
            .filter(|&id| route.station(id).is_some())
            .collect();

        Self {
            session_id: session_id.into(),
            route,
            locator,
            store,
            sync,
            state: Mutex::new(PlayerState {
                progress,
                unlocked,
                ..Default::default()
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn progress(&self) -> UserProgress {
        self.state.lock().await.progress.clone()
    }

    /// Latest status message for the player, if any.
    pub async fn status(&self) -> Option<String> {
        self.state.lock().await.status.clone()
    }

    pub async fn station_status(&self, station_id: u32) -> Option<StationStatus> {
        let station = self.route.station(station_id)?;
        let state = self.state.lock().await;
        Some(StationStatus::derive(
            station,
            &state.progress.completed_stations,
            &state.unlocked,
        ))
    }

    /// Obtain a fresh estimate and apply it.
    ///
    /// The in-flight guard is taken before any location source is queried,
    /// so an overlapping refresh costs nothing.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Ok(mut state) = self.state.try_lock() else {
            tracing::debug!("Refresh already in progress, skipping");
            return RefreshOutcome::Skipped;
        };
        let estimate = self.locator.estimate().await;
        self.apply(&mut state, estimate).await
    }

    /// Player-entered location override.
    pub async fn set_manual_location(&self, lat: f64, lng: f64) -> RefreshOutcome {
        self.refresh_with(LocationEstimate::manual(lat, lng)).await
    }

    /// Apply one location estimate.
    pub async fn refresh_with(&self, estimate: LocationEstimate) -> RefreshOutcome {
        let Ok(mut state) = self.state.try_lock() else {
            tracing::debug!("Refresh already in progress, skipping");
            return RefreshOutcome::Skipped;
        };
        self.apply(&mut state, estimate).await
    }

    async fn apply(&self, state: &mut PlayerState, estimate: LocationEstimate) -> RefreshOutcome {
        if let Some(last) = state.last_applied {
            if estimate.captured_at < last {
                tracing::debug!(
                    source = ?estimate.source,
                    captured_at = %estimate.captured_at,
                    "Discarding stale location estimate"
                );
                return RefreshOutcome::Stale;
            }
        }

        let tracker = JourneyTracker::new(&self.route);
        let journey = tracker.evaluate(estimate.point(), &state.progress.completed_stations);
        let mut message = tracker.location_message(&journey);
        state.last_applied = Some(estimate.captured_at);

        let newly_unlocked: Vec<u32> = journey
            .stations_to_unlock
            .iter()
            .copied()
            .filter(|&id| state.unlocked.insert(id))
            .collect();
        if !newly_unlocked.is_empty() {
            tracing::info!(stations = ?newly_unlocked, "Stations unlocked");
        }

        let completion =
            apply_completions(&state.progress, &self.route, &journey.stations_to_complete);
        let mut synced = true;
        let completed = match completion {
            Some((updated, outcome)) => {
                match self.commit(state, updated).await {
                    Ok(()) => {}
                    Err(warning) => {
                        synced = false;
                        message = format!("{message} ({warning})");
                    }
                }
                Some(outcome)
            }
            None => None,
        };

        state.status = Some(message.clone());
        RefreshOutcome::Applied(Box::new(RefreshReport {
            estimate,
            journey,
            message,
            completed,
            newly_unlocked,
            synced,
        }))
    }

    /// Manually complete the quest at an unlocked station.
    ///
    /// Completing an already-completed station is a no-op (`Ok(None)`).
    pub async fn claim(&self, station_id: u32) -> Result<Option<CompletionOutcome>, ClientError> {
        let station = self
            .route
            .station(station_id)
            .ok_or(ClientError::UnknownStation(station_id))?;
        let mut state = self.state.lock().await;

        match StationStatus::derive(station, &state.progress.completed_stations, &state.unlocked) {
            StationStatus::Completed => return Ok(None),
            StationStatus::Locked => return Err(ClientError::StationLocked(station_id)),
            StationStatus::Unlocked => {}
        }

        let Some((updated, outcome)) = apply_completions(&state.progress, &self.route, &[station_id])
        else {
            return Ok(None);
        };

        state.unlocked.insert(station_id);
        if self.route.station(station_id + 1).is_some() {
            state.unlocked.insert(station_id + 1);
        }

        let status = match self.commit(&mut state, updated).await {
            Ok(()) => format!("Quest complete at {}!", station.name),
            Err(warning) => format!("Quest complete at {}! ({warning})", station.name),
        };
        state.status = Some(status);
        Ok(Some(outcome))
    }

    /// Save locally, then sync. Returns a warning when the sync was deferred.
    async fn commit(&self, state: &mut PlayerState, updated: UserProgress) -> Result<(), String> {
        state.progress = match self.store.save_progress(&updated).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save progress locally");
                updated
            }
        };

        if self.store.is_offline_mode().await {
            self.enqueue(&state.progress).await;
            return Err("offline, will sync later".to_string());
        }

        match self.sync.push_progress(&self.session_id, &state.progress).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    error = %e,
                    "Progress sync failed, queued for retry"
                );
                self.enqueue(&state.progress).await;
                if let Err(e) = self.store.set_offline_mode(true).await {
                    tracing::warn!(error = %e, "Failed to record offline mode");
                }
                Err("saved offline, will sync when back online".to_string())
            }
        }
    }

    async fn enqueue(&self, progress: &UserProgress) {
        let action = QueuedAction {
            session_id: self.session_id.clone(),
            snapshot: progress.clone(),
            queued_at: Utc::now(),
        };
        match self.store.queue_action(action).await {
            Ok(pending) => tracing::debug!(pending, "Progress queued for sync"),
            Err(e) => tracing::warn!(error = %e, "Failed to queue progress for sync"),
        }
    }

    /// Replay queued snapshots in order. Returns how many were sent.
    ///
    /// Stops at the first failure and keeps the rest queued. Holds the
    /// player state so no commit can queue behind the flush.
    pub async fn flush_queue(&self) -> Result<usize, ClientError> {
        let _state = self.state.lock().await;
        let queued = self.store.queued_actions().await?;
        let mut sent = 0;

        for action in &queued {
            if let Err(e) = self
                .sync
                .push_progress(&action.session_id, &action.snapshot)
                .await
            {
                tracing::warn!(error = %e, remaining = queued.len() - sent, "Queue flush interrupted");
                self.store.replace_queue(queued[sent..].to_vec()).await?;
                return Err(e);
            }
            sent += 1;
        }

        self.store.replace_queue(Vec::new()).await?;
        self.store.set_offline_mode(false).await?;
        if sent > 0 {
            tracing::info!(sent, "Offline progress synced");
        }
        Ok(sent)
    }

    /// Retry queued progress if a previous sync failed.
    pub async fn resync_if_offline(&self) {
        if !self.store.is_offline_mode().await {
            return;
        }
        match self.flush_queue().await {
            Ok(_) => tracing::info!(session_id = %self.session_id, "Back online"),
            Err(e) => tracing::debug!(error = %e, "Still offline"),
        }
    }

    /// Refresh every `period`, skipping ticks missed while a refresh ran long.
    ///
    /// Each tick first retries the offline queue, so a recovered server
    /// takes the runner back online.
    pub fn spawn_refresh_loop(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.resync_if_offline().await;
                if let RefreshOutcome::Applied(report) = self.refresh().await {
                    tracing::debug!(message = %report.message, "Journey refreshed");
                }
            }
        })
    }
}
