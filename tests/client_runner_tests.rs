// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client runtime: location fallbacks, refresh application, claims and the
//! offline queue, driven with in-process fakes.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;
use trainquest::client::{
    ClientError, FallbackLocationProvider, JourneyRunner, LocalProgressStore, PositionSource,
    ProgressSync, RefreshOutcome, TrackerSettings,
};
use trainquest::models::{LocationEstimate, LocationSource, StationStatus, UserProgress};
use trainquest::services::RouteService;

mod common;

// (lat, lng)
const BHOPAL: (f64, f64) = (23.2680, 77.4133);
const HYDERABAD: (f64, f64) = (17.3923, 78.4670);
const CHENNAI: (f64, f64) = (13.0827, 80.2707);

// ─── Fakes ───────────────────────────────────────────────────

struct FixedPosition {
    estimate: Option<LocationEstimate>,
    delay: Option<Duration>,
}

impl FixedPosition {
    fn at(lat: f64, lng: f64, source: LocationSource) -> Arc<Self> {
        Arc::new(Self {
            estimate: Some(LocationEstimate::new(lat, lng, 25.0, source)),
            delay: None,
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            estimate: None,
            delay: Some(Duration::from_secs(30)),
        })
    }
}

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<LocationEstimate, ClientError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut estimate = self
            .estimate
            .clone()
            .ok_or_else(|| ClientError::LocationUnavailable("no fix".to_string()))?;
        estimate.captured_at = Utc::now();
        Ok(estimate)
    }
}

/// A GPS receiver that parks each fix until the gate opens.
#[derive(Default)]
struct GatedPosition {
    calls: AtomicUsize,
    open: AtomicBool,
    gate: Notify,
    entered: Notify,
}

#[async_trait]
impl PositionSource for GatedPosition {
    async fn current_position(&self) -> Result<LocationEstimate, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if !self.open.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        Ok(LocationEstimate::new(BHOPAL.0, BHOPAL.1, 25.0, LocationSource::Gps))
    }
}

#[derive(Default)]
struct FakeSync {
    fail: AtomicBool,
    pushed: StdMutex<Vec<(String, UserProgress)>>,
    /// When set, each push waits for a permit after signalling `entered`
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
}

impl FakeSync {
    fn pushed(&self) -> Vec<(String, UserProgress)> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSync for FakeSync {
    async fn push_progress(
        &self,
        session_id: &str,
        progress: &UserProgress,
    ) -> Result<UserProgress, ClientError> {
        if let Some(gate) = &self.gate {
            self.entered.notify_one();
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::Server {
                status: 503,
                code: "unavailable".to_string(),
                details: None,
            });
        }
        self.pushed
            .lock()
            .unwrap()
            .push((session_id.to_string(), progress.clone()));
        Ok(progress.clone())
    }
}

struct Harness {
    route: Arc<RouteService>,
    store: Arc<LocalProgressStore>,
    settings: TrackerSettings,
    _dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            route: common::test_route(),
            store: Arc::new(LocalProgressStore::new(dir.path().join("client_state.json"))),
            settings: TrackerSettings {
                gps_timeout: Duration::from_millis(50),
                ip_lookup_timeout: Duration::from_millis(50),
                ..TrackerSettings::default()
            },
            _dir: dir,
        }
    }

    fn locator(&self) -> FallbackLocationProvider {
        FallbackLocationProvider::new(self.store.clone(), self.route.clone(), self.settings.clone())
    }

    async fn runner(&self, sync: Arc<FakeSync>) -> JourneyRunner {
        self.runner_with(self.locator(), sync).await
    }

    async fn runner_with(&self, locator: FallbackLocationProvider, sync: Arc<FakeSync>) -> JourneyRunner {
        JourneyRunner::resume("1700000000000", self.route.clone(), locator, self.store.clone(), sync).await
    }
}

fn applied(outcome: RefreshOutcome) -> trainquest::client::RefreshReport {
    match outcome {
        RefreshOutcome::Applied(report) => *report,
        other => panic!("expected an applied refresh, got {other:?}"),
    }
}

// ─── Location fallbacks ──────────────────────────────────────

#[tokio::test]
async fn test_gps_timeout_falls_back_to_ip_then_cache() {
    let h = Harness::new();
    let locator = h
        .locator()
        .with_gps(FixedPosition::hanging())
        .with_ip_lookup(FixedPosition::at(HYDERABAD.0, HYDERABAD.1, LocationSource::Ip));

    let first = locator.estimate().await;
    assert_eq!(first.source, LocationSource::Ip);
    assert_eq!(first.lat, HYDERABAD.0);

    // The IP result was remembered, so the next miss is served from cache.
    let second = locator.estimate().await;
    assert_eq!(second.source, LocationSource::Cached);
    assert_eq!(second.lat, HYDERABAD.0);
}

#[tokio::test]
async fn test_gps_fix_wins() {
    let h = Harness::new();
    let locator = h
        .locator()
        .with_gps(FixedPosition::at(BHOPAL.0, BHOPAL.1, LocationSource::Gps))
        .with_ip_lookup(FixedPosition::at(HYDERABAD.0, HYDERABAD.1, LocationSource::Ip));

    let estimate = locator.estimate().await;
    assert_eq!(estimate.source, LocationSource::Gps);
    assert_eq!(estimate.lng, BHOPAL.1);
}

#[tokio::test]
async fn test_offline_skips_ip_and_defaults_to_origin() {
    let h = Harness::new();
    h.store.set_offline_mode(true).await.unwrap();
    let locator = h
        .locator()
        .with_ip_lookup(FixedPosition::at(HYDERABAD.0, HYDERABAD.1, LocationSource::Ip));

    let estimate = locator.estimate().await;
    assert_eq!(estimate.source, LocationSource::Default);
    let origin = h.route.origin();
    assert_eq!((estimate.lat, estimate.lng), (origin.lat(), origin.lng()));
    assert!(estimate.note.unwrap().contains("Bengaluru"));
}

#[tokio::test]
async fn test_route_estimate_from_saved_progress() {
    let h = Harness::new();
    h.store
        .save_progress(&UserProgress {
            completed_stations: vec![1, 2],
            ..Default::default()
        })
        .await
        .unwrap();

    let estimate = h.locator().estimate().await;
    assert_eq!(estimate.source, LocationSource::RouteEstimate);
    assert_eq!(estimate.lat, h.route.station(3).unwrap().lat());

    // Past the end of the route the estimate stays at the last station.
    h.store
        .save_progress(&UserProgress {
            completed_stations: vec![1, 2, 3, 4, 5, 6],
            ..Default::default()
        })
        .await
        .unwrap();
    let estimate = h.locator().estimate().await;
    assert_eq!(estimate.source, LocationSource::RouteEstimate);
    assert_eq!(estimate.lat, h.route.station(6).unwrap().lat());
}

// ─── Refresh and claims ──────────────────────────────────────

#[tokio::test]
async fn test_refresh_completes_passed_stations_and_claim_pays_once() {
    let h = Harness::new();
    let sync = Arc::new(FakeSync::default());
    let runner = h.runner(sync.clone()).await;

    let report = applied(runner.set_manual_location(BHOPAL.0, BHOPAL.1).await);
    assert_eq!(report.estimate.source, LocationSource::Manual);
    assert_eq!(report.completed.as_ref().unwrap().completed, vec![1, 2, 3]);
    assert_eq!(report.newly_unlocked, vec![1, 2, 3, 4]);
    assert!(report.synced);

    let progress = runner.progress().await;
    assert_eq!(progress.total_xp, 300);
    assert_eq!(progress.tokens, 30);
    assert_eq!(progress.collected_cards.len(), 3);
    assert_eq!(sync.pushed().len(), 1);

    let outcome = runner.claim(4).await.unwrap().unwrap();
    assert_eq!(outcome.completed, vec![4]);
    assert_eq!(outcome.cards_granted, vec!["bhopal-lakes"]);
    assert_eq!(runner.status().await.unwrap(), "Quest complete at Bhopal Junction!");

    // Claiming again changes nothing.
    assert!(runner.claim(4).await.unwrap().is_none());
    assert_eq!(runner.progress().await.total_xp, 400);

    // A second refresh at the same spot has nothing left to complete.
    let report = applied(runner.set_manual_location(BHOPAL.0, BHOPAL.1).await);
    assert!(report.completed.is_none());
    assert_eq!(sync.pushed().len(), 2);

    assert_eq!(runner.station_status(4).await, Some(StationStatus::Completed));
    assert_eq!(runner.station_status(5).await, Some(StationStatus::Unlocked));
    assert_eq!(runner.station_status(6).await, Some(StationStatus::Locked));
    assert!(matches!(runner.claim(6).await, Err(ClientError::StationLocked(6))));
    assert!(matches!(runner.claim(42).await, Err(ClientError::UnknownStation(42))));
}

#[tokio::test]
async fn test_resume_restores_unlocks_from_saved_progress() {
    let h = Harness::new();
    let (saved, _) = trainquest::services::quest::apply_completions(
        &UserProgress::default(),
        &h.route,
        &[1, 2],
    )
    .unwrap();
    h.store.save_progress(&saved).await.unwrap();

    let runner = h.runner(Arc::new(FakeSync::default())).await;
    assert_eq!(runner.progress().await.total_xp, 200);
    assert_eq!(runner.station_status(3).await, Some(StationStatus::Unlocked));
    assert_eq!(runner.station_status(4).await, Some(StationStatus::Locked));
}

#[tokio::test]
async fn test_stale_estimate_discarded() {
    let h = Harness::new();
    let runner = h.runner(Arc::new(FakeSync::default())).await;

    applied(runner.set_manual_location(CHENNAI.0, CHENNAI.1).await);

    let mut old = LocationEstimate::new(BHOPAL.0, BHOPAL.1, 25.0, LocationSource::Gps);
    old.captured_at = Utc::now() - chrono::Duration::minutes(10);
    assert!(matches!(runner.refresh_with(old).await, RefreshOutcome::Stale));
    assert!(runner.progress().await.completed_stations.is_empty());
}

#[tokio::test]
async fn test_overlapping_refresh_is_skipped() {
    let h = Harness::new();
    let gate = Arc::new(Notify::new());
    let sync = Arc::new(FakeSync {
        gate: Some(gate.clone()),
        ..Default::default()
    });
    let runner = Arc::new(h.runner(sync.clone()).await);

    let first = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.set_manual_location(BHOPAL.0, BHOPAL.1).await })
    };

    // The first refresh is now parked inside its sync call.
    sync.entered.notified().await;
    assert!(matches!(
        runner.set_manual_location(HYDERABAD.0, HYDERABAD.1).await,
        RefreshOutcome::Skipped
    ));

    gate.notify_one();
    let report = applied(first.await.unwrap());
    assert_eq!(report.completed.unwrap().completed, vec![1, 2, 3]);
}

// ─── Offline queue ───────────────────────────────────────────

#[tokio::test]
async fn test_failed_sync_queues_and_flush_drains() {
    let h = Harness::new();
    let sync = Arc::new(FakeSync::default());
    sync.fail.store(true, Ordering::SeqCst);
    let runner = h.runner(sync.clone()).await;

    let report = applied(runner.set_manual_location(HYDERABAD.0, HYDERABAD.1).await);
    assert!(!report.synced);
    assert!(report.message.contains("will sync when back online"));
    assert!(h.store.is_offline_mode().await);
    assert_eq!(h.store.queued_actions().await.unwrap().len(), 1);

    // Progress survives locally even though the server never saw it.
    let local = h.store.load_progress().await.unwrap().unwrap();
    assert_eq!(local.completed_stations, vec![1]);

    // While offline, commits queue without attempting a push.
    sync.fail.store(false, Ordering::SeqCst);
    runner.claim(2).await.unwrap().unwrap();
    assert!(sync.pushed().is_empty());
    assert_eq!(h.store.queued_actions().await.unwrap().len(), 2);

    assert_eq!(runner.flush_queue().await.unwrap(), 2);
    assert!(h.store.queued_actions().await.unwrap().is_empty());
    assert!(!h.store.is_offline_mode().await);

    let pushed = sync.pushed();
    assert_eq!(pushed.len(), 2);
    assert_eq!(pushed[0].0, runner.session_id());
    assert_eq!(pushed[1].1.completed_stations, vec![1, 2]);
}

#[tokio::test]
async fn test_flush_stops_at_first_failure() {
    let h = Harness::new();
    let sync = Arc::new(FakeSync::default());
    sync.fail.store(true, Ordering::SeqCst);
    let runner = h.runner(sync.clone()).await;

    applied(runner.set_manual_location(HYDERABAD.0, HYDERABAD.1).await);
    runner.claim(2).await.unwrap();
    assert_eq!(h.store.queued_actions().await.unwrap().len(), 2);

    assert!(runner.flush_queue().await.is_err());
    assert_eq!(h.store.queued_actions().await.unwrap().len(), 2);
    assert!(h.store.is_offline_mode().await);
}

// ─── Refresh loop ────────────────────────────────────────────

/// Poll `check` until it holds, failing after a few seconds.
async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn test_refresh_loop_recovers_from_failed_sync() {
    let h = Harness::new();
    let sync = Arc::new(FakeSync::default());
    sync.fail.store(true, Ordering::SeqCst);
    let locator = h
        .locator()
        .with_gps(FixedPosition::at(BHOPAL.0, BHOPAL.1, LocationSource::Gps));
    let runner = Arc::new(h.runner_with(locator, sync.clone()).await);

    applied(runner.set_manual_location(HYDERABAD.0, HYDERABAD.1).await);
    assert!(h.store.is_offline_mode().await);
    assert_eq!(h.store.queued_actions().await.unwrap().len(), 1);

    // Server comes back.
    sync.fail.store(false, Ordering::SeqCst);
    let handle = runner.clone().spawn_refresh_loop(Duration::from_millis(50));

    eventually("progress to reach the server", || {
        let sync = sync.clone();
        async move {
            sync.pushed()
                .last()
                .is_some_and(|(_, p)| p.completed_stations == vec![1, 2, 3])
        }
    })
    .await;
    handle.abort();

    assert!(!h.store.is_offline_mode().await);
    assert!(h.store.queued_actions().await.unwrap().is_empty());
    let pushed = sync.pushed();
    // The queued snapshot goes first, then the refresh at Bhopal.
    assert_eq!(pushed[0].1.completed_stations, vec![1]);
    assert_eq!(runner.progress().await.total_xp, 300);
}

#[tokio::test]
async fn test_refresh_loop_skips_overlapping_refreshes() {
    let h = Harness::new();
    let gps = Arc::new(GatedPosition::default());
    let sync = Arc::new(FakeSync::default());
    let locator = h.locator().with_gps(gps.clone());
    let runner = Arc::new(h.runner_with(locator, sync.clone()).await);

    let handle = runner.clone().spawn_refresh_loop(Duration::from_millis(50));

    // The first tick is parked waiting for a GPS fix.
    gps.entered.notified().await;
    assert!(matches!(runner.refresh().await, RefreshOutcome::Skipped));
    assert!(matches!(
        runner.set_manual_location(HYDERABAD.0, HYDERABAD.1).await,
        RefreshOutcome::Skipped
    ));
    // A skipped refresh never asks for a position.
    assert_eq!(gps.calls.load(Ordering::SeqCst), 1);

    gps.open.store(true, Ordering::SeqCst);
    gps.gate.notify_one();

    eventually("the parked refresh to apply", || {
        let runner = runner.clone();
        async move { runner.progress().await.completed_stations == vec![1, 2, 3] }
    })
    .await;
    eventually("further ticks", || {
        let gps = gps.clone();
        async move { gps.calls.load(Ordering::SeqCst) >= 3 }
    })
    .await;
    handle.abort();

    // Later ticks find nothing new, so only the first refresh synced.
    assert_eq!(sync.pushed().len(), 1);
    assert_eq!(runner.status().await.unwrap(), "Perfect! You're at Bhopal Junction. Ready to start your quest!");
}
