// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Player-side journey runtime.
//!
//! Everything the browser client does between "where am I" and "tell the
//! server": the location fallback chain, local persistence that survives
//! reloads, progress sync with an offline queue, and the refresh loop that
//! drives the journey tracker.

pub mod location;
pub mod runner;
pub mod store;
pub mod sync;

pub use location::{FallbackLocationProvider, IpGeolocator, PositionSource};
pub use runner::{JourneyRunner, RefreshOutcome, RefreshReport};
pub use store::{LocalProgressStore, QueuedAction};
pub use sync::{LedgerClient, ProgressSync};

use std::time::Duration;

/// Client-side tunables.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// How often the journey is re-evaluated while location is available
    pub refresh_interval: Duration,
    pub gps_timeout: Duration,
    pub ip_lookup_timeout: Duration,
    /// Oldest last-known location still usable as a fallback
    pub location_max_age: Duration,
    /// ipapi-compatible JSON endpoint
    pub ip_lookup_url: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
            gps_timeout: Duration::from_secs(5),
            ip_lookup_timeout: Duration::from_secs(3),
            location_max_age: Duration::from_secs(60 * 60),
            ip_lookup_url: "https://ipapi.co/json/".to_string(),
        }
    }
}

/// Errors inside the client runtime.
///
/// The runner turns these into status messages; none of them reach the view
/// as a failure except an explicit claim on a locked station.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to access {path}: {source}")]
    Storage {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to encode local state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server rejected request ({status}): {code}")]
    Server {
        status: u16,
        code: String,
        details: Option<String>,
    },

    #[error("Station {0} is not on the route")]
    UnknownStation(u32),

    #[error("Station {0} is locked")]
    StationLocked(u32),
}
