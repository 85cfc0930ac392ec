// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location estimates produced by the client's fallback chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Where a location estimate came from.
///
/// Variants are declared from least to most trusted, so `Ord` ranks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Default,
    RouteEstimate,
    Ip,
    Cached,
    Gps,
    /// Player-entered override
    Manual,
}

/// A single location estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LocationEstimate {
    pub lat: f64,
    pub lng: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
    pub source: LocationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the underlying position was observed
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub captured_at: DateTime<Utc>,
}

impl LocationEstimate {
    pub fn new(lat: f64, lng: f64, accuracy: f64, source: LocationSource) -> Self {
        Self {
            lat,
            lng,
            accuracy,
            source,
            note: None,
            captured_at: Utc::now(),
        }
    }

    /// Player-entered location override.
    pub fn manual(lat: f64, lng: f64) -> Self {
        Self::new(lat, lng, 0.0, LocationSource::Manual)
            .with_note("Manually selected location")
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn point(&self) -> geo::Point<f64> {
        geo::Point::new(self.lng, self.lat)
    }
}
