// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location fallback chain.
//!
//! GPS → last known (≤ 1 hour) → IP lookup → route estimate → route origin.
//! The final step cannot fail, so [`FallbackLocationProvider::estimate`]
//! always returns something.

use crate::client::{ClientError, LocalProgressStore, TrackerSettings};
use crate::models::{LocationEstimate, LocationSource};
use crate::services::RouteService;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Accuracy assigned to IP geolocation results, in meters.
pub const IP_ACCURACY_M: f64 = 10_000.0;
pub const ROUTE_ESTIMATE_ACCURACY_M: f64 = 50_000.0;
pub const DEFAULT_ACCURACY_M: f64 = 100_000.0;

/// Anything that can report the player's position.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<LocationEstimate, ClientError>;
}

/// Coarse location from an ipapi-compatible lookup service.
pub struct IpGeolocator {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
}

impl IpGeolocator {
    pub fn new(settings: &TrackerSettings) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(settings.ip_lookup_timeout)
            .build()?;
        Ok(Self {
            http,
            url: settings.ip_lookup_url.clone(),
        })
    }
}

#[async_trait]
impl PositionSource for IpGeolocator {
    async fn current_position(&self) -> Result<LocationEstimate, ClientError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        let body: IpLookupResponse = response.json().await?;

        let (Some(lat), Some(lng)) = (body.latitude, body.longitude) else {
            return Err(ClientError::LocationUnavailable(
                "IP lookup returned no coordinates".to_string(),
            ));
        };

        let mut estimate = LocationEstimate::new(lat, lng, IP_ACCURACY_M, LocationSource::Ip);
        if let Some(city) = body.city {
            estimate = estimate.with_note(format!("Approximate location near {city}"));
        }
        Ok(estimate)
    }
}

/// Runs the fallback chain over the available sources.
pub struct FallbackLocationProvider {
    gps: Option<Arc<dyn PositionSource>>,
    ip: Option<Arc<dyn PositionSource>>,
    store: Arc<LocalProgressStore>,
    route: Arc<RouteService>,
    settings: TrackerSettings,
}

impl FallbackLocationProvider {
    pub fn new(
        store: Arc<LocalProgressStore>,
        route: Arc<RouteService>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            gps: None,
            ip: None,
            store,
            route,
            settings,
        }
    }

    pub fn with_gps(mut self, gps: Arc<dyn PositionSource>) -> Self {
        self.gps = Some(gps);
        self
    }

    pub fn with_ip_lookup(mut self, ip: Arc<dyn PositionSource>) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Best available location estimate.
    pub async fn estimate(&self) -> LocationEstimate {
        if let Some(gps) = &self.gps {
            match bounded(gps.as_ref(), self.settings.gps_timeout, "GPS").await {
                Ok(estimate) => return self.remember(estimate).await,
                Err(e) => tracing::warn!(error = %e, "GPS failed, trying fallbacks"),
            }
        }

        match self
            .store
            .last_known_location(self.settings.location_max_age)
            .await
        {
            Ok(Some(cached)) => return cached,
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Could not read last known location"),
        }

        if let Some(ip) = &self.ip {
            if self.store.is_offline_mode().await {
                tracing::debug!("Offline, skipping IP lookup");
            } else {
                match bounded(ip.as_ref(), self.settings.ip_lookup_timeout, "IP lookup").await {
                    Ok(estimate) => return self.remember(estimate).await,
                    Err(e) => tracing::warn!(error = %e, "IP location failed"),
                }
            }
        }

        if let Some(estimate) = self.route_estimate().await {
            return estimate;
        }

        let origin = self.route.origin();
        LocationEstimate::new(origin.lat(), origin.lng(), DEFAULT_ACCURACY_M, LocationSource::Default)
            .with_note(format!("Using default starting location ({})", origin.city))
    }

    /// Guess from progress: the station after the furthest one completed.
    async fn route_estimate(&self) -> Option<LocationEstimate> {
        let progress = match self.store.load_progress().await {
            Ok(progress) => progress?,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read saved progress");
                return None;
            }
        };
        let next_id = progress.highest_completed()? + 1;
        let station = self
            .route
            .station(next_id)
            .or_else(|| self.route.stations().last())?;

        Some(
            LocationEstimate::new(
                station.lat(),
                station.lng(),
                ROUTE_ESTIMATE_ACCURACY_M,
                LocationSource::RouteEstimate,
            )
            .with_note(format!(
                "Estimated location based on journey progress ({})",
                station.name
            )),
        )
    }

    async fn remember(&self, estimate: LocationEstimate) -> LocationEstimate {
        if let Err(e) = self.store.save_last_location(&estimate).await {
            tracing::warn!(error = %e, "Failed to save last known location");
        }
        estimate
    }
}

async fn bounded(
    source: &dyn PositionSource,
    limit: Duration,
    what: &'static str,
) -> Result<LocationEstimate, ClientError> {
    tokio::time::timeout(limit, source.current_position())
        .await
        .map_err(|_| ClientError::Timeout(what))?
}
