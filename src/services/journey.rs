// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Journey tracking: classify stations as passed, current, or locked for a
//! player at a given location.
//!
//! Evaluation is a pure function of the immutable catalog, the player's
//! location and their completed stations. Applying the result (rewards,
//! persistence, unlocks) is the caller's job.

use crate::models::Station;
use crate::services::RouteService;
use geo::Point;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Mean Earth radius used for haversine distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points (x = lng, y = lat).
pub fn calculate_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    let phi1 = a.y().to_radians();
    let phi2 = b.y().to_radians();
    let d_phi = (b.y() - a.y()).to_radians();
    let d_lambda = (b.x() - a.x()).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Format a distance for display: meters under 1 km, otherwise km with one decimal.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round() as i64)
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}

/// A station paired with the player's distance to it.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct StationDistance {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub distance_from_user: f64,
    pub proximity_radius: f64,
    pub is_within_range: bool,
}

impl StationDistance {
    fn new(station: &Station, distance: f64) -> Self {
        Self {
            id: station.id,
            code: station.code.clone(),
            name: station.name.clone(),
            distance_from_user: distance,
            proximity_radius: station.proximity_radius_m,
            is_within_range: distance <= station.proximity_radius_m,
        }
    }
}

/// Result of evaluating a location against the route.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct JourneyProgress {
    pub nearest_station: StationDistance,
    /// Stations within their own proximity radius, closest first
    pub nearby_stations: Vec<StationDistance>,
    /// `None` once every station is completed and the player is not at one
    pub current_active_station: Option<StationDistance>,
    pub can_unlock_current: bool,
    pub stations_to_unlock: Vec<u32>,
    pub stations_to_complete: Vec<u32>,
    pub journey_progress_percent: f64,
    pub is_on_track: bool,
}

/// Evaluates player locations against a route.
pub struct JourneyTracker<'a> {
    route: &'a RouteService,
}

impl<'a> JourneyTracker<'a> {
    pub fn new(route: &'a RouteService) -> Self {
        Self { route }
    }

    /// Classify the route for a player at `user` with `completed` stations.
    pub fn evaluate(&self, user: Point<f64>, completed: &[u32]) -> JourneyProgress {
        let stations = self.route.stations();
        let distances: Vec<f64> = stations
            .iter()
            .map(|s| calculate_distance(user, s.location))
            .collect();

        // First minimum wins on ties.
        let mut nearest_index = 0;
        for (index, &distance) in distances.iter().enumerate() {
            if distance < distances[nearest_index] {
                nearest_index = index;
            }
        }
        let nearest = &stations[nearest_index];
        let nearest_distance = distances[nearest_index];

        // Everything before the nearest station has been passed.
        let stations_to_complete: Vec<u32> = stations
            .iter()
            .filter(|s| s.id < nearest.id && !completed.contains(&s.id))
            .map(|s| s.id)
            .collect();

        let (current, can_unlock_current) = if nearest_distance <= nearest.proximity_radius_m {
            (Some((nearest, nearest_distance)), true)
        } else {
            let next_id = completed.len() as u32 + 1;
            let current = self
                .route
                .station(next_id)
                .map(|s| (s, calculate_distance(user, s.location)));
            (current, false)
        };

        let mut stations_to_unlock = stations_to_complete.clone();
        if let Some((station, _)) = current {
            if self.may_unlock(station, user, completed, &stations_to_complete)
                && !stations_to_unlock.contains(&station.id)
            {
                stations_to_unlock.push(station.id);
            }
        }

        let mut nearby_stations: Vec<StationDistance> = stations
            .iter()
            .zip(&distances)
            .filter(|(s, d)| **d <= s.proximity_radius_m)
            .map(|(s, d)| StationDistance::new(s, *d))
            .collect();
        nearby_stations.sort_by(|a, b| a.distance_from_user.total_cmp(&b.distance_from_user));

        let total = stations.len();
        let journey_progress_percent = if total > 1 {
            ((nearest.id - 1) as f64 / (total - 1) as f64 * 100.0).min(100.0)
        } else {
            100.0
        };

        JourneyProgress {
            nearest_station: StationDistance::new(nearest, nearest_distance),
            nearby_stations,
            current_active_station: current.map(|(s, d)| StationDistance::new(s, d)),
            can_unlock_current,
            stations_to_unlock,
            stations_to_complete,
            journey_progress_percent,
            is_on_track: nearest_distance <= nearest.proximity_radius_m * 2.0,
        }
    }

    /// Unlock policy for the current active station.
    ///
    /// The predecessor check counts stations being auto-completed in the same
    /// update. The live distance is re-checked here even when the station was
    /// chosen because the player is near it.
    fn may_unlock(
        &self,
        station: &Station,
        user: Point<f64>,
        completed: &[u32],
        completing: &[u32],
    ) -> bool {
        let predecessor_done = match station.prerequisite() {
            None => true,
            Some(prev) => completed.contains(&prev) || completing.contains(&prev),
        };
        predecessor_done && calculate_distance(user, station.location) <= station.proximity_radius_m
    }

    /// Human-readable summary of where the player is on the route.
    pub fn location_message(&self, progress: &JourneyProgress) -> String {
        let nearest = &progress.nearest_station;
        let distance = format_distance(nearest.distance_from_user);
        let next_quest = progress
            .current_active_station
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or("journey complete");

        if !progress.stations_to_complete.is_empty() {
            return format!(
                "Journey progress detected! Auto-completing {} passed station(s). Current: {}",
                progress.stations_to_complete.len(),
                nearest.name
            );
        }

        if progress.can_unlock_current && nearest.is_within_range {
            if let Some(current) = &progress.current_active_station {
                return format!("Perfect! You're at {}. Ready to start your quest!", current.name);
            }
        }

        if nearest.distance_from_user <= nearest.proximity_radius * 2.0 {
            return format!("Near {} ({}). Get closer to unlock quest!", nearest.name, distance);
        }

        if progress.is_on_track {
            return format!(
                "On route! Nearest: {} ({}). Next quest: {}",
                nearest.name, distance, next_quest
            );
        }

        format!(
            "Nearest station: {} ({} away). Next quest: {}",
            nearest.name, distance, next_quest
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_known_value() {
        // Bengaluru Yeshwantpur to New Delhi, roughly 1,740 km great-circle.
        let ypr = Point::new(77.5641, 13.0287);
        let ndls = Point::new(77.2194, 28.6430);
        let d = calculate_distance(ypr, ndls);
        assert!((d - 1_737_000.0).abs() < 10_000.0, "got {d}");
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(0.0, 1.0);
        let expected = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        assert!((calculate_distance(a, b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0m");
        assert_eq!(format_distance(999.4), "999m");
        assert_eq!(format_distance(1000.0), "1.0km");
        assert_eq!(format_distance(12_345.0), "12.3km");
    }
}
