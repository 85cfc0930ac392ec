// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Station catalog loading service.

use crate::models::{CardRarity, CollectibleCard, Quest, QuestType, RouteInfo, Station};
use geo::Point;
use geojson::{Feature, GeoJson, JsonObject};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Immutable station catalog for one route.
///
/// Stations are ordered by id and ids run `1..=n` with no gaps.
#[derive(Debug, Clone)]
pub struct RouteService {
    info: RouteInfo,
    stations: Vec<Station>,
    cards: Vec<CollectibleCard>,
}

impl RouteService {
    /// Load the route from a GeoJSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, RouteError> {
        let json_data =
            fs::read_to_string(path.as_ref()).map_err(|e| RouteError::IoError(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load the route from a GeoJSON string.
    pub fn load_from_json(json_data: &str) -> Result<Self, RouteError> {
        let geojson: GeoJson = json_data
            .parse()
            .map_err(|e: geojson::Error| RouteError::ParseError(e.to_string()))?;

        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(RouteError::ParseError(
                "expected a FeatureCollection".to_string(),
            ));
        };

        let info = collection
            .foreign_members
            .as_ref()
            .map(route_info)
            .unwrap_or_default();

        let mut stations = Vec::with_capacity(collection.features.len());
        let mut cards = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let (station, card) = Self::convert_feature(feature)?;
            stations.push(station);
            cards.push(card);
        }

        if stations.is_empty() {
            return Err(RouteError::EmptyRoute);
        }

        stations.sort_by_key(|s| s.id);
        for (index, station) in stations.iter().enumerate() {
            let expected = index as u32 + 1;
            if station.id != expected {
                return Err(RouteError::NonSequentialIds {
                    expected,
                    found: station.id,
                });
            }
        }

        tracing::info!(
            train = %info.train_number,
            count = stations.len(),
            "Loaded route stations"
        );
        Ok(Self {
            info,
            stations,
            cards,
        })
    }

    /// Convert one Point feature into a station and the card it grants.
    fn convert_feature(feature: Feature) -> Result<(Station, CollectibleCard), RouteError> {
        let geometry = feature
            .geometry
            .as_ref()
            .ok_or(RouteError::UnsupportedGeometry)?;
        let location: Point<f64> = geometry
            .value
            .clone()
            .try_into()
            .map_err(|_| RouteError::UnsupportedGeometry)?;

        let props = feature
            .properties
            .as_ref()
            .ok_or(RouteError::MissingProperty("properties"))?;

        let id: u32 = required(props, "id")?;
        let code: String = required(props, "code")?;
        let card_reward: String = required(props, "cardReward")?;

        let station = Station {
            id,
            code: code.clone(),
            name: required(props, "name")?,
            city: optional(props, "city").unwrap_or_default(),
            state: optional(props, "state").unwrap_or_default(),
            arrival_time: optional(props, "arrivalTime"),
            departure_time: optional(props, "departureTime"),
            platform: optional(props, "platform"),
            distance_from_source_km: optional(props, "distanceFromSource").unwrap_or(0.0),
            proximity_radius_m: required(props, "proximityRadius")?,
            quest: Quest {
                quest_type: required(props, "questType")?,
                title: optional(props, "questTitle").unwrap_or_default(),
                description: optional(props, "questDescription").unwrap_or_default(),
            },
            card_reward: card_reward.clone(),
            location,
        };

        let card = CollectibleCard {
            name: optional(props, "cardName").unwrap_or_else(|| card_reward.clone()),
            rarity: optional(props, "cardRarity").unwrap_or(CardRarity::Common),
            description: optional(props, "cardDescription").unwrap_or_default(),
            id: card_reward,
            station: code,
        };

        Ok((station, card))
    }

    pub fn info(&self) -> &RouteInfo {
        &self.info
    }

    /// Stations in route order.
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station(&self, id: u32) -> Option<&Station> {
        // Ids are 1..=n in order.
        id.checked_sub(1)
            .and_then(|index| self.stations.get(index as usize))
    }

    /// First station on the route.
    pub fn origin(&self) -> &Station {
        &self.stations[0]
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn cards(&self) -> &[CollectibleCard] {
        &self.cards
    }

    pub fn card(&self, card_id: &str) -> Option<&CollectibleCard> {
        self.cards.iter().find(|c| c.id == card_id)
    }
}

fn route_info(members: &JsonObject) -> RouteInfo {
    let text = |key: &str| {
        members
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    RouteInfo {
        train_number: text("trainNumber"),
        train_name: text("trainName"),
        source: text("source"),
        destination: text("destination"),
        total_distance: text("totalDistance"),
        total_duration: text("totalDuration"),
    }
}

fn optional<T: DeserializeOwned>(props: &JsonObject, key: &str) -> Option<T> {
    props
        .get(key)
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn required<T: DeserializeOwned>(props: &JsonObject, key: &'static str) -> Result<T, RouteError> {
    optional(props, key).ok_or(RouteError::MissingProperty(key))
}

/// Errors from route loading.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse GeoJSON: {0}")]
    ParseError(String),

    #[error("Unsupported geometry type (expected Point)")]
    UnsupportedGeometry,

    #[error("Station is missing or has an invalid '{0}' property")]
    MissingProperty(&'static str),

    #[error("Station ids must run 1..=n: expected {expected}, found {found}")]
    NonSequentialIds { expected: u32, found: u32 },

    #[error("Route has no stations")]
    EmptyRoute,
}
