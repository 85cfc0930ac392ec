// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Station catalog model.
//!
//! Stations are immutable once loaded. Whether a station is completed or
//! unlocked for a given player is derived from that player's progress with
//! [`StationStatus::derive`], never stored on the station itself.

use geo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A stop on the route with its quest and card reward.
#[derive(Debug, Clone)]
pub struct Station {
    /// Position along the route, starting at 1
    pub id: u32,
    /// Railway station code (e.g., "YPR")
    pub code: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub arrival_time: Option<String>,
    pub departure_time: Option<String>,
    pub platform: Option<String>,
    /// Distance from the origin station in kilometers
    pub distance_from_source_km: f64,
    /// Radius in meters within which a player counts as "at" the station
    pub proximity_radius_m: f64,
    pub quest: Quest,
    /// Identifier of the collectible card granted on completion
    pub card_reward: String,
    /// Station location (x = longitude, y = latitude)
    pub location: Point<f64>,
}

impl Station {
    pub fn lat(&self) -> f64 {
        self.location.y()
    }

    pub fn lng(&self) -> f64 {
        self.location.x()
    }

    /// The station that must be completed before this one can unlock.
    pub fn prerequisite(&self) -> Option<u32> {
        (self.id > 1).then(|| self.id - 1)
    }
}

/// Quest attached to a station.
#[derive(Debug, Clone)]
pub struct Quest {
    pub quest_type: QuestType,
    pub title: String,
    pub description: String,
}

/// Kind of quest shown at a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum QuestType {
    Intro,
    Trivia,
    Photo,
    ArScan,
    Social,
    FoodChallenge,
    Cultural,
    Nature,
    Completion,
}

impl QuestType {
    pub fn description(self) -> &'static str {
        match self {
            QuestType::Intro => "Journey begins here!",
            QuestType::Trivia => "Test your knowledge",
            QuestType::Photo => "Capture the moment",
            QuestType::ArScan => "Find hidden treasures",
            QuestType::Social => "Connect with others",
            QuestType::FoodChallenge => "Culinary adventure",
            QuestType::Cultural => "Cultural exploration",
            QuestType::Nature => "Nature discovery",
            QuestType::Completion => "Journey complete!",
        }
    }
}

/// Card rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum CardRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

/// Collectible card granted by a station.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CollectibleCard {
    /// Card identifier (e.g., "bengaluru-tech")
    pub id: String,
    pub name: String,
    pub rarity: CardRarity,
    pub description: String,
    /// Code of the station that grants this card
    pub station: String,
}

/// Route-level metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RouteInfo {
    pub train_number: String,
    pub train_name: String,
    pub source: String,
    pub destination: String,
    pub total_distance: String,
    pub total_duration: String,
}

/// Per-player status of a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum StationStatus {
    Completed,
    Unlocked,
    Locked,
}

impl StationStatus {
    /// Derive a station's status from one player's completed and unlocked sets.
    ///
    /// Station 1 is always at least unlocked.
    pub fn derive(station: &Station, completed: &[u32], unlocked: &BTreeSet<u32>) -> Self {
        if completed.contains(&station.id) {
            StationStatus::Completed
        } else if station.id == 1 || unlocked.contains(&station.id) {
            StationStatus::Unlocked
        } else {
            StationStatus::Locked
        }
    }
}
