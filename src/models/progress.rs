// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Player progress model shared by the client runtime and the ledger.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A player's progress through the route.
///
/// `completed_stations` only ever grows. `collected_cards` holds each card
/// at most once when written through the quest path; trades may move cards
/// between players.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    #[serde(default)]
    pub completed_stations: Vec<u32>,
    #[serde(default)]
    pub collected_cards: Vec<String>,
    #[serde(default)]
    pub collected_snacks: Vec<String>,
    #[serde(default, rename = "totalXP")]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_xp: u64,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub tokens: u64,
    /// Bumped on every ledger write to the owning session
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Fields the client stores that the server does not interpret
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub extra: Map<String, Value>,
}

impl UserProgress {
    pub fn has_completed(&self, station_id: u32) -> bool {
        self.completed_stations.contains(&station_id)
    }

    pub fn has_card(&self, card_id: &str) -> bool {
        self.collected_cards.iter().any(|c| c == card_id)
    }

    /// Highest station id the player has completed, if any.
    pub fn highest_completed(&self) -> Option<u32> {
        self.completed_stations.iter().copied().max()
    }

    /// Number of distinct cards held.
    pub fn unique_cards(&self) -> usize {
        let mut cards: Vec<&str> = self.collected_cards.iter().map(String::as_str).collect();
        cards.sort_unstable();
        cards.dedup();
        cards.len()
    }

    /// Apply a shallow field-wise overwrite. Arrays are replaced, not merged.
    pub fn apply_patch(&mut self, patch: ProgressPatch) {
        if let Some(stations) = patch.completed_stations {
            self.completed_stations = stations;
        }
        if let Some(cards) = patch.collected_cards {
            self.collected_cards = cards;
        }
        if let Some(snacks) = patch.collected_snacks {
            self.collected_snacks = snacks;
        }
        if let Some(xp) = patch.total_xp {
            self.total_xp = xp;
        }
        if let Some(tokens) = patch.tokens {
            self.tokens = tokens;
        }
        for (key, value) in patch.extra {
            // Server-owned fields are never taken from a client patch.
            if key == "version" || key == "lastUpdated" {
                continue;
            }
            self.extra.insert(key, value);
        }
    }
}

/// Partial progress update sent by a client.
///
/// Clients are expected to send full snapshots; any field present replaces
/// the stored one. `baseVersion`, when present, must match the stored
/// version or the update is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_stations: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_cards: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_snacks: Option<Vec<String>>,
    #[serde(default, rename = "totalXP", skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub total_xp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub base_version: Option<u64>,
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub extra: Map<String, Value>,
}

impl ProgressPatch {
    /// Build a full-snapshot patch from local progress.
    pub fn snapshot(progress: &UserProgress) -> Self {
        Self {
            completed_stations: Some(progress.completed_stations.clone()),
            collected_cards: Some(progress.collected_cards.clone()),
            collected_snacks: Some(progress.collected_snacks.clone()),
            total_xp: Some(progress.total_xp),
            tokens: Some(progress.tokens),
            base_version: None,
            extra: progress.extra.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_replaces_arrays() {
        let mut progress = UserProgress {
            collected_cards: vec!["a".into(), "b".into()],
            total_xp: 200,
            ..Default::default()
        };

        progress.apply_patch(ProgressPatch {
            collected_cards: Some(vec!["c".into()]),
            ..Default::default()
        });

        assert_eq!(progress.collected_cards, vec!["c".to_string()]);
        assert_eq!(progress.total_xp, 200, "absent fields are left untouched");
    }

    #[test]
    fn test_wire_names_match_client() {
        let json = serde_json::json!({
            "completedStations": [1, 2],
            "collectedCards": ["bengaluru-tech"],
            "totalXP": 200,
            "tokens": 20,
            "favoriteSnack": "chai"
        });
        let progress: UserProgress = serde_json::from_value(json).unwrap();

        assert_eq!(progress.completed_stations, vec![1, 2]);
        assert_eq!(progress.total_xp, 200);
        assert_eq!(progress.extra.get("favoriteSnack").unwrap(), "chai");

        let back = serde_json::to_value(&progress).unwrap();
        assert_eq!(back["totalXP"], 200);
        assert_eq!(back["favoriteSnack"], "chai");
    }

    #[test]
    fn test_unique_cards() {
        let progress = UserProgress {
            collected_cards: vec!["a".into(), "b".into(), "a".into()],
            ..Default::default()
        };
        assert_eq!(progress.unique_cards(), 2);
    }
}
