// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quest completion rewards.
//!
//! Automatic (location-driven) and manual (player claim) completion both go
//! through [`apply_completions`], so they produce the same progress update
//! and completing a station twice never pays out twice.

use crate::models::UserProgress;
use crate::services::RouteService;

/// XP granted per completed station.
pub const XP_PER_STATION: u64 = 100;
/// Tokens granted per completed station.
pub const TOKENS_PER_STATION: u64 = 10;

/// Stations newly completed by an update, with the cards they granted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOutcome {
    pub completed: Vec<u32>,
    pub cards_granted: Vec<String>,
}

/// Complete `station_ids` as a single progress update.
///
/// Ids already completed, or not on the route, are skipped. Returns the new
/// progress and what changed, or `None` if nothing did.
pub fn apply_completions(
    progress: &UserProgress,
    route: &RouteService,
    station_ids: &[u32],
) -> Option<(UserProgress, CompletionOutcome)> {
    let mut updated = progress.clone();
    let mut outcome = CompletionOutcome::default();

    for &id in station_ids {
        if updated.has_completed(id) {
            continue;
        }
        let Some(station) = route.station(id) else {
            tracing::warn!(station_id = id, "Ignoring completion for unknown station");
            continue;
        };

        updated.completed_stations.push(id);
        if !updated.has_card(&station.card_reward) {
            updated.collected_cards.push(station.card_reward.clone());
            outcome.cards_granted.push(station.card_reward.clone());
        }
        updated.total_xp += XP_PER_STATION;
        updated.tokens += TOKENS_PER_STATION;
        outcome.completed.push(id);
    }

    if outcome.completed.is_empty() {
        return None;
    }

    tracing::debug!(
        stations = ?outcome.completed,
        total_xp = updated.total_xp,
        "Stations completed"
    );
    Some((updated, outcome))
}
