// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod location;
pub mod progress;
pub mod session;
pub mod station;
pub mod wallet;

pub use location::{LocationEstimate, LocationSource};
pub use progress::{ProgressPatch, UserProgress};
pub use session::Session;
pub use station::{CardRarity, CollectibleCard, Quest, QuestType, RouteInfo, Station, StationStatus};
pub use wallet::{LoginMethod, Wallet, WalletSummary};
