// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod journey;
pub mod ledger;
pub mod quest;
pub mod route;

pub use journey::{JourneyProgress, JourneyTracker, StationDistance};
pub use ledger::Ledger;
pub use route::{RouteError, RouteService};
