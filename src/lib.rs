// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! TrainQuest: collect station cards along a train journey
//!
//! This crate provides the wallet/session ledger server, the journey
//! tracker that decides which stations a player has reached, and the
//! client runtime that drives the tracker from location updates.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{Ledger, RouteService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub ledger: Ledger,
    pub route: Arc<RouteService>,
}
