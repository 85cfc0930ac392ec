// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DATA_FILE: &str = "wallet_data.json";
pub const DEFAULT_ROUTE_FILE: &str = "data/duronto_route.geojson";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (binds 0.0.0.0)
    pub port: u16,
    /// Ledger JSON file; `.backup` and `.tmp` siblings live next to it
    pub data_file: PathBuf,
    /// Station catalog (GeoJSON)
    pub route_file: PathBuf,
    /// Allowed browser origin; any origin when unset
    pub frontend_url: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            route_file: PathBuf::from(DEFAULT_ROUTE_FILE),
            frontend_url: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = match env::var("PORT") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid PORT, using default");
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            data_file: path_var("DATA_FILE", DEFAULT_DATA_FILE)?,
            route_file: path_var("ROUTE_FILE", DEFAULT_ROUTE_FILE)?,
            frontend_url: env::var("FRONTEND_URL")
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

fn path_var(name: &'static str, default: &str) -> Result<PathBuf, ConfigError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::Empty(name)),
        Ok(value) => Ok(PathBuf::from(value.trim())),
        Err(env::VarError::NotPresent) => Ok(PathBuf::from(default)),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is set but empty")]
    Empty(&'static str),

    #[error("Environment variable {0} is not valid UTF-8")]
    NotUnicode(&'static str),
}
