// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wallet model for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const ADDRESS_HEX_LEN: usize = 40;

/// How the player connected their wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    Metamask,
    Manual,
}

impl LoginMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            LoginMethod::Metamask => "metamask",
            LoginMethod::Manual => "manual",
        }
    }
}

impl FromStr for LoginMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metamask" => Ok(LoginMethod::Metamask),
            "manual" => Ok(LoginMethod::Manual),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that `address` is `0x` followed by exactly 40 hex digits.
///
/// Only the format is checked; no checksum or signature verification.
pub fn is_valid_wallet_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex) => hex.len() == ADDRESS_HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// Canonical (lowercase) form of an address, used for storage and comparison.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Case-insensitive address comparison.
pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Registered wallet stored in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// Lowercased address (natural key)
    pub wallet_address: String,
    pub login_method: LoginMethod,
    /// First registration time (ISO 8601)
    #[serde(alias = "timestamp")]
    pub registered_at: String,
    /// Last login time (ISO 8601)
    pub last_active: String,
    /// Session created by the most recent login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Wallet as exposed by the admin listing (no IP or user agent).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub wallet_address: String,
    pub login_method: LoginMethod,
    pub registered_at: String,
    pub session_id: Option<String>,
    pub last_active: String,
}

impl From<&Wallet> for WalletSummary {
    fn from(wallet: &Wallet) -> Self {
        Self {
            wallet_address: wallet.wallet_address.clone(),
            login_method: wallet.login_method,
            registered_at: wallet.registered_at.clone(),
            session_id: wallet.session_id.clone(),
            last_active: wallet.last_active.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_format() {
        assert!(is_valid_wallet_address(
            "0xAbCdEf0123456789abcdef0123456789ABCDEF01"
        ));
        assert!(!is_valid_wallet_address("not-an-address"));
        assert!(!is_valid_wallet_address(
            "AbCdEf0123456789abcdef0123456789ABCDEF0123"
        ));
        // 39 hex digits
        assert!(!is_valid_wallet_address(
            "0xAbCdEf0123456789abcdef0123456789ABCDEF0"
        ));
        // non-hex character
        assert!(!is_valid_wallet_address(
            "0xGbCdEf0123456789abcdef0123456789ABCDEF01"
        ));
        // uppercase prefix is not accepted
        assert!(!is_valid_wallet_address(
            "0XAbCdEf0123456789abcdef0123456789ABCDEF01"
        ));
    }

    #[test]
    fn test_login_method_parse() {
        assert_eq!("metamask".parse(), Ok(LoginMethod::Metamask));
        assert_eq!("manual".parse(), Ok(LoginMethod::Manual));
        assert!("ledger".parse::<LoginMethod>().is_err());
        assert!("MetaMask".parse::<LoginMethod>().is_err());
    }

    #[test]
    fn test_wallet_reads_legacy_timestamp_field() {
        let json = serde_json::json!({
            "walletAddress": "0xabc",
            "loginMethod": "manual",
            "timestamp": "2025-01-01T00:00:00Z",
            "sessionId": "1735689600000",
            "ipAddress": "10.0.0.1",
            "userAgent": "Mozilla",
            "lastActive": "2025-01-01T00:00:00Z"
        });
        let wallet: Wallet = serde_json::from_value(json).unwrap();
        assert_eq!(wallet.registered_at, "2025-01-01T00:00:00Z");
        assert_eq!(wallet.session_id.as_deref(), Some("1735689600000"));
    }
}
