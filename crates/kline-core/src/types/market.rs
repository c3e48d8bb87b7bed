//! Market type and the per-market capability table (hosts, limits, symbol
//! format) it resolves to.

use super::interval::Interval;
use serde::{Deserialize, Serialize};

/// The three markets this system retrieves klines for.
///
/// A fourth, generic `FUTURES` variant exists in the upstream system this
/// was distilled from, as a legacy alias that always resolved to the
/// USDT-margined capability table. It is intentionally not carried forward
/// here: it names no endpoint or limit that `FuturesUsdt` doesn't already
/// provide, and a fourth variant would make every match on `MarketType`
/// permanently non-exhaustive for no behavioral gain (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketType {
    Spot,
    FuturesUsdt,
    FuturesCoin,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Spot => "SPOT",
            MarketType::FuturesUsdt => "FUTURES_USDT",
            MarketType::FuturesCoin => "FUTURES_COIN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SPOT" => Some(MarketType::Spot),
            "FUTURES_USDT" => Some(MarketType::FuturesUsdt),
            "FUTURES_COIN" => Some(MarketType::FuturesCoin),
            _ => None,
        }
    }

    pub fn capabilities(&self) -> &'static MarketCapabilities {
        match self {
            MarketType::Spot => &SPOT_CAPABILITIES,
            MarketType::FuturesUsdt => &FUTURES_USDT_CAPABILITIES,
            MarketType::FuturesCoin => &FUTURES_COIN_CAPABILITIES,
        }
    }

    /// Archive URL path segment: `spot`, `futures/um`, `futures/cm`.
    pub fn vision_path_segment(&self) -> &'static str {
        match self {
            MarketType::Spot => "spot",
            MarketType::FuturesUsdt => "futures/um",
            MarketType::FuturesCoin => "futures/cm",
        }
    }

    /// REST API version path segment: `v3` for spot, `v1` for futures.
    pub fn api_version(&self) -> &'static str {
        self.capabilities().api_version
    }

    pub fn max_limit(&self) -> u32 {
        self.capabilities().max_limit
    }

    pub fn supports_interval(&self, interval: Interval) -> bool {
        if interval == Interval::Sec1 {
            return matches!(self, MarketType::Spot);
        }
        true
    }

    /// Normalizes a user-supplied symbol for this market: uppercases it
    /// and, for FUTURES_COIN, appends the `_PERP` suffix if missing.
    pub fn normalize_symbol(&self, symbol: &str) -> String {
        let upper = symbol.to_uppercase();
        match self {
            MarketType::FuturesCoin if !upper.ends_with("_PERP") => format!("{upper}_PERP"),
            _ => upper,
        }
    }
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Host list, API version, record limit, and symbol conventions for one
/// market (see DESIGN.md for the source of these constants).
#[derive(Debug, Clone)]
pub struct MarketCapabilities {
    pub primary_endpoint: &'static str,
    pub backup_endpoints: &'static [&'static str],
    pub data_only_endpoint: Option<&'static str>,
    pub api_version: &'static str,
    pub max_limit: u32,
}

static SPOT_CAPABILITIES: MarketCapabilities = MarketCapabilities {
    primary_endpoint: "https://api.binance.com",
    backup_endpoints: &[
        "https://api-gcp.binance.com",
        "https://api1.binance.com",
        "https://api2.binance.com",
        "https://api3.binance.com",
        "https://api4.binance.com",
    ],
    data_only_endpoint: Some("https://data-api.binance.vision"),
    api_version: "v3",
    max_limit: 1000,
};

static FUTURES_USDT_CAPABILITIES: MarketCapabilities = MarketCapabilities {
    primary_endpoint: "https://fapi.binance.com",
    backup_endpoints: &[
        "https://fapi-gcp.binance.com",
        "https://fapi1.binance.com",
        "https://fapi2.binance.com",
        "https://fapi3.binance.com",
    ],
    data_only_endpoint: None,
    api_version: "v1",
    max_limit: 1500,
};

static FUTURES_COIN_CAPABILITIES: MarketCapabilities = MarketCapabilities {
    primary_endpoint: "https://dapi.binance.com",
    backup_endpoints: &[
        "https://dapi-gcp.binance.com",
        "https://dapi1.binance.com",
        "https://dapi2.binance.com",
        "https://dapi3.binance.com",
    ],
    data_only_endpoint: None,
    api_version: "v1",
    max_limit: 1500,
};
