//! The tuple that uniquely identifies one day-file.

use chrono::NaiveDate;
use kline_core::types::{Interval, MarketType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub provider: String,
    pub market: MarketType,
    pub chart_type: String,
    pub symbol: String,
    pub interval: Interval,
    pub day: NaiveDate,
}

impl CacheKey {
    pub fn new(market: MarketType, symbol: impl Into<String>, interval: Interval, day: NaiveDate) -> Self {
        Self { provider: "BINANCE".to_string(), market, chart_type: "KLINES".to_string(), symbol: symbol.into(), interval, day }
    }

    /// Relative path under the cache root: `{provider}/{chartType}/{symbol}/{interval}/{YYYY-MM-DD}.arrow`.
    pub fn relative_path(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.provider)
            .join(&self.chart_type)
            .join(&self.symbol)
            .join(self.interval.as_str())
            .join(format!("{}.arrow", self.day.format("%Y-%m-%d")))
    }

    /// Deterministic string key used in `cache_metadata.json`.
    pub fn metadata_key(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}",
            self.provider,
            self.chart_type,
            self.symbol,
            self.market.as_str(),
            self.interval.as_str(),
            self.day.format("%Y-%m-%d")
        )
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.metadata_key())
    }
}
