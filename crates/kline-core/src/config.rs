//! Orchestrator configuration: concurrency limits, retry counts, timeouts,
//! and the cache directory.
//!
//! Binance market-data endpoints are public and unauthenticated, so there
//! is no API key to load — `from_env` here is optional and additive rather
//! than the primary construction path: defaults are always valid on their
//! own.

use crate::error::{Error, InvalidInput, Result};

/// Knobs a caller may set on the Orchestrator. All fields have sensible
/// defaults so a caller can start from `OrchestratorConfig::default()`.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub cache_dir: std::path::PathBuf,
    pub use_cache: bool,
    pub max_concurrent: usize,
    pub max_concurrent_downloads: usize,
    pub retry_count: u32,
    pub api_timeout_seconds: u64,
    pub vision_data_delay_hours: i64,
    pub rest_chunk_size: u32,
    pub rest_max_chunks: u32,
    pub consolidation_delay_hours: i64,
    pub max_historical_days: i64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::path::PathBuf::from("./cache"),
            use_cache: true,
            max_concurrent: 50,
            max_concurrent_downloads: 13,
            retry_count: 5,
            api_timeout_seconds: 30,
            vision_data_delay_hours: 36,
            rest_chunk_size: 1000,
            rest_max_chunks: 10,
            consolidation_delay_hours: 48,
            max_historical_days: 1000,
        }
    }
}

impl OrchestratorConfig {
    /// Layers `KLINE_*` environment variables over the defaults. Every
    /// variable is optional; an unset variable keeps the default.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Ok(v) = std::env::var("KLINE_CACHE_DIR") {
            config.cache_dir = std::path::PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("KLINE_USE_CACHE") {
            config.use_cache = v.parse().unwrap_or(config.use_cache);
        }
        if let Ok(v) = std::env::var("KLINE_MAX_CONCURRENT") {
            config.max_concurrent = v.parse().unwrap_or(config.max_concurrent);
        }
        if let Ok(v) = std::env::var("KLINE_MAX_CONCURRENT_DOWNLOADS") {
            config.max_concurrent_downloads = v.parse().unwrap_or(config.max_concurrent_downloads);
        }
        if let Ok(v) = std::env::var("KLINE_RETRY_COUNT") {
            config.retry_count = v.parse().unwrap_or(config.retry_count);
        }
        if let Ok(v) = std::env::var("KLINE_API_TIMEOUT_SECONDS") {
            config.api_timeout_seconds = v.parse().unwrap_or(config.api_timeout_seconds);
        }
        if let Ok(v) = std::env::var("KLINE_VISION_DATA_DELAY_HOURS") {
            config.vision_data_delay_hours = v.parse().unwrap_or(config.vision_data_delay_hours);
        }
        if let Ok(v) = std::env::var("KLINE_REST_CHUNK_SIZE") {
            config.rest_chunk_size = v.parse().unwrap_or(config.rest_chunk_size);
        }
        if let Ok(v) = std::env::var("KLINE_REST_MAX_CHUNKS") {
            config.rest_max_chunks = v.parse().unwrap_or(config.rest_max_chunks);
        }
        if let Ok(v) = std::env::var("KLINE_CONSOLIDATION_DELAY_HOURS") {
            config.consolidation_delay_hours = v.parse().unwrap_or(config.consolidation_delay_hours);
        }
        if let Ok(v) = std::env::var("KLINE_MAX_HISTORICAL_DAYS") {
            config.max_historical_days = v.parse().unwrap_or(config.max_historical_days);
        }

        config
    }

    pub fn with_cache_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    pub fn with_max_concurrent_downloads(mut self, n: usize) -> Self {
        self.max_concurrent_downloads = n;
        self
    }

    pub fn with_retry_count(mut self, n: u32) -> Self {
        self.retry_count = n;
        self
    }

    /// Rejects configurations that would deadlock or silently do nothing.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::InvalidInput(InvalidInput::Configuration("max_concurrent must be > 0".into())));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(Error::InvalidInput(InvalidInput::Configuration(
                "max_concurrent_downloads must be > 0".into(),
            )));
        }
        if self.rest_chunk_size == 0 {
            return Err(Error::InvalidInput(InvalidInput::Configuration("rest_chunk_size must be > 0".into())));
        }
        Ok(())
    }
}
