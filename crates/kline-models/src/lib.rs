//! # kline-models
//!
//! The columnar domain models every fetcher and the cache agree on:
//!
//! - [`Candle`] - one OHLCV row
//! - [`Table`] - an ordered, duplicate-free sequence of Candles, convertible
//!   to/from a Polars `DataFrame` for the Arrow IPC cache boundary
//! - [`CacheKey`] - the tuple identifying one day-file

pub mod candle;
pub mod cache_key;
pub mod table;

pub use candle::Candle;
pub use cache_key::CacheKey;
pub use table::Table;
