/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! # kline-core
//!
//! Foundational types, error taxonomy, configuration, and time-boundary
//! alignment shared by every other crate in this workspace:
//!
//! - [`types::MarketType`] / [`types::Interval`] / [`types::TimeRange`] - the shared domain vocabulary
//! - [`Error`] and [`Result`] - the unified error taxonomy
//! - [`config::OrchestratorConfig`] - orchestrator-wide tuning knobs
//! - [`alignment`] - pure boundary-rounding and record-count estimation
//!
//! ## Example
//!
//! ```
//! use kline_core::alignment;
//! use kline_core::types::Interval;
//! use chrono::{TimeZone, Utc};
//!
//! let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 30).unwrap();
//! let rounded = alignment::aligned_end(t, Interval::Min1);
//! assert_eq!(rounded, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
//! ```

pub mod alignment;
pub mod config;
pub mod error;
pub mod types;

pub use config::OrchestratorConfig;
pub use error::{Error, Result};
