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

use thiserror::Error;

/// Orchestration-layer errors. Every lower-layer error folds in via
/// `#[from]`; the two new variants cover failures that only make sense
/// once fetchers are composed (batch fan-out, config validation at
/// Orchestrator construction time).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] kline_core::Error),

    #[error("cache error: {0}")]
    Cache(#[from] kline_cache::CacheError),

    #[error("batch processing error: {0}")]
    BatchProcessingError(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl From<EngineError> for kline_core::Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(inner) => inner,
            other => kline_core::Error::CacheError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
