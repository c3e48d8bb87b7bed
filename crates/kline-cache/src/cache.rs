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

//! The `Cache` trait every fetcher and the Orchestrator program against,
//! plus the one concrete on-disk implementation.

use crate::error::Result;
use crate::store::Store;
use async_trait::async_trait;
use kline_models::{CacheKey, Table};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters a caller can read back via `Cache::stats`:
/// `{hits, misses, errors}`.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub errors: AtomicU64,
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

/// Object-safe cache surface. `kline-engine` programs against this trait
/// so tests can substitute a `mockall`-generated double for the real
/// on-disk store.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn load(&self, key: &CacheKey) -> Result<Option<Table>>;
    async fn store(&self, key: &CacheKey, table: &Table) -> Result<()>;
    async fn invalidate(&self, key: &CacheKey) -> Result<()>;
    fn stats(&self) -> CacheStatsSnapshot;
}

/// Extension surface with convenience helpers layered on top of the
/// object-safe trait, the way `CacheRepositoryExt` layers typed
/// get/set over `CacheRepository`.
#[async_trait]
pub trait CacheExt: Cache {
    /// Validates an entry in place without returning its rows: reads it
    /// back and reports whether it passed structural validation.
    async fn validate_integrity(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.load(key).await?.is_some())
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}

/// The on-disk `Cache` implementation backing `Store`.
pub struct FileCache {
    store: Store,
    stats: CacheStats,
}

impl FileCache {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self { store: Store::new(root.as_ref())?, stats: CacheStats::default() })
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }
}

#[async_trait]
impl Cache for FileCache {
    async fn load(&self, key: &CacheKey) -> Result<Option<Table>> {
        match self.store.load(key).await {
            Ok(Some(table)) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(table))
            }
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(err) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    async fn store(&self, key: &CacheKey, table: &Table) -> Result<()> {
        let result = self.store.store(key, table).await;
        if result.is_err() {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<()> {
        let result = self.store.invalidate(key).await;
        if result.is_err() {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}
