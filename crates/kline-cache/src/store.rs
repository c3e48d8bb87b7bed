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

//! Atomic Arrow IPC read/write with per-key serialization.

use crate::error::{CacheError, Result};
use crate::metadata::{CacheEntryMeta, CacheMetadataIndex};
use chrono::Utc;
use kline_models::{CacheKey, Table};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, warn};

pub struct Store {
    root: PathBuf,
    index: RwLock<CacheMetadataIndex>,
    key_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let index = CacheMetadataIndex::load(&root)?;
        Ok(Self { root, index: RwLock::new(index), key_locks: StdMutex::new(HashMap::new()) })
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn lock_for(&self, metadata_key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.key_locks.lock().expect("cache key-lock map poisoned");
        locks.entry(metadata_key.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Reads a Table back, re-validating structurally. Any failure — absent entry, missing file, corrupt
    /// IPC stream, schema mismatch, invariant violation — is reported as
    /// `Ok(None)`, never an error: a cache miss is not a fault.
    pub async fn load(&self, key: &CacheKey) -> Result<Option<Table>> {
        let metadata_key = key.metadata_key();
        let entry = {
            let index = self.index.read().await;
            index.get(&metadata_key).cloned()
        };
        let Some(entry) = entry else {
            return Ok(None);
        };

        let full_path = self.root.join(&entry.path);
        let lock = self.lock_for(&metadata_key);
        let _guard = lock.lock().await;

        match self.read_ipc(&full_path, key) {
            Ok(table) => Ok(Some(table)),
            Err(err) => {
                warn!(path = %full_path.display(), error = %err, "cache entry failed validation, treating as miss");
                let mut index = self.index.write().await;
                index.remove(&metadata_key);
                index.save(&self.root)?;
                Ok(None)
            }
        }
    }

    fn read_ipc(&self, path: &std::path::Path, key: &CacheKey) -> Result<Table> {
        let file = File::open(path)?;
        let df = IpcReader::new(file)
            .finish()
            .map_err(|e| CacheError::Corrupt { path: path.display().to_string(), reason: e.to_string() })?;
        Table::from_dataframe(&df, key.interval)
            .map_err(|e| CacheError::Corrupt { path: path.display().to_string(), reason: e.to_string() })
    }

    /// Writes `table` to its day-file via temp-file-then-rename, then
    /// updates and persists the metadata index.
    pub async fn store(&self, key: &CacheKey, table: &Table) -> Result<()> {
        let metadata_key = key.metadata_key();
        let relative_path = key.relative_path();
        let full_path = self.root.join(&relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock = self.lock_for(&metadata_key);
        let _guard = lock.lock().await;

        let mut df = table
            .to_dataframe()
            .map_err(|e| CacheError::Corrupt { path: full_path.display().to_string(), reason: e.to_string() })?;

        let temp_path = full_path.with_extension("arrow.tmp");
        {
            let file = File::create(&temp_path)?;
            IpcWriter::new(file)
                .finish(&mut df)
                .map_err(|e| CacheError::Corrupt { path: temp_path.display().to_string(), reason: e.to_string() })?;
        }
        std::fs::rename(&temp_path, &full_path)?;

        let size_bytes = std::fs::metadata(&full_path)?.len();
        let meta = CacheEntryMeta { path: relative_path, size_bytes, created_at: Utc::now(), row_count: table.len() };

        let mut index = self.index.write().await;
        index.upsert(metadata_key, meta);
        index.save(&self.root)?;
        debug!(key = %key, rows = table.len(), "stored cache entry");
        Ok(())
    }

    /// Removes the file and its metadata entry. Idempotent: invalidating
    /// an absent key is a no-op success.
    pub async fn invalidate(&self, key: &CacheKey) -> Result<()> {
        let metadata_key = key.metadata_key();
        let lock = self.lock_for(&metadata_key);
        let _guard = lock.lock().await;

        let mut index = self.index.write().await;
        if let Some(entry) = index.get(&metadata_key).cloned() {
            let full_path = self.root.join(&entry.path);
            if full_path.exists() {
                std::fs::remove_file(&full_path)?;
            }
        }
        index.remove(&metadata_key);
        index.save(&self.root)?;
        Ok(())
    }

    pub async fn metadata_entry_count(&self) -> usize {
        self.index.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use kline_core::types::{Interval, MarketType};
    use kline_models::Candle;

    fn sample_table() -> Table {
        let open_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candle = Candle::new(open_time, 1.0, 2.0, 0.5, 1.5, 10.0, 100.0, 5, 4.0, 40.0, Interval::Min1);
        Table::from_candles(vec![candle], Interval::Min1).unwrap()
    }

    fn sample_key() -> CacheKey {
        CacheKey::new(MarketType::Spot, "BTCUSDT", Interval::Min1, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let key = sample_key();
        let table = sample_table();

        store.store(&key, &table).await.unwrap();
        let loaded = store.load(&key).await.unwrap().unwrap();
        assert_eq!(loaded, table);
    }

    #[tokio::test]
    async fn load_of_absent_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        assert!(store.load(&sample_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_removes_file_and_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let key = sample_key();
        store.store(&key, &sample_table()).await.unwrap();
        assert_eq!(store.metadata_entry_count().await, 1);

        store.invalidate(&key).await.unwrap();
        assert_eq!(store.metadata_entry_count().await, 0);
        assert!(store.load(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let key = sample_key();
        store.invalidate(&key).await.unwrap();
        store.invalidate(&key).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_on_disk_reads_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let key = sample_key();
        store.store(&key, &sample_table()).await.unwrap();

        let full_path = store.root().join(key.relative_path());
        std::fs::write(&full_path, b"not an arrow file").unwrap();

        assert!(store.load(&key).await.unwrap().is_none());
        assert_eq!(store.metadata_entry_count().await, 0);
    }
}
