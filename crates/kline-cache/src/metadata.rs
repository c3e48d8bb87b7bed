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

//! `cache_metadata.json` index: CacheKey → `{path, sizeBytes, createdAt, rowCount}`.
//! Historical data is immutable, so entries carry no TTL —
//! ages are recorded for observability only.

use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const METADATA_FILE_NAME: &str = "cache_metadata.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntryMeta {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub row_count: usize,
}

/// The index itself, keyed by `CacheKey::metadata_key()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMetadataIndex {
    entries: HashMap<String, CacheEntryMeta>,
}

impl CacheMetadataIndex {
    /// Loads the index from `{root}/cache_metadata.json`. A missing file is
    /// an empty index, not an error — this is the state of a fresh cache root.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(METADATA_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        let index: Self = serde_json::from_str(&raw)?;
        Ok(index)
    }

    /// Persists the index atomically: write to a sibling temp file, then
    /// rename over the target.
    pub fn save(&self, root: &Path) -> Result<()> {
        std::fs::create_dir_all(root)?;
        let final_path = root.join(METADATA_FILE_NAME);
        let temp_path = root.join(format!("{METADATA_FILE_NAME}.tmp"));
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(&temp_path, serialized)?;
        std::fs::rename(&temp_path, &final_path)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntryMeta> {
        self.entries.get(key)
    }

    pub fn upsert(&mut self, key: String, meta: CacheEntryMeta) {
        self.entries.insert(key, meta);
    }

    /// Removes an entry; returns whether one was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops entries whose on-disk file no longer exists, reporting the
    /// stale keys removed. Used by `RepairCache`.
    pub fn prune_dangling(&mut self, root: &Path) -> Vec<String> {
        let mut stale = Vec::new();
        self.entries.retain(|key, meta| {
            let exists = root.join(&meta.path).exists();
            if !exists {
                stale.push(key.clone());
            }
            exists
        });
        stale
    }
}

impl TryFrom<&Path> for CacheMetadataIndex {
    type Error = CacheError;

    fn try_from(root: &Path) -> Result<Self> {
        Self::load(root)
    }
}
