//! Content-addressed export cache.
//!
//! Keys are identifier + content digest. An entry is current when the digest
//! matches and the recorded output file still exists, which lets repeated
//! export runs skip rewriting unchanged sub-assets.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use murmur3::{hash128, Digest128};
use serde::{Deserialize, Serialize};

use super::object::ObjectId;
use crate::util::Result;

/// File name of the cache inside the output directory.
pub const CACHE_FILE_NAME: &str = ".sceneweave-cache.json";

/// Content-based key: identifier plus digest of the emitted bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentKey {
    pub id: ObjectId,
    pub digest: Digest128,
}

impl ContentKey {
    /// Create a content key from emitted data.
    pub fn from_data(id: ObjectId, data: &[u8]) -> Self {
        Self {
            id,
            digest: hash128(data),
        }
    }

    pub fn digest_hex(&self) -> String {
        self.digest.to_hex()
    }
}

/// Cached record of one emitted file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub digest: String,
    /// Path relative to the output directory.
    pub file: String,
}

/// Persistent per-output-directory cache.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExportCache {
    entries: BTreeMap<ObjectId, CacheEntry>,
}

impl ExportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_in(output_dir: &Path) -> PathBuf {
        output_dir.join(CACHE_FILE_NAME)
    }

    /// Load the cache of `output_dir`. A missing or unreadable cache yields
    /// an empty one; a corrupt cache only costs a full re-export.
    pub fn load(output_dir: &Path) -> Self {
        let path = Self::path_in(output_dir);
        let Ok(json) = std::fs::read_to_string(&path) else {
            return Self::new();
        };
        match serde_json::from_str(&json) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!("ignoring corrupt export cache {}: {e}", path.display());
                Self::new()
            }
        }
    }

    /// Persist atomically into `output_dir`.
    pub fn save(&self, output_dir: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(output_dir)?;
        tmp.write_all(&json)?;
        tmp.persist(Self::path_in(output_dir))?;
        Ok(())
    }

    /// Whether `key` was already emitted to `file` and the file is present.
    pub fn is_current(&self, key: &ContentKey, file: &str, output_dir: &Path) -> bool {
        self.entries.get(&key.id).is_some_and(|e| {
            e.digest == key.digest_hex() && e.file == file && output_dir.join(file).is_file()
        })
    }

    pub fn record(&mut self, key: &ContentKey, file: &str) {
        self.entries.insert(
            key.id.clone(),
            CacheEntry {
                digest: key.digest_hex(),
                file: file.to_string(),
            },
        );
    }

    /// Drop entries for identifiers that were not exported this run.
    pub fn retain_ids(&mut self, live: &[ObjectId]) {
        self.entries.retain(|id, _| live.contains(id));
    }

    pub fn get(&self, id: &ObjectId) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
