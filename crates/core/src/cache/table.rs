use crate::types::ParsedDocument;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Bumped whenever the cached document layout changes
pub const FORMAT_VERSION: u32 = 1;

/// On-disk parse cache of one project:
/// `{"formatVersion": 1, "<relative path>": [mtimeMillis, document]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheTable {
    #[serde(rename = "formatVersion")]
    pub format_version: u32,
    #[serde(flatten)]
    pub entries: BTreeMap<String, CacheEntry>,
}

/// Modification time (ms) of the source when it was parsed, and the result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry(pub u64, pub ParsedDocument);

impl Default for CacheTable {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl CacheTable {
    /// Load a cache file.
    ///
    /// Never fails: a missing, unreadable, malformed or outdated file yields
    /// an empty table tagged with the current format version.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Cannot read cache {}: {}", path.display(), e);
                return Self::default();
            }
        };

        let value: Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Discarding malformed cache {}: {}", path.display(), e);
                return Self::default();
            }
        };

        let version = value.get("formatVersion").and_then(Value::as_u64);
        if version != Some(u64::from(FORMAT_VERSION)) {
            tracing::info!(
                "Discarding cache {} with format version {:?} (expected {})",
                path.display(),
                version,
                FORMAT_VERSION
            );
            return Self::default();
        }

        match serde_json::from_value(value) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!("Discarding undecodable cache {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Cached document for `key`, only if it was parsed at `mtime`
    pub fn get(&self, key: &str, mtime: u64) -> Option<&ParsedDocument> {
        self.entries
            .get(key)
            .filter(|entry| entry.0 == mtime)
            .map(|entry| &entry.1)
    }

    pub fn insert(&mut self, key: String, mtime: u64, document: ParsedDocument) {
        self.entries.insert(key, CacheEntry(mtime, document));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
