//! State index tracking every cached asset.
//!
//! The index is stored as `index.json` in the state directory. It records, per
//! asset identity, the fingerprint the state was generated under, the checksum
//! of the state payload, and the files the asset persisted. It is rewritten
//! atomically after every asset that is generated or purged.

use std::collections::BTreeMap;
use std::path::Path;

use kiln_common::Fingerprint;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::fs::write_atomic;

/// Name of the index file within the state directory.
pub const INDEX_FILE: &str = "index.json";

/// Current index format version. Increment on breaking changes to the layout.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Top-level state index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateIndex {
    /// Layout version of this file.
    pub format_version: u32,

    /// Version of the producer suite that wrote the entries. Entries written
    /// by another version are discarded wholesale.
    pub tool_version: String,

    /// Per-asset entries keyed by asset identity.
    pub entries: BTreeMap<String, IndexEntry>,
}

/// Cached state for a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Input fingerprint the state was generated under.
    pub fingerprint: Fingerprint,

    /// Checksum of the serialized state payload.
    pub state_checksum: Fingerprint,

    /// Files persisted for this asset, relative to the asset directory.
    #[serde(default)]
    pub artifacts: Vec<ArtifactRecord>,
}

/// A file persisted by an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Path relative to the asset directory.
    pub name: String,

    /// Checksum of the file contents as written.
    pub checksum: Fingerprint,

    /// Permission bits the file was written with.
    pub mode: u32,
}

impl StateIndex {
    /// Creates a new, empty index for the given tool version.
    pub fn new(tool_version: &str) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            tool_version: tool_version.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Loads the index from the state directory.
    ///
    /// Returns `Ok(None)` if no index exists yet and an error if one exists
    /// but cannot be read or parsed.
    pub fn load(state_dir: &Path) -> Result<Option<Self>, CacheError> {
        let path = state_dir.join(INDEX_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CacheError::IndexParse {
                reason: e.to_string(),
            })
    }

    /// Saves the index to the state directory, creating it if needed.
    pub fn save(&self, state_dir: &Path) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        write_atomic(&state_dir.join(INDEX_FILE), json.as_bytes(), 0o644)
    }

    /// Returns `true` if this index was written by a compatible layout and
    /// tool version.
    pub fn is_compatible(&self, tool_version: &str) -> bool {
        self.format_version == INDEX_FORMAT_VERSION && self.tool_version == tool_version
    }
}
