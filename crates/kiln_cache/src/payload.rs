//! Validated storage for serialized asset state.
//!
//! Each asset's state is stored at `<state_dir>/state/<asset-id>.state` as a
//! length-prefixed bincode header followed by the payload. The header records
//! the owning asset, the fingerprint the state was generated under, and a
//! checksum of the payload, so a file that was truncated, swapped, or left
//! over from another fingerprint is rejected on read.

use std::path::{Path, PathBuf};

use kiln_common::Fingerprint;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::fs::{remove_file_if_exists, write_atomic};

/// Magic bytes identifying a kiln state payload.
const PAYLOAD_MAGIC: [u8; 4] = *b"KILN";

/// Current payload format version. Increment on breaking changes to the
/// header or payload encoding.
const PAYLOAD_FORMAT_VERSION: u32 = 1;

/// Subdirectory of the state directory holding payload files.
const PAYLOAD_SUBDIR: &str = "state";

/// File extension for payload files.
const PAYLOAD_EXT: &str = "state";

/// Header prepended to every payload for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadHeader {
    /// Magic bytes: must be `b"KILN"`.
    pub magic: [u8; 4],

    /// Payload format version.
    pub format_version: u32,

    /// Identity of the asset that owns this state.
    pub asset_id: String,

    /// Fingerprint the state was generated under.
    pub fingerprint: Fingerprint,

    /// Checksum of the payload bytes.
    pub checksum: Fingerprint,
}

/// Store for per-asset state payloads.
pub struct PayloadStore {
    /// Root state directory.
    state_dir: PathBuf,
}

impl PayloadStore {
    /// Creates a payload store rooted at the given state directory.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
        }
    }

    /// Returns the directory holding payload files.
    pub fn dir(&self) -> PathBuf {
        self.state_dir.join(PAYLOAD_SUBDIR)
    }

    /// Returns the file path holding the payload for `asset_id`.
    pub fn payload_path(&self, asset_id: &str) -> PathBuf {
        self.dir().join(format!("{asset_id}.{PAYLOAD_EXT}"))
    }

    /// Writes a payload and returns its checksum.
    pub fn write(
        &self,
        asset_id: &str,
        fingerprint: Fingerprint,
        data: &[u8],
    ) -> Result<Fingerprint, CacheError> {
        let checksum = Fingerprint::from_bytes(data);
        let header = PayloadHeader {
            magic: PAYLOAD_MAGIC,
            format_version: PAYLOAD_FORMAT_VERSION,
            asset_id: asset_id.to_string(),
            fingerprint,
            checksum,
        };

        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        // 4-byte header length (little-endian) + header + payload
        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + data.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(data);

        write_atomic(&self.payload_path(asset_id), &output, 0o600)?;
        Ok(checksum)
    }

    /// Reads the payload for `asset_id`, validating its header against the
    /// expected fingerprint.
    pub fn read(&self, asset_id: &str, fingerprint: Fingerprint) -> Result<Vec<u8>, CacheError> {
        let path = self.payload_path(asset_id);
        let raw = std::fs::read(&path).map_err(|e| CacheError::io(&path, e))?;

        let invalid = |reason: &str| CacheError::InvalidHeader {
            path: path.clone(),
            reason: reason.to_string(),
        };

        if raw.len() < 4 {
            return Err(invalid("file too short for header length"));
        }
        let header_len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
        if header_len > raw.len() - 4 {
            return Err(invalid("truncated header"));
        }

        let (header, _): (PayloadHeader, usize) =
            bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
                .map_err(|e| invalid(&e.to_string()))?;

        if header.magic != PAYLOAD_MAGIC {
            return Err(invalid("bad magic bytes"));
        }
        if header.format_version != PAYLOAD_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                path,
                expected: PAYLOAD_FORMAT_VERSION,
                actual: header.format_version,
            });
        }
        if header.asset_id != asset_id {
            return Err(CacheError::Inconsistent {
                path,
                reason: format!("payload belongs to asset '{}'", header.asset_id),
            });
        }
        if header.fingerprint != fingerprint {
            return Err(CacheError::Inconsistent {
                path,
                reason: format!("payload was generated under fingerprint {}", header.fingerprint),
            });
        }

        let payload = &raw[4 + header_len..];
        let actual = Fingerprint::from_bytes(payload);
        if actual != header.checksum {
            return Err(CacheError::ChecksumMismatch {
                path,
                expected: header.checksum.to_string(),
                actual: actual.to_string(),
            });
        }

        Ok(payload.to_vec())
    }

    /// Removes the payload for `asset_id`, if any.
    pub fn remove(&self, asset_id: &str) -> Result<bool, CacheError> {
        remove_file_if_exists(&self.payload_path(asset_id))
    }

    /// Removes payload files whose asset is not in `live_ids`.
    ///
    /// Returns the number of files removed.
    pub fn gc(&self, live_ids: &[&str]) -> Result<usize, CacheError> {
        let dir = self.dir();
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let entries = std::fs::read_dir(&dir).map_err(|e| CacheError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PAYLOAD_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !live_ids.contains(&stem) {
                    std::fs::remove_file(&path).map_err(|e| CacheError::io(&path, e))?;
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }
}
