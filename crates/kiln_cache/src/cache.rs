//! High-level state cache orchestrator.
//!
//! [`StateCache`] ties together the state index and the payload store for one
//! asset directory. It answers "is the cached state for this asset still valid
//! under this fingerprint?", records freshly generated state, and purges an
//! asset's persisted files.
//!
//! A single `StateCache` is assumed to own its directory for the duration of a
//! run; concurrent processes targeting the same directory need an external
//! lock.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use kiln_common::Fingerprint;
use tracing::debug;

use crate::error::CacheError;
use crate::fs::{file_mode, prune_empty_dirs, remove_file_if_exists};
use crate::index::{ArtifactRecord, IndexEntry, StateIndex, INDEX_FILE};
use crate::payload::PayloadStore;

/// Name of the reserved state directory inside an asset directory.
pub const STATE_DIR: &str = ".kiln";

/// Outcome of looking up an asset in the cache.
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup {
    /// Valid state exists for the requested fingerprint.
    Hit(Vec<u8>),
    /// State exists but was generated under a different fingerprint.
    Stale {
        /// The fingerprint the cached state was generated under.
        cached: Fingerprint,
    },
    /// Nothing is cached for this asset.
    Absent,
}

/// State cache for one asset directory.
pub struct StateCache {
    /// The asset directory artifacts are persisted into.
    root: PathBuf,

    /// `<root>/.kiln`.
    state_dir: PathBuf,

    /// Index of cached assets.
    index: StateIndex,

    /// Entries from an index written by another tool version. They never
    /// produce hits, but still own their files so purging and regeneration
    /// can clean up after them.
    retired: BTreeMap<String, IndexEntry>,

    /// Serialized state payloads.
    payloads: PayloadStore,
}

impl StateCache {
    /// Opens the cache for `root`, or starts a fresh one.
    ///
    /// An index that is missing, unreadable, or written by another tool version
    /// is replaced by an empty one; nothing is deleted until the next save.
    pub fn open(root: &Path, tool_version: &str) -> Self {
        let state_dir = root.join(STATE_DIR);
        let mut retired = BTreeMap::new();
        let index = match StateIndex::load(&state_dir) {
            Ok(Some(index)) if index.is_compatible(tool_version) => index,
            Ok(Some(index)) => {
                debug!(
                    "Discarding state written by {} (format {}), current is {}",
                    index.tool_version, index.format_version, tool_version
                );
                retired = index.entries;
                StateIndex::new(tool_version)
            }
            Ok(None) => StateIndex::new(tool_version),
            Err(e) => {
                debug!("Ignoring unreadable state index: {e}");
                StateIndex::new(tool_version)
            }
        };

        Self {
            root: root.to_path_buf(),
            payloads: PayloadStore::new(&state_dir),
            state_dir,
            index,
            retired,
        }
    }

    /// Returns the asset directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the reserved state directory.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Returns the index entry for `asset_id`, if any. Entries retired by a
    /// tool version change are included.
    pub fn entry(&self, asset_id: &str) -> Option<&IndexEntry> {
        self.index
            .entries
            .get(asset_id)
            .or_else(|| self.retired.get(asset_id))
    }

    /// Returns the identities of all cached or retired assets, sorted.
    pub fn asset_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .index
            .entries
            .keys()
            .chain(self.retired.keys())
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Looks up cached state for `asset_id` under `fingerprint`.
    ///
    /// A hit requires a matching index entry, a payload whose header and
    /// checksum validate, and every recorded file still present with its
    /// recorded contents and permissions. An error means an entry exists but cannot be
    /// trusted.
    pub fn lookup(&self, asset_id: &str, fingerprint: Fingerprint) -> Result<Lookup, CacheError> {
        let Some(entry) = self.index.entries.get(asset_id) else {
            return Ok(Lookup::Absent);
        };
        if entry.fingerprint != fingerprint {
            return Ok(Lookup::Stale {
                cached: entry.fingerprint,
            });
        }

        let payload = self.payloads.read(asset_id, fingerprint)?;
        let checksum = Fingerprint::from_bytes(&payload);
        if checksum != entry.state_checksum {
            return Err(CacheError::ChecksumMismatch {
                path: self.payloads.payload_path(asset_id),
                expected: entry.state_checksum.to_string(),
                actual: checksum.to_string(),
            });
        }

        for record in &entry.artifacts {
            self.verify_artifact(record)?;
        }

        Ok(Lookup::Hit(payload))
    }

    fn verify_artifact(&self, record: &ArtifactRecord) -> Result<(), CacheError> {
        let path = self.root.join(&record.name);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::MissingArtifact { path });
            }
            Err(e) => return Err(CacheError::io(path, e)),
        };
        if Fingerprint::from_bytes(&data) != record.checksum {
            return Err(CacheError::ModifiedArtifact { path });
        }
        match file_mode(&path)? {
            Some(actual) if actual != record.mode & 0o777 => Err(CacheError::ModeChanged {
                path,
                expected: record.mode,
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// Records freshly generated state for `asset_id` and saves the index.
    ///
    /// The payload is written before the index, so a crash in between leaves
    /// the old entry pointing at a payload whose header no longer matches it.
    pub fn record(
        &mut self,
        asset_id: &str,
        fingerprint: Fingerprint,
        payload: &[u8],
        artifacts: Vec<ArtifactRecord>,
    ) -> Result<(), CacheError> {
        let state_checksum = self.payloads.write(asset_id, fingerprint, payload)?;
        self.retired.remove(asset_id);
        self.index.entries.insert(
            asset_id.to_string(),
            IndexEntry {
                fingerprint,
                state_checksum,
                artifacts,
            },
        );
        self.index.save(&self.state_dir)
    }

    /// Deletes every file recorded for `asset_id`, its payload, and its index
    /// entry. Returns the paths of the files that were removed.
    ///
    /// Purging an asset with no entry is not an error.
    pub fn purge(&mut self, asset_id: &str) -> Result<Vec<PathBuf>, CacheError> {
        let Some(entry) = self.entry(asset_id).cloned() else {
            self.payloads.remove(asset_id)?;
            return Ok(Vec::new());
        };

        let mut removed = Vec::new();
        for record in &entry.artifacts {
            let path = self.root.join(&record.name);
            if remove_file_if_exists(&path)? {
                removed.push(path.clone());
            }
            if let Some(parent) = path.parent() {
                prune_empty_dirs(parent, &self.root)?;
            }
        }

        self.payloads.remove(asset_id)?;
        self.retired.remove(asset_id);
        self.index.entries.remove(asset_id);
        self.index.save(&self.state_dir)?;
        Ok(removed)
    }

    /// Removes payloads with no index entry. When the index is empty the
    /// whole state directory is removed.
    ///
    /// Returns the number of orphan payloads removed.
    pub fn gc(&self) -> Result<usize, CacheError> {
        let live: Vec<&str> = self
            .index
            .entries
            .keys()
            .chain(self.retired.keys())
            .map(String::as_str)
            .collect();
        let removed = self.payloads.gc(&live)?;

        if live.is_empty() && self.state_dir.exists() {
            remove_file_if_exists(&self.state_dir.join(INDEX_FILE))?;
            prune_empty_dirs(&self.payloads.dir(), &self.root)?;
            prune_empty_dirs(&self.state_dir, &self.root)?;
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::write_atomic;

    fn record(name: &str, data: &[u8]) -> ArtifactRecord {
        ArtifactRecord {
            name: name.to_string(),
            checksum: Fingerprint::from_bytes(data),
            mode: 0o644,
        }
    }

    #[test]
    fn fresh_cache_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StateCache::open(dir.path(), "0.1.0");
        assert!(cache.asset_ids().is_empty());
        assert_eq!(cache.state_dir(), dir.path().join(".kiln"));
    }

    #[test]
    fn lookup_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StateCache::open(dir.path(), "0.1.0");
        let fp = Fingerprint::from_bytes(b"fp");
        assert_eq!(cache.lookup("metadata", fp).unwrap(), Lookup::Absent);
    }

    #[test]
    fn record_then_hit_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::from_bytes(b"fp");
        {
            let mut cache = StateCache::open(dir.path(), "0.1.0");
            cache.record("cluster-id", fp, b"state", vec![]).unwrap();
        }
        let cache = StateCache::open(dir.path(), "0.1.0");
        assert_eq!(
            cache.lookup("cluster-id", fp).unwrap(),
            Lookup::Hit(b"state".to_vec())
        );
    }

    #[test]
    fn lookup_stale_on_fingerprint_change() {
        let dir = tempfile::tempdir().unwrap();
        let old = Fingerprint::from_bytes(b"old");
        let mut cache = StateCache::open(dir.path(), "0.1.0");
        cache.record("cluster-id", old, b"state", vec![]).unwrap();

        let new = Fingerprint::from_bytes(b"new");
        assert_eq!(
            cache.lookup("cluster-id", new).unwrap(),
            Lookup::Stale { cached: old }
        );
    }

    #[test]
    fn tool_version_change_discards_entries() {
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::from_bytes(b"fp");
        {
            let mut cache = StateCache::open(dir.path(), "0.1.0");
            cache.record("cluster-id", fp, b"state", vec![]).unwrap();
        }
        let cache = StateCache::open(dir.path(), "0.2.0");
        assert_eq!(cache.lookup("cluster-id", fp).unwrap(), Lookup::Absent);
    }

    #[test]
    fn retired_entries_can_still_be_purged() {
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::from_bytes(b"fp");
        std::fs::write(dir.path().join("metadata.json"), b"{}").unwrap();
        {
            let mut cache = StateCache::open(dir.path(), "0.1.0");
            cache
                .record("metadata", fp, b"state", vec![record("metadata.json", b"{}")])
                .unwrap();
        }

        let mut cache = StateCache::open(dir.path(), "0.2.0");
        assert_eq!(cache.asset_ids(), vec!["metadata".to_string()]);
        assert!(cache.entry("metadata").is_some());
        let removed = cache.purge("metadata").unwrap();
        assert_eq!(removed, vec![dir.path().join("metadata.json")]);
        assert!(cache.asset_ids().is_empty());
    }

    #[test]
    fn corrupt_index_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join(STATE_DIR);
        std::fs::create_dir_all(&state_dir).unwrap();
        std::fs::write(state_dir.join(INDEX_FILE), "{{{").unwrap();
        let cache = StateCache::open(dir.path(), "0.1.0");
        assert!(cache.asset_ids().is_empty());
    }

    #[test]
    fn modified_artifact_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::from_bytes(b"fp");
        write_atomic(&dir.path().join("metadata.json"), b"{}", 0o644).unwrap();
        let mut cache = StateCache::open(dir.path(), "0.1.0");
        cache
            .record("metadata", fp, b"state", vec![record("metadata.json", b"{}")])
            .unwrap();
        assert!(matches!(cache.lookup("metadata", fp), Ok(Lookup::Hit(_))));

        std::fs::write(dir.path().join("metadata.json"), b"{\"edited\":1}").unwrap();
        assert!(matches!(
            cache.lookup("metadata", fp),
            Err(CacheError::ModifiedArtifact { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn loosened_mode_is_error() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::from_bytes(b"fp");
        let path = dir.path().join("bootstrap.ign");
        write_atomic(&path, b"{}", 0o600).unwrap();
        let mut cache = StateCache::open(dir.path(), "0.1.0");
        let mut secret = record("bootstrap.ign", b"{}");
        secret.mode = 0o600;
        cache.record("bootstrap", fp, b"state", vec![secret]).unwrap();
        assert!(matches!(cache.lookup("bootstrap", fp), Ok(Lookup::Hit(_))));

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(matches!(
            cache.lookup("bootstrap", fp),
            Err(CacheError::ModeChanged {
                expected: 0o600,
                actual: 0o644,
                ..
            })
        ));
    }

    #[test]
    fn missing_artifact_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::from_bytes(b"fp");
        let mut cache = StateCache::open(dir.path(), "0.1.0");
        cache
            .record("metadata", fp, b"state", vec![record("metadata.json", b"{}")])
            .unwrap();
        assert!(matches!(
            cache.lookup("metadata", fp),
            Err(CacheError::MissingArtifact { .. })
        ));
    }

    #[test]
    fn deleted_payload_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::from_bytes(b"fp");
        let mut cache = StateCache::open(dir.path(), "0.1.0");
        cache.record("cluster-id", fp, b"state", vec![]).unwrap();
        std::fs::remove_file(
            dir.path()
                .join(STATE_DIR)
                .join("state")
                .join("cluster-id.state"),
        )
        .unwrap();
        assert!(cache.lookup("cluster-id", fp).is_err());
    }

    #[test]
    fn purge_removes_files_and_entry() {
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::from_bytes(b"fp");
        let manifests = dir.path().join("manifests");
        std::fs::create_dir_all(&manifests).unwrap();
        std::fs::write(manifests.join("a.yaml"), b"a").unwrap();

        let mut cache = StateCache::open(dir.path(), "0.1.0");
        cache
            .record("manifests", fp, b"state", vec![record("manifests/a.yaml", b"a")])
            .unwrap();

        let removed = cache.purge("manifests").unwrap();
        assert_eq!(removed, vec![manifests.join("a.yaml")]);
        assert!(!manifests.exists(), "empty parent directory is pruned");
        assert!(cache.entry("manifests").is_none());
        assert_eq!(cache.lookup("manifests", fp).unwrap(), Lookup::Absent);
    }

    #[test]
    fn purge_unknown_asset_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = StateCache::open(dir.path(), "0.1.0");
        assert!(cache.purge("nothing").unwrap().is_empty());
    }

    #[test]
    fn gc_removes_state_dir_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::from_bytes(b"fp");
        let mut cache = StateCache::open(dir.path(), "0.1.0");
        cache.record("cluster-id", fp, b"state", vec![]).unwrap();
        cache.purge("cluster-id").unwrap();

        cache.gc().unwrap();
        assert!(!dir.path().join(STATE_DIR).exists());
        assert!(dir.path().exists());
    }
}
