//! Writing an asset's artifacts into the asset directory.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Component, Path};

use kiln_cache::fs::{ensure_mode, prune_empty_dirs, remove_file_if_exists, write_atomic};
use kiln_cache::{ArtifactRecord, IndexEntry, STATE_DIR};
use kiln_common::{AssetId, Fingerprint};
use tracing::{debug, warn};

use crate::asset::Artifact;
use crate::error::AssetError;

/// Checks that every artifact name is a unique relative path that stays
/// inside the asset directory and out of the state directory.
pub(crate) fn validate(asset: AssetId, artifacts: &[Artifact]) -> Result<(), AssetError> {
    let invalid = |name: &str, reason: &str| AssetError::InvalidArtifact {
        asset,
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let mut seen = HashSet::new();
    for artifact in artifacts {
        let name = artifact.name.as_str();
        if name.is_empty() {
            return Err(invalid(name, "name is empty"));
        }
        let path = Path::new(name);
        if !path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(invalid(name, "name must be a plain relative path"));
        }
        if path.components().next() == Some(Component::Normal(OsStr::new(STATE_DIR))) {
            return Err(invalid(name, "name is inside the reserved state directory"));
        }
        if !seen.insert(name) {
            return Err(invalid(name, "name is used twice"));
        }
    }
    Ok(())
}

/// Writes `artifacts` under `root` and returns the records to store in the
/// asset's cache entry.
///
/// Files whose contents are already correct are not rewritten, only given the
/// artifact's mode. Files recorded by the previous generation that are no
/// longer produced are removed.
pub(crate) fn write_artifacts(
    root: &Path,
    asset: AssetId,
    artifacts: &[Artifact],
    previous: Option<&IndexEntry>,
) -> Result<Vec<ArtifactRecord>, AssetError> {
    let persist_failed = |source| AssetError::PersistFailed { asset, source };

    let mut records = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = root.join(&artifact.name);
        let checksum = Fingerprint::from_bytes(&artifact.data);

        match std::fs::read(&path) {
            Ok(existing) if existing == artifact.data => {
                if ensure_mode(&path, artifact.mode).map_err(persist_failed)? {
                    debug!("Restored mode {:o} on {}", artifact.mode, path.display());
                } else {
                    debug!("{} is up to date", path.display());
                }
            }
            Ok(existing) => {
                let recorded = previous
                    .and_then(|e| e.artifacts.iter().find(|r| r.name == artifact.name))
                    .map(|r| r.checksum);
                if recorded != Some(Fingerprint::from_bytes(&existing)) {
                    warn!("Overwriting {}, which was not written by this tool", path.display());
                }
                write_atomic(&path, &artifact.data, artifact.mode).map_err(persist_failed)?;
            }
            Err(_) => {
                write_atomic(&path, &artifact.data, artifact.mode).map_err(persist_failed)?;
            }
        }

        records.push(ArtifactRecord {
            name: artifact.name.clone(),
            checksum,
            mode: artifact.mode,
        });
    }

    if let Some(previous) = previous {
        for old in &previous.artifacts {
            if records.iter().any(|r| r.name == old.name) {
                continue;
            }
            let path = root.join(&old.name);
            debug!("Removing {}, no longer produced by {asset}", path.display());
            remove_file_if_exists(&path).map_err(persist_failed)?;
            if let Some(parent) = path.parent() {
                prune_empty_dirs(parent, root).map_err(persist_failed)?;
            }
        }
    }

    Ok(records)
}
