//! Error types for asset resolution.

use kiln_cache::CacheError;
use kiln_common::AssetId;

/// Error type returned by an asset's generation step.
///
/// Producers are free to fail with any error type; the store wraps it in
/// [`AssetError::GenerationFailed`] together with the asset's identity.
pub type GenerateError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resolving, persisting, or purging assets.
///
/// When resolution fails below the requested asset, the error is wrapped in
/// one [`AssetError::Dependency`] per asset on the path, so the rendered
/// message reads from the requested asset down to the one that failed.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The dependency graph contains a cycle. `path` starts and ends at the
    /// same asset.
    #[error("dependency cycle detected: {}", render_path(path))]
    CycleDetected {
        /// The assets on the cycle, in dependency order.
        path: Vec<AssetId>,
    },

    /// An asset asked its parents for an asset it did not declare.
    #[error("asset \"{asset}\" requested undeclared dependency \"{requested}\"")]
    MissingDependency {
        /// The asset being generated.
        asset: AssetId,
        /// The identity it asked for.
        requested: AssetId,
    },

    /// The asset's own generation step failed.
    #[error("failed to generate asset \"{asset}\": {source}")]
    GenerationFailed {
        /// The asset that failed.
        asset: AssetId,
        /// The producer's error.
        source: GenerateError,
    },

    /// Cached state exists but could not be used. Resolution recovers from
    /// this by regenerating; it is only ever logged.
    #[error("failed to load cached state for asset \"{asset}\": {source}")]
    CacheLoadFailed {
        /// The asset whose cached state was rejected.
        asset: AssetId,
        /// Why the state was rejected.
        source: CacheError,
    },

    /// Writing an artifact or the asset's cache entry failed.
    #[error("failed to persist asset \"{asset}\": {source}")]
    PersistFailed {
        /// The asset being persisted.
        asset: AssetId,
        /// The underlying filesystem or serialization error.
        source: CacheError,
    },

    /// Deleting an asset's files or cache entry failed.
    #[error("failed to purge asset \"{asset}\": {source}")]
    PurgeFailed {
        /// The asset being purged.
        asset: String,
        /// The underlying filesystem error.
        source: CacheError,
    },

    /// An asset produced an artifact that cannot be written.
    #[error("asset \"{asset}\" produced invalid artifact \"{name}\": {reason}")]
    InvalidArtifact {
        /// The asset that produced the artifact.
        asset: AssetId,
        /// The artifact's name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No asset with this identity is registered.
    #[error("asset \"{id}\" is not registered")]
    UnregisteredAsset {
        /// The unknown identity.
        id: AssetId,
    },

    /// Two asset types were registered under the same identity.
    #[error("asset \"{id}\" is already registered")]
    DuplicateAsset {
        /// The contested identity.
        id: AssetId,
    },

    /// An identity uses characters outside `[a-z0-9-]`.
    #[error("invalid asset identity \"{id}\"")]
    InvalidAssetId {
        /// The rejected identity.
        id: AssetId,
    },

    /// The asset registered under `id` is not of the requested type.
    #[error("asset \"{id}\" is registered with a different type")]
    TypeMismatch {
        /// The identity that was looked up.
        id: AssetId,
    },

    /// Resolving a dependency of `asset` failed.
    #[error("{asset}: {source}")]
    Dependency {
        /// The asset whose dependency failed.
        asset: AssetId,
        /// The dependency's error.
        source: Box<AssetError>,
    },
}

impl AssetError {
    /// Returns the chain of assets from the requested one down to the one
    /// whose resolution failed.
    pub fn trace(&self) -> Vec<AssetId> {
        let mut trace = Vec::new();
        let mut current = self;
        while let Self::Dependency { asset, source } = current {
            trace.push(*asset);
            current = source;
        }
        match current {
            Self::MissingDependency { asset, .. }
            | Self::GenerationFailed { asset, .. }
            | Self::CacheLoadFailed { asset, .. }
            | Self::PersistFailed { asset, .. }
            | Self::InvalidArtifact { asset, .. } => trace.push(*asset),
            Self::UnregisteredAsset { id } | Self::TypeMismatch { id } => trace.push(*id),
            _ => {}
        }
        trace
    }

    /// Returns the innermost error, skipping [`AssetError::Dependency`] wrappers.
    pub fn root_cause(&self) -> &AssetError {
        let mut current = self;
        while let Self::Dependency { source, .. } = current {
            current = source;
        }
        current
    }
}

fn render_path(path: &[AssetId]) -> String {
    path.iter()
        .map(AssetId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: AssetId = AssetId::new("a");
    const B: AssetId = AssetId::new("b");
    const C: AssetId = AssetId::new("c");

    #[test]
    fn cycle_display() {
        let err = AssetError::CycleDetected {
            path: vec![A, B, A],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: a -> b -> a");
    }

    #[test]
    fn generation_failed_display() {
        let err = AssetError::GenerationFailed {
            asset: C,
            source: "no known platform".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to generate asset \"c\": no known platform"
        );
    }

    #[test]
    fn dependency_chain_display_and_trace() {
        let err = AssetError::Dependency {
            asset: A,
            source: Box::new(AssetError::Dependency {
                asset: B,
                source: Box::new(AssetError::GenerationFailed {
                    asset: C,
                    source: "boom".into(),
                }),
            }),
        };
        assert_eq!(err.to_string(), "a: b: failed to generate asset \"c\": boom");
        assert_eq!(err.trace(), vec![A, B, C]);
        assert!(matches!(
            err.root_cause(),
            AssetError::GenerationFailed { asset, .. } if *asset == C
        ));
    }

    #[test]
    fn cycle_trace_is_wrapping_chain() {
        let err = AssetError::Dependency {
            asset: A,
            source: Box::new(AssetError::CycleDetected {
                path: vec![B, C, B],
            }),
        };
        assert_eq!(err.trace(), vec![A]);
    }

    #[test]
    fn missing_dependency_display() {
        let err = AssetError::MissingDependency {
            asset: A,
            requested: B,
        };
        assert!(err.to_string().contains("undeclared dependency \"b\""));
    }
}
