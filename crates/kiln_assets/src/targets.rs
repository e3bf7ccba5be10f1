//! Aggregate entry points: assets that only exist to pull in a set of others.

use std::fmt;
use std::str::FromStr;

use kiln_asset::{Asset, AssetError, AssetId, GenerateError, Parents, Registry};
use serde::{Deserialize, Serialize};

use crate::ignition::{BootstrapIgnition, MasterIgnition, WorkerIgnition};
use crate::installconfig::InstallConfigAsset;
use crate::manifests::Manifests;
use crate::metadata::Metadata;
use crate::tfvars::TerraformVariables;

/// Declares a target asset that depends on a fixed list of assets and
/// produces nothing itself.
macro_rules! target_asset {
    ($(#[$doc:meta])* $ty:ident, $id:literal, $name:literal, [$($dep:ty),* $(,)?]) => {
        $(#[$doc])*
        #[derive(Debug, Default, Serialize, Deserialize)]
        pub struct $ty;

        impl Asset for $ty {
            const ID: AssetId = AssetId::new($id);

            fn name(&self) -> &str {
                $name
            }

            fn dependencies(&self) -> Vec<AssetId> {
                vec![$(<$dep>::ID),*]
            }

            fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), GenerateError> {
                Ok(())
            }
        }
    };
}

target_asset!(
    /// Everything `create install-config` produces.
    InstallConfigTarget,
    "target-install-config",
    "Install Config Target",
    [InstallConfigAsset]
);

target_asset!(
    /// Everything `create manifests` produces.
    ManifestsTarget,
    "target-manifests",
    "Manifests Target",
    [Manifests, Metadata]
);

target_asset!(
    /// Everything `create ignition-configs` produces.
    IgnitionConfigsTarget,
    "target-ignition-configs",
    "Ignition Configs Target",
    [BootstrapIgnition, MasterIgnition, WorkerIgnition, Metadata]
);

target_asset!(
    /// Everything `create cluster` produces.
    ClusterTarget,
    "target-cluster",
    "Cluster Target",
    [TerraformVariables, Metadata, WorkerIgnition]
);

pub(crate) fn register(registry: &mut Registry) -> Result<(), AssetError> {
    registry
        .register::<InstallConfigTarget>()?
        .register::<ManifestsTarget>()?
        .register::<IgnitionConfigsTarget>()?
        .register::<ClusterTarget>()?;
    Ok(())
}

/// A named entry point of the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The validated install configuration.
    InstallConfig,
    /// Cluster manifests and metadata.
    Manifests,
    /// Ignition configs for every machine role.
    IgnitionConfigs,
    /// Everything needed to create the cluster's infrastructure.
    Cluster,
}

impl Target {
    /// Every target, in the order they build on each other.
    pub const ALL: [Target; 4] = [
        Target::InstallConfig,
        Target::Manifests,
        Target::IgnitionConfigs,
        Target::Cluster,
    ];

    /// Returns the command-line name.
    pub fn name(self) -> &'static str {
        match self {
            Self::InstallConfig => "install-config",
            Self::Manifests => "manifests",
            Self::IgnitionConfigs => "ignition-configs",
            Self::Cluster => "cluster",
        }
    }

    /// Returns the identity of the target's aggregate asset.
    pub fn id(self) -> AssetId {
        match self {
            Self::InstallConfig => InstallConfigTarget::ID,
            Self::Manifests => ManifestsTarget::ID,
            Self::IgnitionConfigs => IgnitionConfigsTarget::ID,
            Self::Cluster => ClusterTarget::ID,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A target name that does not match any [`Target`].
#[derive(Debug, thiserror::Error)]
#[error("unknown target '{0}' (expected one of: install-config, manifests, ignition-configs, cluster)")]
pub struct UnknownTarget(pub String);

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownTarget(s.to_string()))
    }
}
