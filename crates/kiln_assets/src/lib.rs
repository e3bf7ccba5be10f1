//! The installer's concrete assets.
//!
//! Every producer here reads the parsed install configuration, directly or
//! through other assets, and emits the files a cluster install needs:
//! manifests, Ignition configs for each machine role, cluster metadata, and
//! Terraform variables. [`registry`] returns them all registered, and
//! [`Target`] names the aggregate entry points the command line exposes.

#![warn(missing_docs)]

pub mod cluster_id;
pub mod ignition;
pub mod installconfig;
pub mod manifests;
pub mod metadata;
pub mod targets;
pub mod tfvars;

use kiln_asset::{AssetError, Registry};

pub use cluster_id::ClusterId;
pub use ignition::{BootstrapIgnition, MasterIgnition, WorkerIgnition};
pub use installconfig::InstallConfigAsset;
pub use manifests::Manifests;
pub use metadata::Metadata;
pub use targets::{Target, UnknownTarget};
pub use tfvars::TerraformVariables;

/// Returns a registry holding every installer asset.
pub fn registry() -> Result<Registry, AssetError> {
    let mut registry = Registry::new();
    registry
        .register::<InstallConfigAsset>()?
        .register::<ClusterId>()?
        .register::<Metadata>()?
        .register::<Manifests>()?
        .register::<BootstrapIgnition>()?
        .register::<MasterIgnition>()?
        .register::<WorkerIgnition>()?
        .register::<TerraformVariables>()?;
    targets::register(&mut registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_every_asset() {
        let registry = registry().unwrap();
        assert_eq!(registry.ids().len(), 12);
        for target in Target::ALL {
            assert!(registry.contains(target.id()), "{}", target.name());
        }
    }

    #[test]
    fn every_declared_dependency_is_registered() {
        let registry = registry().unwrap();
        for (from, to) in registry.dependency_edges() {
            assert!(registry.contains(to), "{from} depends on unknown {to}");
        }
    }
}
