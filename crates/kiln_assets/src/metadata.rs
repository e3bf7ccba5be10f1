//! `metadata.json`, the record the destroy tooling uses to find a cluster's
//! resources.

use std::collections::BTreeMap;

use kiln_asset::{Artifact, Asset, AssetId, GenerateError, Parents};
use kiln_config::Platform;
use serde::{Deserialize, Serialize};

use crate::cluster_id::ClusterId;
use crate::installconfig::InstallConfigAsset;

/// File name of the metadata artifact.
pub const METADATA_FILE: &str = "metadata.json";

/// Cluster metadata as written to [`METADATA_FILE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadata {
    /// The cluster name.
    pub cluster_name: String,
    /// The cluster UUID.
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    /// The infrastructure name prefix.
    #[serde(rename = "infraID")]
    pub infra_id: String,
    /// Where the cluster's resources live.
    #[serde(flatten)]
    pub platform: PlatformMetadata,
}

/// Per-platform lookup information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformMetadata {
    /// AWS resources are found by region and tag.
    Aws {
        /// The region resources were created in.
        region: String,
        /// Tags identifying the cluster's resources.
        identifier: BTreeMap<String, String>,
    },
    /// OpenStack resources are found by region and tag.
    Openstack {
        /// The region resources were created in.
        region: String,
        /// Tags identifying the cluster's resources.
        identifier: BTreeMap<String, String>,
    },
    /// libvirt resources live on one daemon.
    Libvirt {
        /// The daemon's connection URI.
        uri: String,
    },
}

/// The Cluster Metadata asset.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// The generated metadata. `None` only before generation.
    pub metadata: Option<ClusterMetadata>,
    /// Serialized form of `metadata`.
    pub contents: String,
}

impl Asset for Metadata {
    const ID: AssetId = AssetId::new("metadata");

    fn name(&self) -> &str {
        "Cluster Metadata"
    }

    fn dependencies(&self) -> Vec<AssetId> {
        vec![InstallConfigAsset::ID, ClusterId::ID]
    }

    fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
        let config = InstallConfigAsset::from_parents(parents)?;
        let cluster_id = parents.get::<ClusterId>()?;

        let identifier = || {
            BTreeMap::from([(
                "tectonicClusterID".to_string(),
                cluster_id.uuid.clone(),
            )])
        };
        let platform = match &config.platform {
            Platform::Aws(aws) => PlatformMetadata::Aws {
                region: aws.region.clone(),
                identifier: identifier(),
            },
            Platform::Openstack(openstack) => PlatformMetadata::Openstack {
                region: openstack.region.clone(),
                identifier: identifier(),
            },
            Platform::Libvirt(libvirt) => PlatformMetadata::Libvirt {
                uri: libvirt.uri.clone(),
            },
        };

        let metadata = ClusterMetadata {
            cluster_name: config.cluster.name.clone(),
            cluster_id: cluster_id.uuid.clone(),
            infra_id: cluster_id.infra_id.clone(),
            platform,
        };
        self.contents = serde_json::to_string(&metadata)
            .map_err(|e| format!("failed to serialize cluster metadata: {e}"))?;
        self.metadata = Some(metadata);
        Ok(())
    }

    fn artifacts(&self) -> Vec<Artifact> {
        vec![Artifact::new(METADATA_FILE, self.contents.clone())]
    }
}
