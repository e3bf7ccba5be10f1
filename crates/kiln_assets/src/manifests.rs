//! Cluster-wide Kubernetes manifests applied during bootstrap.

use kiln_asset::{Artifact, Asset, AssetId, GenerateError, Parents};
use kiln_config::{InstallConfig, Platform};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cluster_id::ClusterId;
use crate::installconfig::InstallConfigAsset;

/// Directory the manifests are written to.
pub const MANIFEST_DIR: &str = "manifests";

/// The Common Manifests asset.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifests {
    /// One artifact per manifest, under [`MANIFEST_DIR`].
    pub files: Vec<Artifact>,
}

impl Asset for Manifests {
    const ID: AssetId = AssetId::new("manifests");

    fn name(&self) -> &str {
        "Common Manifests"
    }

    fn dependencies(&self) -> Vec<AssetId> {
        vec![InstallConfigAsset::ID, ClusterId::ID]
    }

    fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
        let config = InstallConfigAsset::from_parents(parents)?;
        let cluster_id = parents.get::<ClusterId>()?;

        self.files = vec![
            manifest("cluster-config.yaml", &cluster_config(config)?)?,
            manifest(
                "cluster-infrastructure-02-config.yml",
                &infrastructure(config, cluster_id),
            )?,
            manifest("cluster-dns-02-config.yml", &dns(config))?,
        ];
        Ok(())
    }

    fn artifacts(&self) -> Vec<Artifact> {
        self.files.clone()
    }
}

fn manifest(name: &str, value: &Value) -> Result<Artifact, GenerateError> {
    let yaml = serde_yaml::to_string(value)?;
    Ok(Artifact::new(format!("{MANIFEST_DIR}/{name}"), yaml))
}

/// The install configuration, stored in the cluster for later operators.
fn cluster_config(config: &InstallConfig) -> Result<Value, GenerateError> {
    // Through JSON so the platform enum renders as a plain mapping.
    let install_config = serde_yaml::to_string(&serde_json::to_value(config)?)?;
    Ok(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": "cluster-config-v1",
            "namespace": "kube-system",
        },
        "data": {
            "install-config": install_config,
        },
    }))
}

fn infrastructure(config: &InstallConfig, cluster_id: &ClusterId) -> Value {
    let domain = config.cluster_domain();
    json!({
        "apiVersion": "config.openshift.io/v1",
        "kind": "Infrastructure",
        "metadata": {"name": "cluster"},
        "spec": {},
        "status": {
            "infrastructureName": cluster_id.infra_id,
            "platform": platform_type(&config.platform),
            "apiServerURL": format!("https://api.{domain}:6443"),
            "etcdDiscoveryDomain": domain,
        },
    })
}

fn dns(config: &InstallConfig) -> Value {
    json!({
        "apiVersion": "config.openshift.io/v1",
        "kind": "DNS",
        "metadata": {"name": "cluster"},
        "spec": {"baseDomain": config.cluster_domain()},
    })
}

fn platform_type(platform: &Platform) -> &'static str {
    match platform {
        Platform::Aws(_) => "AWS",
        Platform::Openstack(_) => "OpenStack",
        Platform::Libvirt(_) => "Libvirt",
    }
}
