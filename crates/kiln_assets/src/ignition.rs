//! Ignition configs for the bootstrap, master, and worker machines.
//!
//! The bootstrap config is self-contained: it carries the manifests and the
//! pull secret inline. Master and worker configs are pointers to the machine
//! config server, which serves the real configs once the control plane is up.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use kiln_asset::{Artifact, Asset, AssetId, GenerateError, Parents};
use kiln_config::InstallConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::installconfig::InstallConfigAsset;
use crate::manifests::Manifests;

/// Ignition spec version emitted.
pub const IGNITION_VERSION: &str = "3.2.0";

/// Port the machine config server listens on.
const MACHINE_CONFIG_SERVER_PORT: u16 = 22623;

/// Where manifests are placed on the bootstrap machine.
const BOOTSTRAP_MANIFEST_DIR: &str = "/opt/kiln/manifests";

/// Where the pull secret is placed on the bootstrap machine.
const PULL_SECRET_PATH: &str = "/root/.docker/config.json";

/// The Bootstrap Ignition Config asset.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BootstrapIgnition {
    /// The serialized Ignition config.
    pub contents: String,
}

impl Asset for BootstrapIgnition {
    const ID: AssetId = AssetId::new("bootstrap-ignition");

    fn name(&self) -> &str {
        "Bootstrap Ignition Config"
    }

    fn dependencies(&self) -> Vec<AssetId> {
        vec![InstallConfigAsset::ID, Manifests::ID]
    }

    fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
        let config = InstallConfigAsset::from_parents(parents)?;
        let manifests = parents.get::<Manifests>()?;

        let mut files: Vec<Value> = manifests
            .files
            .iter()
            .map(|artifact| {
                let name = artifact
                    .name
                    .rsplit('/')
                    .next()
                    .unwrap_or(artifact.name.as_str());
                file_entry(
                    &format!("{BOOTSTRAP_MANIFEST_DIR}/{name}"),
                    &artifact.data,
                    artifact.mode,
                )
            })
            .collect();
        if let Some(secret) = &config.pull_secret {
            files.push(file_entry(
                PULL_SECRET_PATH,
                secret.as_bytes(),
                Artifact::PRIVATE_MODE,
            ));
        }

        let mut ignition = base_config(config);
        ignition["storage"] = json!({ "files": files });
        self.contents = serde_json::to_string(&ignition)?;
        Ok(())
    }

    fn artifacts(&self) -> Vec<Artifact> {
        vec![Artifact::new("bootstrap.ign", self.contents.clone()).with_mode(Artifact::PRIVATE_MODE)]
    }
}

/// The Master Ignition Config asset.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MasterIgnition {
    /// The serialized Ignition config.
    pub contents: String,
}

impl Asset for MasterIgnition {
    const ID: AssetId = AssetId::new("master-ignition");

    fn name(&self) -> &str {
        "Master Ignition Config"
    }

    fn dependencies(&self) -> Vec<AssetId> {
        vec![InstallConfigAsset::ID]
    }

    fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
        let config = InstallConfigAsset::from_parents(parents)?;
        self.contents = serde_json::to_string(&pointer_config(config, "master"))?;
        Ok(())
    }

    fn artifacts(&self) -> Vec<Artifact> {
        vec![Artifact::new("master.ign", self.contents.clone())]
    }
}

/// The Worker Ignition Config asset.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WorkerIgnition {
    /// The serialized Ignition config.
    pub contents: String,
}

impl Asset for WorkerIgnition {
    const ID: AssetId = AssetId::new("worker-ignition");

    fn name(&self) -> &str {
        "Worker Ignition Config"
    }

    fn dependencies(&self) -> Vec<AssetId> {
        vec![InstallConfigAsset::ID]
    }

    fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
        let config = InstallConfigAsset::from_parents(parents)?;
        self.contents = serde_json::to_string(&pointer_config(config, "worker"))?;
        Ok(())
    }

    fn artifacts(&self) -> Vec<Artifact> {
        vec![Artifact::new("worker.ign", self.contents.clone())]
    }
}

/// An Ignition config with the version header and, when configured, the
/// `core` user's SSH key.
fn base_config(config: &InstallConfig) -> Value {
    let mut ignition = json!({ "ignition": { "version": IGNITION_VERSION } });
    if let Some(key) = &config.ssh_key {
        ignition["passwd"] = json!({
            "users": [{ "name": "core", "sshAuthorizedKeys": [key] }],
        });
    }
    ignition
}

/// A config that merges in whatever the machine config server serves for
/// `role`.
fn pointer_config(config: &InstallConfig, role: &str) -> Value {
    let mut ignition = base_config(config);
    let source = format!(
        "https://api-int.{}:{MACHINE_CONFIG_SERVER_PORT}/config/{role}",
        config.cluster_domain()
    );
    ignition["ignition"]["config"] = json!({ "merge": [{ "source": source }] });
    ignition
}

/// A `storage.files` entry with inline contents.
fn file_entry(path: &str, data: &[u8], mode: u32) -> Value {
    json!({
        "path": path,
        "mode": mode,
        "overwrite": true,
        "contents": { "source": data_url(data) },
    })
}

fn data_url(data: &[u8]) -> String {
    format!("data:text/plain;charset=utf-8;base64,{}", STANDARD.encode(data))
}
