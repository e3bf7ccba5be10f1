//! Terraform variables for creating the cluster's infrastructure.

use kiln_asset::{Artifact, Asset, AssetId, GenerateError, Parents};
use kiln_config::Platform;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::cluster_id::ClusterId;
use crate::ignition::{BootstrapIgnition, MasterIgnition};
use crate::installconfig::InstallConfigAsset;

/// File name of the variables artifact.
pub const TFVARS_FILE: &str = "terraform.tfvars.json";

/// The Terraform Variables asset.
///
/// The variables embed the bootstrap Ignition config, so the file is written
/// with private permissions.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TerraformVariables {
    /// The serialized variables.
    pub contents: String,
}

impl Asset for TerraformVariables {
    const ID: AssetId = AssetId::new("terraform-variables");

    fn name(&self) -> &str {
        "Terraform Variables"
    }

    fn dependencies(&self) -> Vec<AssetId> {
        vec![
            InstallConfigAsset::ID,
            ClusterId::ID,
            BootstrapIgnition::ID,
            MasterIgnition::ID,
        ]
    }

    fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
        let config = InstallConfigAsset::from_parents(parents)?;
        let cluster_id = parents.get::<ClusterId>()?;
        let bootstrap = parents.get::<BootstrapIgnition>()?;
        let master = parents.get::<MasterIgnition>()?;

        let mut vars = Map::new();
        let mut set = |key: &str, value: Value| {
            vars.insert(key.to_string(), value);
        };
        set("cluster_id", json!(cluster_id.infra_id));
        set("cluster_uuid", json!(cluster_id.uuid));
        set("cluster_domain", json!(config.cluster_domain()));
        set("base_domain", json!(config.cluster.base_domain));
        set("machine_cidr", json!(config.networking.machine_cidr));
        set("master_count", json!(config.control_plane.replicas));
        set("ignition_bootstrap", json!(bootstrap.contents));
        set("ignition_master", json!(master.contents));

        let instance_type = &config.control_plane.instance_type;
        match &config.platform {
            Platform::Aws(aws) => {
                set("aws_region", json!(aws.region));
                set("aws_extra_tags", json!(aws.user_tags));
                if let Some(instance_type) = instance_type {
                    set("aws_master_instance_type", json!(instance_type));
                }
            }
            Platform::Openstack(openstack) => {
                set("openstack_region", json!(openstack.region));
                set("openstack_cloud", json!(openstack.cloud));
                if let Some(network) = &openstack.external_network {
                    set("openstack_external_network", json!(network));
                }
                if let Some(instance_type) = instance_type {
                    set("openstack_master_flavor_name", json!(instance_type));
                }
            }
            Platform::Libvirt(libvirt) => {
                set("libvirt_uri", json!(libvirt.uri));
                if let Some(interface) = &libvirt.network_interface {
                    set("libvirt_network_if", json!(interface));
                }
            }
        }

        self.contents = serde_json::to_string_pretty(&Value::Object(vars))?;
        Ok(())
    }

    fn artifacts(&self) -> Vec<Artifact> {
        vec![Artifact::new(TFVARS_FILE, self.contents.clone()).with_mode(Artifact::PRIVATE_MODE)]
    }
}
