//! Configuration types deserialized from `install-config.toml`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The top-level cluster description parsed from `install-config.toml`.
///
/// Only `cluster` and `platform` are required; every other section falls back
/// to its defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallConfig {
    /// SSH public key installed for the `core` user on every machine.
    #[serde(default)]
    pub ssh_key: Option<String>,
    /// Registry pull secret embedded in the bootstrap machine's config.
    #[serde(default)]
    pub pull_secret: Option<String>,
    /// Cluster identity.
    pub cluster: ClusterMeta,
    /// The infrastructure the cluster runs on.
    pub platform: Platform,
    /// Network ranges.
    #[serde(default)]
    pub networking: Networking,
    /// Control plane machines.
    #[serde(default)]
    pub control_plane: MachinePool,
    /// Compute machines.
    #[serde(default)]
    pub compute: MachinePool,
}

impl InstallConfig {
    /// Returns the cluster's DNS domain, `<name>.<base_domain>`.
    pub fn cluster_domain(&self) -> String {
        format!("{}.{}", self.cluster.name, self.cluster.base_domain)
    }
}

/// Cluster naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMeta {
    /// Cluster name, a DNS label.
    pub name: String,
    /// Parent DNS domain of the cluster.
    pub base_domain: String,
    /// Fixed cluster UUID. Derived from the cluster domain when absent.
    #[serde(default)]
    pub cluster_id: Option<String>,
}

/// Platform-specific settings. Exactly one platform table may be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Amazon Web Services.
    Aws(AwsPlatform),
    /// OpenStack.
    Openstack(OpenstackPlatform),
    /// libvirt, for development clusters.
    Libvirt(LibvirtPlatform),
}

impl Platform {
    /// Returns the platform's lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aws(_) => "aws",
            Self::Openstack(_) => "openstack",
            Self::Libvirt(_) => "libvirt",
        }
    }
}

/// AWS settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsPlatform {
    /// Region to create resources in (e.g., "us-east-1").
    pub region: String,
    /// Extra tags applied to every created resource.
    #[serde(default)]
    pub user_tags: BTreeMap<String, String>,
}

/// OpenStack settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenstackPlatform {
    /// Region to create resources in.
    pub region: String,
    /// Name of the cloud entry in `clouds.yaml`.
    pub cloud: String,
    /// External network for floating IPs.
    #[serde(default)]
    pub external_network: Option<String>,
}

/// libvirt settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibvirtPlatform {
    /// Connection URI of the libvirt daemon (e.g., "qemu+tcp://192.168.122.1/system").
    pub uri: String,
    /// Host interface the cluster network is bridged to.
    #[serde(default)]
    pub network_interface: Option<String>,
}

/// Network ranges in CIDR notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Networking {
    /// Range machines get addresses from.
    #[serde(default = "default_machine_cidr")]
    pub machine_cidr: String,
    /// Range pods get addresses from.
    #[serde(default = "default_cluster_cidr")]
    pub cluster_cidr: String,
    /// Range services get addresses from.
    #[serde(default = "default_service_cidr")]
    pub service_cidr: String,
}

fn default_machine_cidr() -> String {
    "10.0.0.0/16".to_string()
}

fn default_cluster_cidr() -> String {
    "10.128.0.0/14".to_string()
}

fn default_service_cidr() -> String {
    "172.30.0.0/16".to_string()
}

impl Default for Networking {
    fn default() -> Self {
        Self {
            machine_cidr: default_machine_cidr(),
            cluster_cidr: default_cluster_cidr(),
            service_cidr: default_service_cidr(),
        }
    }
}

/// A group of identical machines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinePool {
    /// Number of machines.
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    /// Platform instance type; the platform default is used when absent.
    #[serde(default)]
    pub instance_type: Option<String>,
}

fn default_replicas() -> u32 {
    3
}

impl Default for MachinePool {
    fn default() -> Self {
        Self {
            replicas: default_replicas(),
            instance_type: None,
        }
    }
}
