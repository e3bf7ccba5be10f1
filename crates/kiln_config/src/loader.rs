//! Configuration file loading and validation.

use std::net::IpAddr;
use std::path::Path;

use crate::error::ConfigError;
use crate::types::{InstallConfig, Platform};

/// File name of the cluster description inside the asset directory.
pub const INSTALL_CONFIG_FILE: &str = "install-config.toml";

const MAX_CLUSTER_NAME_LEN: usize = 53;

/// Loads and validates `install-config.toml` from an asset directory.
pub fn load_install_config(dir: &Path) -> Result<InstallConfig, ConfigError> {
    let content = std::fs::read_to_string(dir.join(INSTALL_CONFIG_FILE))?;
    load_install_config_from_str(&content)
}

/// Parses and validates an `install-config.toml` from a string.
pub fn load_install_config_from_str(content: &str) -> Result<InstallConfig, ConfigError> {
    let config: InstallConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates names, counts, platform fields, and network ranges.
fn validate_config(config: &InstallConfig) -> Result<(), ConfigError> {
    validate_cluster_name(&config.cluster.name)?;
    if config.cluster.base_domain.trim().is_empty() {
        return Err(ConfigError::MissingField("cluster.base_domain".to_string()));
    }
    if config.control_plane.replicas == 0 {
        return Err(ConfigError::ValidationError(
            "control_plane.replicas must be at least 1".to_string(),
        ));
    }

    match &config.platform {
        Platform::Aws(aws) => require("platform.aws.region", &aws.region)?,
        Platform::Openstack(openstack) => {
            require("platform.openstack.region", &openstack.region)?;
            require("platform.openstack.cloud", &openstack.cloud)?;
        }
        Platform::Libvirt(libvirt) => require("platform.libvirt.uri", &libvirt.uri)?,
    }

    let net = &config.networking;
    validate_cidr("networking.machine_cidr", &net.machine_cidr)?;
    validate_cidr("networking.cluster_cidr", &net.cluster_cidr)?;
    validate_cidr("networking.service_cidr", &net.service_cidr)?;
    Ok(())
}

fn require(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField(field.to_string()));
    }
    Ok(())
}

/// A cluster name must be a DNS label short enough to prefix generated
/// resource names.
fn validate_cluster_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::MissingField("cluster.name".to_string()));
    }
    let invalid = |reason: &str| {
        ConfigError::ValidationError(format!("cluster.name \"{name}\" {reason}"))
    };
    if name.len() > MAX_CLUSTER_NAME_LEN {
        return Err(invalid("is longer than 53 characters"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(invalid("may only contain lowercase letters, digits, and '-'"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a letter or digit"));
    }
    Ok(())
}

fn validate_cidr(field: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::ValidationError(format!("{field} \"{value}\" is not a valid CIDR"));
    let (addr, prefix) = value.split_once('/').ok_or_else(invalid)?;
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(invalid());
    }
    Ok(())
}
