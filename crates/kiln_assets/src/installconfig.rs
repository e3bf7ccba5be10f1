//! The install configuration, parsed from the caller-supplied input.

use kiln_asset::{Asset, AssetId, GenerateError, Parents};
use kiln_config::{load_install_config_from_str, InstallConfig, INSTALL_CONFIG_FILE};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The validated `install-config.toml` every other asset builds on.
///
/// This is a leaf: its only input is the raw file content supplied to the
/// store under [`InstallConfigAsset::ID`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InstallConfigAsset {
    /// The parsed configuration. `None` only before generation.
    pub config: Option<InstallConfig>,
}

impl InstallConfigAsset {
    /// Returns the install configuration from an asset's dependencies.
    ///
    /// The calling asset must declare [`InstallConfigAsset::ID`].
    pub fn from_parents<'a>(parents: &Parents<'a>) -> Result<&'a InstallConfig, GenerateError> {
        parents
            .get::<InstallConfigAsset>()?
            .config
            .as_ref()
            .ok_or_else(|| "install config has not been generated".into())
    }
}

impl Asset for InstallConfigAsset {
    const ID: AssetId = AssetId::new("install-config");

    fn name(&self) -> &str {
        "Install Config"
    }

    fn dependencies(&self) -> Vec<AssetId> {
        Vec::new()
    }

    fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
        let input = parents
            .input()
            .ok_or_else(|| format!("{INSTALL_CONFIG_FILE} not found in the asset directory"))?;
        let config = load_install_config_from_str(std::str::from_utf8(input)?)?;
        if config.ssh_key.is_none() {
            warn!("No ssh_key set; machines will not accept SSH logins");
        }
        self.config = Some(config);
        Ok(())
    }
}
