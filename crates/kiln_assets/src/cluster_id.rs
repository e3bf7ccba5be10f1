//! The cluster's identity: a UUID and the infrastructure name prefix.

use kiln_asset::{Asset, AssetId, GenerateError, Parents};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::installconfig::InstallConfigAsset;

/// Longest infrastructure ID cloud resource names can carry.
const MAX_INFRA_ID_LEN: usize = 27;

/// Length of the UUID-derived suffix of the infrastructure ID.
const INFRA_SUFFIX_LEN: usize = 5;

/// Identifiers derived once per cluster.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClusterId {
    /// Cluster UUID, in hyphenated form.
    pub uuid: String,
    /// Prefix for every infrastructure resource, `<name>-<suffix>`.
    pub infra_id: String,
}

impl Asset for ClusterId {
    const ID: AssetId = AssetId::new("cluster-id");

    fn name(&self) -> &str {
        "Cluster ID"
    }

    fn dependencies(&self) -> Vec<AssetId> {
        vec![InstallConfigAsset::ID]
    }

    fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
        let config = InstallConfigAsset::from_parents(parents)?;
        let uuid = match &config.cluster.cluster_id {
            Some(id) => Uuid::parse_str(id)
                .map_err(|e| format!("cluster.cluster_id \"{id}\" is not a UUID: {e}"))?,
            None => {
                debug!("Deriving cluster ID from {}", config.cluster_domain());
                Uuid::new_v5(&Uuid::NAMESPACE_DNS, config.cluster_domain().as_bytes())
            }
        };
        self.uuid = uuid.hyphenated().to_string();
        self.infra_id = infra_id(&config.cluster.name, &uuid);
        Ok(())
    }
}

/// Builds `<prefix>-<suffix>` from the cluster name and UUID, truncating the
/// name so the whole ID fits in [`MAX_INFRA_ID_LEN`].
fn infra_id(name: &str, uuid: &Uuid) -> String {
    let max_prefix = MAX_INFRA_ID_LEN - INFRA_SUFFIX_LEN - 1;
    let prefix: String = name.chars().take(max_prefix).collect();
    let prefix = prefix.trim_end_matches('-');
    let simple = uuid.simple().to_string();
    format!("{prefix}-{}", &simple[..INFRA_SUFFIX_LEN])
}
