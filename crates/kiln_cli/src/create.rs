//! `kiln create`: generate a target into the asset directory.
//!
//! 1. Read `install-config.toml` from the asset directory, if present
//! 2. Open the store over the directory's cached state
//! 3. Resolve the target's aggregate asset
//! 4. Report which assets were generated and which were reused

use std::io::ErrorKind;

use kiln_asset::{Asset, Origin, Store, StoreConfig};
use kiln_assets::{InstallConfigAsset, Target};
use kiln_config::INSTALL_CONFIG_FILE;
use tracing::{debug, info};

use crate::{GlobalArgs, TOOL_VERSION};

/// Runs the `kiln create` command.
pub fn run(target: Target, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = StoreConfig::new(&global.dir, TOOL_VERSION);
    let config_path = global.dir.join(INSTALL_CONFIG_FILE);
    match std::fs::read(&config_path) {
        Ok(data) => config = config.with_input(InstallConfigAsset::ID, data),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} does not exist", config_path.display());
        }
        Err(e) => {
            return Err(format!("failed to read {}: {e}", config_path.display()).into());
        }
    }

    let mut store = Store::open(config, kiln_assets::registry()?);
    store.resolve_id(target.id())?;

    let summary = summarize(&store);
    for (name, origin) in &summary {
        let verb = match origin {
            Origin::Generated => "Generated",
            Origin::Cached => "Reused",
        };
        println!("{verb:>9} {name}");
    }
    info!("Created {target} in {}", global.dir.display());
    Ok(0)
}

/// Lists every non-target asset the store resolved, in resolution order.
fn summarize(store: &Store) -> Vec<(String, Origin)> {
    let targets: Vec<_> = Target::ALL.iter().map(|t| t.id()).collect();
    store
        .resolution_order()
        .iter()
        .copied()
        .filter(|id| !targets.contains(id))
        .filter_map(|id| {
            let name = store.registry().name_of(id)?;
            Some((name, store.origin(id)?))
        })
        .collect()
}
