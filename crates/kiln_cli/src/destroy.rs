//! `kiln destroy`: remove generated files and cached state.

use kiln_asset::{Store, StoreConfig};
use tracing::info;

use crate::{DestroyArgs, GlobalArgs, TOOL_VERSION};

/// Runs the `kiln destroy` command.
///
/// With no `--asset` flags every asset is purged and the state directory is
/// removed. Otherwise only the named assets are purged; their dependents keep
/// their files and are regenerated by the next `create` that needs them.
pub fn run(args: &DestroyArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut store = Store::open(
        StoreConfig::new(&global.dir, TOOL_VERSION),
        kiln_assets::registry()?,
    );

    let removed = if args.asset.is_empty() {
        store.purge_all()?
    } else {
        let ids = store.registry().ids();
        let mut removed = Vec::new();
        for name in &args.asset {
            let id = ids
                .iter()
                .copied()
                .find(|id| id.as_str() == name)
                .ok_or_else(|| format!("unknown asset '{name}'"))?;
            removed.extend(store.purge(id)?);
        }
        store.gc()?;
        removed
    };

    info!(
        "Removed {} file(s) from {}",
        removed.len(),
        global.dir.display()
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use kiln_assets::Target;
    use kiln_config::INSTALL_CONFIG_FILE;

    use super::*;

    const CONFIG: &str = "[cluster]\nname = \"demo\"\nbase_domain = \"example.com\"\n\n[platform.aws]\nregion = \"us-east-1\"\n";

    fn setup() -> (tempfile::TempDir, GlobalArgs) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INSTALL_CONFIG_FILE), CONFIG).unwrap();
        let global = GlobalArgs {
            dir: PathBuf::from(dir.path()),
        };
        crate::create::run(Target::Cluster, &global).unwrap();
        (dir, global)
    }

    #[test]
    fn destroy_everything_keeps_install_config() {
        let (dir, global) = setup();
        let args = DestroyArgs { asset: Vec::new() };
        assert_eq!(run(&args, &global).unwrap(), 0);

        let left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from(INSTALL_CONFIG_FILE)]);
    }

    #[test]
    fn destroy_one_asset() {
        let (dir, global) = setup();
        let args = DestroyArgs {
            asset: vec!["metadata".to_string()],
        };
        run(&args, &global).unwrap();
        assert!(!dir.path().join("metadata.json").exists());
        assert!(dir.path().join("bootstrap.ign").exists());
    }

    #[test]
    fn destroy_unknown_asset_fails() {
        let (_dir, global) = setup();
        let args = DestroyArgs {
            asset: vec!["nope".to_string()],
        };
        let err = run(&args, &global).unwrap_err();
        assert_eq!(err.to_string(), "unknown asset 'nope'");
    }
}
