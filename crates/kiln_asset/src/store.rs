//! The asset store: depth-first resolution, memoization, and persistence.
//!
//! [`Store::resolve`] walks the requested asset's dependency graph with an
//! explicit stack. Each asset is evaluated at most once per store. An asset is
//! restored from the state cache when its fingerprint matches the cached one
//! and its recorded files are intact; otherwise it is generated from its
//! resolved dependencies and its artifacts and state are written back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kiln_cache::{CacheError, IndexEntry, Lookup, StateCache};
use kiln_common::{AssetId, Fingerprint};
use tracing::{debug, info, warn};

use crate::asset::{Asset, DynAsset};
use crate::error::AssetError;
use crate::fingerprint;
use crate::parents::Parents;
use crate::persist;
use crate::registry::Registry;

/// External inputs keyed by the asset that consumes them.
///
/// An input participates in its asset's fingerprint, so changing it
/// invalidates that asset and everything depending on it.
#[derive(Clone, Debug, Default)]
pub struct Inputs {
    values: HashMap<AssetId, Vec<u8>>,
}

impl Inputs {
    /// Creates an empty set of inputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the input for `id`, replacing any previous value.
    pub fn insert(&mut self, id: AssetId, data: impl Into<Vec<u8>>) -> &mut Self {
        self.values.insert(id, data.into());
        self
    }

    /// Returns the input for `id`, if one was supplied.
    pub fn get(&self, id: AssetId) -> Option<&[u8]> {
        self.values.get(&id).map(Vec::as_slice)
    }
}

/// Settings for a [`Store`].
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// The asset directory. Artifacts are written here and cached state under
    /// its `.kiln` subdirectory.
    pub dir: PathBuf,
    /// Version of the tool. Cached state written by another version is
    /// discarded.
    pub tool_version: String,
    /// External inputs supplied to producers.
    pub inputs: Inputs,
}

impl StoreConfig {
    /// Creates a configuration with no inputs.
    pub fn new(dir: impl Into<PathBuf>, tool_version: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            tool_version: tool_version.into(),
            inputs: Inputs::new(),
        }
    }

    /// Adds an external input for `id`.
    pub fn with_input(mut self, id: AssetId, data: impl Into<Vec<u8>>) -> Self {
        self.inputs.insert(id, data);
        self
    }
}

/// Where a resolved asset's state came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// The producer ran during this store's lifetime.
    Generated,
    /// The state was restored from an earlier run.
    Cached,
}

/// A fully resolved asset held in the store's memo.
pub(crate) struct Resolved {
    pub(crate) asset: Box<dyn DynAsset>,
    pub(crate) fingerprint: Fingerprint,
    pub(crate) origin: Origin,
}

/// An asset on the resolution stack whose dependencies are being visited.
struct Frame {
    id: AssetId,
    asset: Box<dyn DynAsset>,
    dependencies: Vec<AssetId>,
    next: usize,
}

/// Resolves assets against one asset directory.
///
/// A store is single-threaded and owns its directory for its whole lifetime.
/// Running two stores over the same directory at once is unsupported.
pub struct Store {
    config: StoreConfig,
    registry: Registry,
    cache: StateCache,
    /// Every asset resolved so far, keyed by identity.
    resolved: HashMap<AssetId, Resolved>,
    /// Completion order of `resolved`.
    order: Vec<AssetId>,
}

impl Store {
    /// Opens a store over `config.dir`.
    ///
    /// Loading the state cache never fails; an unreadable or incompatible
    /// cache is treated as empty.
    pub fn open(config: StoreConfig, registry: Registry) -> Self {
        let cache = StateCache::open(&config.dir, &config.tool_version);
        Self {
            config,
            registry,
            cache,
            resolved: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Returns the asset directory.
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Returns the registry this store resolves against.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolves `T` and everything it depends on, returning the resolved value.
    pub fn resolve<T: Asset>(&mut self) -> Result<&T, AssetError> {
        self.resolve_id(T::ID)?;
        self.get::<T>().ok_or(AssetError::TypeMismatch { id: T::ID })
    }

    /// Resolves the asset registered under `id`.
    pub fn resolve_id(&mut self, id: AssetId) -> Result<&dyn DynAsset, AssetError> {
        if !self.resolved.contains_key(&id) {
            self.run(id)?;
        }
        self.resolved
            .get(&id)
            .map(|r| r.asset.as_ref())
            .ok_or(AssetError::UnregisteredAsset { id })
    }

    /// Returns `T` if it has already been resolved by this store.
    pub fn get<T: Asset>(&self) -> Option<&T> {
        self.resolved
            .get(&T::ID)
            .and_then(|r| r.asset.as_any().downcast_ref::<T>())
    }

    /// Returns where the resolved asset `id` came from.
    pub fn origin(&self, id: AssetId) -> Option<Origin> {
        self.resolved.get(&id).map(|r| r.origin)
    }

    /// Returns the fingerprint of the resolved asset `id`.
    pub fn fingerprint(&self, id: AssetId) -> Option<Fingerprint> {
        self.resolved.get(&id).map(|r| r.fingerprint)
    }

    /// Returns resolved identities in completion order. Every asset appears
    /// after all of its dependencies.
    pub fn resolution_order(&self) -> &[AssetId] {
        &self.order
    }

    /// Returns the cache entry recorded for `id`.
    pub fn cache_entry(&self, id: AssetId) -> Option<&IndexEntry> {
        self.cache.entry(id.as_str())
    }

    /// Deletes the files and cached state of `id`, and forgets it if it was
    /// resolved. Returns the removed files.
    pub fn purge(&mut self, id: AssetId) -> Result<Vec<PathBuf>, AssetError> {
        self.forget(id);
        self.purge_key(id.as_str())
    }

    /// Deletes the files and cached state of every registered or cached
    /// asset, then removes the state directory. Returns the removed files.
    pub fn purge_all(&mut self) -> Result<Vec<PathBuf>, AssetError> {
        let mut keys: Vec<String> = self
            .registry
            .ids()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect();
        for key in self.cache.asset_ids() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        self.resolved.clear();
        self.order.clear();

        let mut removed = Vec::new();
        for key in &keys {
            removed.extend(self.purge_key(key)?);
        }
        self.gc()?;
        Ok(removed)
    }

    /// Removes cached state no longer referenced by the index. Returns the
    /// number of orphans removed.
    pub fn gc(&self) -> Result<usize, AssetError> {
        self.cache.gc().map_err(|source| AssetError::PurgeFailed {
            asset: "*".to_string(),
            source,
        })
    }

    fn purge_key(&mut self, key: &str) -> Result<Vec<PathBuf>, AssetError> {
        let removed = self
            .cache
            .purge(key)
            .map_err(|source| AssetError::PurgeFailed {
                asset: key.to_string(),
                source,
            })?;
        for path in &removed {
            info!("Deleted {}", path.display());
        }
        Ok(removed)
    }

    fn forget(&mut self, id: AssetId) {
        self.resolved.remove(&id);
        self.order.retain(|o| *o != id);
    }

    /// Resolves `root` and any unresolved dependencies below it.
    fn run(&mut self, root: AssetId) -> Result<(), AssetError> {
        let mut stack = vec![self.enter(root)?];

        while let Some(top) = stack.last_mut() {
            if let Some(&dep) = top.dependencies.get(top.next) {
                top.next += 1;
                if self.resolved.contains_key(&dep) {
                    continue;
                }
                if let Some(pos) = stack.iter().position(|f| f.id == dep) {
                    let mut path: Vec<AssetId> = stack[pos..].iter().map(|f| f.id).collect();
                    path.push(dep);
                    return Err(unwind(&stack[..pos], AssetError::CycleDetected { path }));
                }
                match self.enter(dep) {
                    Ok(frame) => stack.push(frame),
                    Err(e) => return Err(unwind(&stack, e)),
                }
            } else {
                let Some(frame) = stack.pop() else { break };
                if let Err(e) = self.complete(frame) {
                    return Err(unwind(&stack, e));
                }
            }
        }
        Ok(())
    }

    fn enter(&self, id: AssetId) -> Result<Frame, AssetError> {
        let asset = self.registry.create(id)?;
        let dependencies = asset.dependencies();
        debug!("Visiting {} ({} dependencies)", id, dependencies.len());
        Ok(Frame {
            id,
            asset,
            dependencies,
            next: 0,
        })
    }

    /// Fingerprints a frame whose dependencies are all resolved, then either
    /// restores or generates it.
    fn complete(&mut self, frame: Frame) -> Result<(), AssetError> {
        let Frame {
            id,
            mut asset,
            dependencies,
            ..
        } = frame;

        let mut dep_fingerprints = Vec::with_capacity(dependencies.len());
        for dep in &dependencies {
            let resolved = self
                .resolved
                .get(dep)
                .ok_or(AssetError::MissingDependency {
                    asset: id,
                    requested: *dep,
                })?;
            dep_fingerprints.push(resolved.fingerprint);
        }
        let fingerprint = fingerprint::compute(
            id,
            asset.revision(),
            self.config.inputs.get(id),
            &dep_fingerprints,
        );

        let origin = if self.restore(id, fingerprint, asset.as_mut()) {
            Origin::Cached
        } else {
            self.generate(id, fingerprint, asset.as_mut(), &dependencies)?;
            Origin::Generated
        };

        self.resolved.insert(
            id,
            Resolved {
                asset,
                fingerprint,
                origin,
            },
        );
        self.order.push(id);
        Ok(())
    }

    /// Restores `asset` from the state cache. Returns `false` when the asset
    /// must be generated instead.
    fn restore(&self, id: AssetId, fingerprint: Fingerprint, asset: &mut dyn DynAsset) -> bool {
        let rejected = |source: CacheError| {
            warn!(
                "{}; regenerating",
                AssetError::CacheLoadFailed { asset: id, source }
            );
            false
        };

        match self.cache.lookup(id.as_str(), fingerprint) {
            Ok(Lookup::Hit(payload)) => match asset.restore_state(&payload) {
                Ok(()) => {
                    debug!("Reusing {} from {}", asset.name(), fingerprint);
                    true
                }
                Err(e) => rejected(CacheError::Serialization {
                    reason: e.to_string(),
                }),
            },
            Ok(Lookup::Stale { cached }) => {
                debug!("{} is out of date ({} -> {})", asset.name(), cached, fingerprint);
                false
            }
            Ok(Lookup::Absent) => false,
            Err(source) => rejected(source),
        }
    }

    fn generate(
        &mut self,
        id: AssetId,
        fingerprint: Fingerprint,
        asset: &mut dyn DynAsset,
        dependencies: &[AssetId],
    ) -> Result<(), AssetError> {
        info!("Generating {}...", asset.name());

        let parents = Parents::new(
            id,
            dependencies,
            &self.resolved,
            self.config.inputs.get(id),
        );
        let result = asset.generate(&parents);
        if let Some(requested) = parents.violation() {
            return Err(AssetError::MissingDependency {
                asset: id,
                requested,
            });
        }
        result.map_err(|source| AssetError::GenerationFailed { asset: id, source })?;

        let artifacts = asset.artifacts();
        persist::validate(id, &artifacts)?;
        let payload = asset
            .save_state()
            .map_err(|e| AssetError::PersistFailed {
                asset: id,
                source: CacheError::Serialization {
                    reason: e.to_string(),
                },
            })?;

        let records = persist::write_artifacts(
            self.cache.root(),
            id,
            &artifacts,
            self.cache.entry(id.as_str()),
        )?;
        self.cache
            .record(id.as_str(), fingerprint, &payload, records)
            .map_err(|source| AssetError::PersistFailed { asset: id, source })
    }
}

/// Wraps `error` in one [`AssetError::Dependency`] per frame, so the bottom
/// frame ends up outermost.
fn unwind(frames: &[Frame], error: AssetError) -> AssetError {
    frames
        .iter()
        .rev()
        .fold(error, |source, frame| AssetError::Dependency {
            asset: frame.id,
            source: Box::new(source),
        })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::asset::Artifact;
    use crate::error::GenerateError;

    thread_local! {
        static CALLS: RefCell<BTreeMap<&'static str, usize>> = RefCell::new(BTreeMap::new());
    }

    fn bump(id: AssetId) {
        CALLS.with(|c| *c.borrow_mut().entry(id.as_str()).or_default() += 1);
    }

    fn calls(id: AssetId) -> usize {
        CALLS.with(|c| c.borrow().get(id.as_str()).copied().unwrap_or(0))
    }

    fn reset() {
        CALLS.with(|c| c.borrow_mut().clear());
    }

    // Diamond: Top -> (Left, Right) -> Bottom.

    #[derive(Default, Serialize, Deserialize)]
    struct Bottom {
        value: String,
    }

    impl Asset for Bottom {
        const ID: AssetId = AssetId::new("bottom");
        fn name(&self) -> &str {
            "Bottom"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            Vec::new()
        }
        fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
            bump(Self::ID);
            self.value = match parents.input() {
                Some(input) => String::from_utf8(input.to_vec())?,
                None => "default".to_string(),
            };
            Ok(())
        }
    }

    #[derive(Default, Serialize, Deserialize)]
    struct Left {
        value: String,
    }

    impl Asset for Left {
        const ID: AssetId = AssetId::new("left");
        fn name(&self) -> &str {
            "Left"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            vec![Bottom::ID]
        }
        fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
            bump(Self::ID);
            self.value = format!("left({})", parents.get::<Bottom>()?.value);
            Ok(())
        }
        fn artifacts(&self) -> Vec<Artifact> {
            vec![Artifact::new("left.txt", self.value.clone())]
        }
    }

    #[derive(Default, Serialize, Deserialize)]
    struct Right {
        value: String,
    }

    impl Asset for Right {
        const ID: AssetId = AssetId::new("right");
        fn name(&self) -> &str {
            "Right"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            vec![Bottom::ID]
        }
        fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
            bump(Self::ID);
            self.value = format!("right({})", parents.get::<Bottom>()?.value);
            Ok(())
        }
    }

    #[derive(Default, Serialize, Deserialize)]
    struct Top {
        value: String,
    }

    impl Asset for Top {
        const ID: AssetId = AssetId::new("top");
        fn name(&self) -> &str {
            "Top"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            vec![Left::ID, Right::ID]
        }
        fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
            bump(Self::ID);
            let left = parents.get::<Left>()?;
            let right = parents.get::<Right>()?;
            self.value = format!("{}+{}", left.value, right.value);
            Ok(())
        }
        fn artifacts(&self) -> Vec<Artifact> {
            vec![Artifact::new("out/top.txt", self.value.clone())]
        }
    }

    // Cycle: Ping -> Pong -> Ping, reached through Entry.

    #[derive(Default, Serialize, Deserialize)]
    struct Entry;

    impl Asset for Entry {
        const ID: AssetId = AssetId::new("entry");
        fn name(&self) -> &str {
            "Entry"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            vec![Ping::ID]
        }
        fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), GenerateError> {
            Ok(())
        }
    }

    #[derive(Default, Serialize, Deserialize)]
    struct Ping;

    impl Asset for Ping {
        const ID: AssetId = AssetId::new("ping");
        fn name(&self) -> &str {
            "Ping"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            vec![Pong::ID]
        }
        fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), GenerateError> {
            bump(Self::ID);
            Ok(())
        }
    }

    #[derive(Default, Serialize, Deserialize)]
    struct Pong;

    impl Asset for Pong {
        const ID: AssetId = AssetId::new("pong");
        fn name(&self) -> &str {
            "Pong"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            vec![Ping::ID]
        }
        fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), GenerateError> {
            bump(Self::ID);
            Ok(())
        }
    }

    // Sneaky reads Bottom without declaring it.

    #[derive(Default, Serialize, Deserialize)]
    struct Sneaky;

    impl Asset for Sneaky {
        const ID: AssetId = AssetId::new("sneaky");
        fn name(&self) -> &str {
            "Sneaky"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            Vec::new()
        }
        fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
            // The failure is swallowed; the store still reports it.
            let _ = parents.get::<Bottom>();
            Ok(())
        }
    }

    #[derive(Default, Serialize, Deserialize)]
    struct Broken;

    impl Asset for Broken {
        const ID: AssetId = AssetId::new("broken");
        fn name(&self) -> &str {
            "Broken"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            Vec::new()
        }
        fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), GenerateError> {
            Err("no luck".into())
        }
    }

    #[derive(Default, Serialize, Deserialize)]
    struct NeedsBroken;

    impl Asset for NeedsBroken {
        const ID: AssetId = AssetId::new("needs-broken");
        fn name(&self) -> &str {
            "Needs Broken"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            vec![Bottom::ID, Broken::ID]
        }
        fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), GenerateError> {
            Ok(())
        }
    }

    #[derive(Default, Serialize, Deserialize)]
    struct Orphaned;

    impl Asset for Orphaned {
        const ID: AssetId = AssetId::new("orphaned");
        fn name(&self) -> &str {
            "Orphaned"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            vec![AssetId::new("nowhere")]
        }
        fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), GenerateError> {
            Ok(())
        }
    }

    #[derive(Default, Serialize, Deserialize)]
    struct Escapes;

    impl Asset for Escapes {
        const ID: AssetId = AssetId::new("escapes");
        fn name(&self) -> &str {
            "Escapes"
        }
        fn dependencies(&self) -> Vec<AssetId> {
            Vec::new()
        }
        fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), GenerateError> {
            Ok(())
        }
        fn artifacts(&self) -> Vec<Artifact> {
            vec![Artifact::new("../outside.txt", "x")]
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register::<Bottom>()
            .unwrap()
            .register::<Left>()
            .unwrap()
            .register::<Right>()
            .unwrap()
            .register::<Top>()
            .unwrap()
            .register::<Entry>()
            .unwrap()
            .register::<Ping>()
            .unwrap()
            .register::<Pong>()
            .unwrap()
            .register::<Sneaky>()
            .unwrap()
            .register::<Broken>()
            .unwrap()
            .register::<NeedsBroken>()
            .unwrap()
            .register::<Orphaned>()
            .unwrap()
            .register::<Escapes>()
            .unwrap();
        registry
    }

    fn open(dir: &Path) -> Store {
        Store::open(StoreConfig::new(dir, "0.1.0"), registry())
    }

    #[test]
    fn diamond_generates_each_asset_once() {
        reset();
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());

        let top = store.resolve::<Top>().unwrap();
        assert_eq!(top.value, "left(default)+right(default)");
        for id in [Bottom::ID, Left::ID, Right::ID, Top::ID] {
            assert_eq!(calls(id), 1, "{id}");
            assert_eq!(store.origin(id), Some(Origin::Generated));
        }
        assert_eq!(
            store.resolution_order(),
            &[Bottom::ID, Left::ID, Right::ID, Top::ID]
        );
    }

    #[test]
    fn resolving_again_in_one_store_is_memoized() {
        reset();
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());

        store.resolve::<Left>().unwrap();
        store.resolve::<Top>().unwrap();
        store.resolve::<Top>().unwrap();
        assert_eq!(calls(Bottom::ID), 1);
        assert_eq!(calls(Left::ID), 1);
        assert_eq!(calls(Top::ID), 1);
    }

    #[test]
    fn artifacts_are_written_under_the_directory() {
        reset();
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        store.resolve::<Top>().unwrap();

        let top = std::fs::read_to_string(dir.path().join("out/top.txt")).unwrap();
        assert_eq!(top, "left(default)+right(default)");
        let left = std::fs::read_to_string(dir.path().join("left.txt")).unwrap();
        assert_eq!(left, "left(default)");
        assert_eq!(store.cache_entry(Top::ID).unwrap().artifacts.len(), 1);
        assert!(store.cache_entry(Bottom::ID).unwrap().artifacts.is_empty());
    }

    #[test]
    fn second_store_reuses_cached_state() {
        reset();
        let dir = tempfile::tempdir().unwrap();
        let first = open(dir.path()).resolve::<Top>().unwrap().value.clone();

        reset();
        let mut store = open(dir.path());
        let second = store.resolve::<Top>().unwrap().value.clone();
        assert_eq!(first, second);
        for id in [Bottom::ID, Left::ID, Right::ID, Top::ID] {
            assert_eq!(calls(id), 0, "{id}");
            assert_eq!(store.origin(id), Some(Origin::Cached));
        }
    }

    #[test]
    fn changed_input_regenerates_dependents() {
        reset();
        let dir = tempfile::tempdir().unwrap();
        open(dir.path()).resolve::<Top>().unwrap();

        reset();
        let config = StoreConfig::new(dir.path(), "0.1.0").with_input(Bottom::ID, "custom");
        let mut store = Store::open(config, registry());
        let top = store.resolve::<Top>().unwrap();
        assert_eq!(top.value, "left(custom)+right(custom)");
        for id in [Bottom::ID, Left::ID, Right::ID, Top::ID] {
            assert_eq!(calls(id), 1, "{id}");
        }
    }

    #[test]
    fn new_tool_version_discards_cache() {
        reset();
        let dir = tempfile::tempdir().unwrap();
        open(dir.path()).resolve::<Left>().unwrap();

        reset();
        let mut store = Store::open(StoreConfig::new(dir.path(), "0.2.0"), registry());
        store.resolve::<Left>().unwrap();
        assert_eq!(calls(Left::ID), 1);
    }

    #[test]
    fn edited_artifact_is_regenerated() {
        reset();
        let dir = tempfile::tempdir().unwrap();
        open(dir.path()).resolve::<Left>().unwrap();
        std::fs::write(dir.path().join("left.txt"), "tampered").unwrap();

        reset();
        let mut store = open(dir.path());
        store.resolve::<Left>().unwrap();
        assert_eq!(calls(Bottom::ID), 0);
        assert_eq!(calls(Left::ID), 1);
        assert_eq!(store.origin(Left::ID), Some(Origin::Generated));
        let left = std::fs::read_to_string(dir.path().join("left.txt")).unwrap();
        assert_eq!(left, "left(default)");
    }

    #[test]
    fn cycle_reports_path() {
        reset();
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());

        let err = store.resolve::<Entry>().err().unwrap();
        match err.root_cause() {
            AssetError::CycleDetected { path } => {
                assert_eq!(path, &[Ping::ID, Pong::ID, Ping::ID]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.trace(), vec![Entry::ID]);
        assert_eq!(calls(Ping::ID), 0);
        assert_eq!(calls(Pong::ID), 0);
        assert!(store.origin(Entry::ID).is_none());
    }

    #[test]
    fn undeclared_access_is_reported_even_if_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        let err = store.resolve::<Sneaky>().err().unwrap();
        assert!(matches!(
            err,
            AssetError::MissingDependency { asset, requested }
                if asset == Sneaky::ID && requested == Bottom::ID
        ));
        assert!(store.cache_entry(Sneaky::ID).is_none());
    }

    #[test]
    fn failure_keeps_completed_siblings() {
        reset();
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());

        let err = store.resolve::<NeedsBroken>().err().unwrap();
        assert_eq!(err.trace(), vec![NeedsBroken::ID, Broken::ID]);
        assert!(matches!(
            err.root_cause(),
            AssetError::GenerationFailed { asset, .. } if *asset == Broken::ID
        ));
        assert_eq!(store.origin(Bottom::ID), Some(Origin::Generated));
        assert!(store.origin(NeedsBroken::ID).is_none());
        assert!(store.cache_entry(Bottom::ID).is_some());
        assert!(store.cache_entry(Broken::ID).is_none());

        // Bottom is not generated again when resolved later.
        store.resolve::<Left>().unwrap();
        assert_eq!(calls(Bottom::ID), 1);
    }

    #[test]
    fn unregistered_dependency_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        let err = store.resolve::<Orphaned>().err().unwrap();
        assert_eq!(err.trace(), vec![Orphaned::ID, AssetId::new("nowhere")]);
        assert!(matches!(
            err.root_cause(),
            AssetError::UnregisteredAsset { .. }
        ));
    }

    #[test]
    fn escaping_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        let err = store.resolve::<Escapes>().err().unwrap();
        assert!(matches!(err, AssetError::InvalidArtifact { .. }));
        assert!(store.cache_entry(Escapes::ID).is_none());
    }

    #[test]
    fn purge_removes_files_and_state() {
        reset();
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        store.resolve::<Top>().unwrap();

        let removed = store.purge(Top::ID).unwrap();
        assert_eq!(removed, vec![dir.path().join("out/top.txt")]);
        assert!(!dir.path().join("out").exists());
        assert!(store.origin(Top::ID).is_none());
        assert!(store.cache_entry(Top::ID).is_none());

        reset();
        store.resolve::<Top>().unwrap();
        assert_eq!(calls(Top::ID), 1);
        assert_eq!(calls(Left::ID), 0);
    }

    #[test]
    fn purge_all_empties_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        store.resolve::<Top>().unwrap();

        let removed = store.purge_all().unwrap();
        assert_eq!(removed.len(), 2);
        assert!(store.resolution_order().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
