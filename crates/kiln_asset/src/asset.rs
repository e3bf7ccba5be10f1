//! The contract every asset producer implements.

use std::any::Any;

use kiln_common::AssetId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GenerateError;
use crate::parents::Parents;

/// A file an asset wants persisted into the asset directory.
///
/// `name` is a `/`-separated path relative to the asset directory. Names must
/// be unique within the set one asset returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Path relative to the asset directory.
    pub name: String,
    /// File contents.
    pub data: Vec<u8>,
    /// Unix permission bits.
    pub mode: u32,
}

impl Artifact {
    /// Default permission bits for artifacts.
    pub const DEFAULT_MODE: u32 = 0o644;

    /// Permission bits for artifacts holding secrets.
    pub const PRIVATE_MODE: u32 = 0o600;

    /// Creates an artifact with [`Artifact::DEFAULT_MODE`].
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            mode: Self::DEFAULT_MODE,
        }
    }

    /// Overrides the permission bits.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }
}

/// A unit of generated state in the asset graph.
///
/// The implementing type is its own state: after a successful
/// [`generate`](Asset::generate) it is serialized into the state cache, and on
/// a later run with the same input fingerprint a fresh value is deserialized
/// in place of generating again. Generation must therefore be deterministic
/// given the same dependency states and external input, and must not touch
/// the filesystem; files go through [`artifacts`](Asset::artifacts).
pub trait Asset: Serialize + DeserializeOwned + Default + Send + 'static {
    /// Stable identity, used as the memoization and cache key.
    const ID: AssetId;

    /// Producer revision mixed into the fingerprint. Bump it when the
    /// generated output changes for the same inputs.
    const REVISION: u32 = 0;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Identities of the assets that must be resolved before this one.
    ///
    /// Consulted once per run; the order is part of the fingerprint but
    /// carries no priority.
    fn dependencies(&self) -> Vec<AssetId>;

    /// Computes this asset's state from its resolved dependencies.
    fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError>;

    /// Files to persist. Only called after generation or a cache restore.
    fn artifacts(&self) -> Vec<Artifact> {
        Vec::new()
    }
}

/// Object-safe view of an [`Asset`], used by the store to hold heterogeneous
/// producers. Implemented for every `Asset`.
pub trait DynAsset: Send {
    /// See [`Asset::ID`].
    fn id(&self) -> AssetId;

    /// See [`Asset::REVISION`].
    fn revision(&self) -> u32;

    /// See [`Asset::name`].
    fn name(&self) -> &str;

    /// See [`Asset::dependencies`].
    fn dependencies(&self) -> Vec<AssetId>;

    /// See [`Asset::generate`].
    fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError>;

    /// See [`Asset::artifacts`].
    fn artifacts(&self) -> Vec<Artifact>;

    /// Serializes the asset's state for the cache.
    fn save_state(&self) -> Result<Vec<u8>, serde_json::Error>;

    /// Replaces the asset's state with a previously saved one.
    fn restore_state(&mut self, data: &[u8]) -> Result<(), serde_json::Error>;

    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Asset> DynAsset for T {
    fn id(&self) -> AssetId {
        T::ID
    }

    fn revision(&self) -> u32 {
        T::REVISION
    }

    fn name(&self) -> &str {
        Asset::name(self)
    }

    fn dependencies(&self) -> Vec<AssetId> {
        Asset::dependencies(self)
    }

    fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
        Asset::generate(self, parents)
    }

    fn artifacts(&self) -> Vec<Artifact> {
        Asset::artifacts(self)
    }

    fn save_state(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn restore_state(&mut self, data: &[u8]) -> Result<(), serde_json::Error> {
        *self = serde_json::from_slice(data)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
