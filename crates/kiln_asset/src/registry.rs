//! Registry mapping asset identities to producer types.
//!
//! The store only ever sees identities: an asset's dependencies are listed by
//! [`AssetId`], so every identity reachable from a resolution target must be
//! registered before resolving it.

use std::any::TypeId;
use std::collections::BTreeMap;

use kiln_common::AssetId;

use crate::asset::{Asset, DynAsset};
use crate::error::AssetError;

/// Constructs a fresh, ungenerated instance of a producer.
type Factory = fn() -> Box<dyn DynAsset>;

struct Registration {
    type_id: TypeId,
    factory: Factory,
}

fn instantiate<T: Asset>() -> Box<dyn DynAsset> {
    Box::<T>::default()
}

/// Registry of every asset type known to a store.
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<AssetId, Registration>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers producer type `T` under [`Asset::ID`].
    ///
    /// Registering the same type twice is a no-op; registering a different
    /// type under an existing identity fails.
    pub fn register<T: Asset>(&mut self) -> Result<&mut Self, AssetError> {
        if !T::ID.is_valid() {
            return Err(AssetError::InvalidAssetId { id: T::ID });
        }
        if let Some(existing) = self.entries.get(&T::ID) {
            if existing.type_id != TypeId::of::<T>() {
                return Err(AssetError::DuplicateAsset { id: T::ID });
            }
            return Ok(self);
        }
        self.entries.insert(
            T::ID,
            Registration {
                type_id: TypeId::of::<T>(),
                factory: instantiate::<T>,
            },
        );
        Ok(self)
    }

    /// Returns `true` if `id` is registered.
    pub fn contains(&self, id: AssetId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Creates a fresh instance of the asset registered under `id`.
    pub fn create(&self, id: AssetId) -> Result<Box<dyn DynAsset>, AssetError> {
        self.entries
            .get(&id)
            .map(|r| (r.factory)())
            .ok_or(AssetError::UnregisteredAsset { id })
    }

    /// Returns all registered identities, sorted.
    pub fn ids(&self) -> Vec<AssetId> {
        self.entries.keys().copied().collect()
    }

    /// Returns every `(asset, dependency)` edge declared by registered assets,
    /// in identity order and then declaration order.
    pub fn dependency_edges(&self) -> Vec<(AssetId, AssetId)> {
        self.entries
            .iter()
            .flat_map(|(id, r)| {
                (r.factory)()
                    .dependencies()
                    .into_iter()
                    .map(move |dep| (*id, dep))
            })
            .collect()
    }

    /// Returns the display name of the asset registered under `id`.
    pub fn name_of(&self, id: AssetId) -> Option<String> {
        self.entries
            .get(&id)
            .map(|r| (r.factory)().name().to_string())
    }
}
