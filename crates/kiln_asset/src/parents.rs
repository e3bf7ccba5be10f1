//! Read-only access to an asset's resolved dependencies.

use std::cell::Cell;
use std::collections::HashMap;

use kiln_common::AssetId;

use crate::asset::{Asset, DynAsset};
use crate::error::AssetError;
use crate::store::Resolved;

/// The dependency view handed to [`Asset::generate`].
///
/// Only the dependencies the asset declared are visible; asking for anything
/// else fails with [`AssetError::MissingDependency`], and the store reports
/// that error instead of the producer's own once generation returns. A
/// `Parents` lives for exactly one generation call.
pub struct Parents<'a> {
    /// The asset being generated.
    owner: AssetId,
    /// What the owner declared.
    declared: &'a [AssetId],
    /// Everything resolved so far in this run.
    resolved: &'a HashMap<AssetId, Resolved>,
    /// Caller-supplied external input for the owner.
    input: Option<&'a [u8]>,
    /// First undeclared identity the owner asked for.
    violation: Cell<Option<AssetId>>,
}

impl<'a> Parents<'a> {
    pub(crate) fn new(
        owner: AssetId,
        declared: &'a [AssetId],
        resolved: &'a HashMap<AssetId, Resolved>,
        input: Option<&'a [u8]>,
    ) -> Self {
        Self {
            owner,
            declared,
            resolved,
            input,
            violation: Cell::new(None),
        }
    }

    /// Returns the resolved dependency of type `T`.
    pub fn get<T: Asset>(&self) -> Result<&'a T, AssetError> {
        self.get_dyn(T::ID)?
            .as_any()
            .downcast_ref::<T>()
            .ok_or(AssetError::TypeMismatch { id: T::ID })
    }

    /// Returns the resolved dependency with identity `id`.
    pub fn get_dyn(&self, id: AssetId) -> Result<&'a dyn DynAsset, AssetError> {
        let missing = || AssetError::MissingDependency {
            asset: self.owner,
            requested: id,
        };
        if !self.declared.contains(&id) {
            if self.violation.get().is_none() {
                self.violation.set(Some(id));
            }
            return Err(missing());
        }
        self.resolved
            .get(&id)
            .map(|r| r.asset.as_ref())
            .ok_or_else(missing)
    }

    /// Returns the external input supplied for the asset being generated.
    pub fn input(&self) -> Option<&'a [u8]> {
        self.input
    }

    /// Returns the identity of the asset being generated.
    pub fn owner(&self) -> AssetId {
        self.owner
    }

    pub(crate) fn violation(&self) -> Option<AssetId> {
        self.violation.get()
    }
}
