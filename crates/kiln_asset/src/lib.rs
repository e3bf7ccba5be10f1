//! Asset dependency resolution and incremental generation.
//!
//! An [`Asset`] is a typed producer that declares the assets it depends on and
//! generates its own state, and optionally files ([`Artifact`]s), from their
//! resolved values. The [`Store`] resolves a requested asset's dependency graph
//! depth-first, generating every asset at most once per run, reusing state
//! cached on disk by earlier runs when its input [`Fingerprint`] is unchanged,
//! and persisting artifacts into the asset directory.
//!
//! ```no_run
//! use kiln_asset::{Asset, AssetId, GenerateError, Parents, Registry, Store, StoreConfig};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Greeting {
//!     text: String,
//! }
//!
//! impl Asset for Greeting {
//!     const ID: AssetId = AssetId::new("greeting");
//!
//!     fn name(&self) -> &str {
//!         "Greeting"
//!     }
//!
//!     fn dependencies(&self) -> Vec<AssetId> {
//!         Vec::new()
//!     }
//!
//!     fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), GenerateError> {
//!         self.text = "hello".to_string();
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), kiln_asset::AssetError> {
//! let mut registry = Registry::new();
//! registry.register::<Greeting>()?;
//! let mut store = Store::open(StoreConfig::new("assets", "0.1.0"), registry);
//! assert_eq!(store.resolve::<Greeting>()?.text, "hello");
//! # Ok(()) }
//! ```
//!
//! [`Fingerprint`]: kiln_common::Fingerprint

#![warn(missing_docs)]

pub mod asset;
pub mod error;
pub mod fingerprint;
pub mod parents;
mod persist;
pub mod registry;
pub mod store;

pub use asset::{Artifact, Asset, DynAsset};
pub use error::{AssetError, GenerateError};
pub use kiln_common::{AssetId, Fingerprint};
pub use parents::Parents;
pub use registry::Registry;
pub use store::{Inputs, Origin, Store, StoreConfig};
