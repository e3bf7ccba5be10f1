//! Shared foundational types used across the kiln asset generator.
//!
//! This crate provides the content [`Fingerprint`] used for cache validity and
//! the stable [`AssetId`] that names every producer in the asset graph.

#![warn(missing_docs)]

pub mod hash;
pub mod id;

pub use hash::{Fingerprint, FingerprintBuilder, ParseFingerprintError};
pub use id::AssetId;
