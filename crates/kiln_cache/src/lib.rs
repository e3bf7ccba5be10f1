//! On-disk state cache for incremental asset generation.
//!
//! This crate owns the reserved state directory inside an asset directory:
//! a JSON index recording each asset's fingerprint and persisted files, and a
//! store of validated state payloads. All reads are fail-safe from the
//! caller's point of view: any problem is reported as an error the resolver
//! treats as a cache miss.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod fs;
pub mod index;
pub mod payload;

pub use cache::{Lookup, StateCache, STATE_DIR};
pub use error::CacheError;
pub use index::{ArtifactRecord, IndexEntry, StateIndex};
pub use payload::PayloadStore;
