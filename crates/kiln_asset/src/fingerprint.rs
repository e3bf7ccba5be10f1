//! Input fingerprints chaining each asset to its dependencies.
//!
//! An asset's fingerprint covers its identity, its producer revision, its
//! external input (if any), and the fingerprints of its dependencies in
//! declaration order. Because dependency fingerprints are folded in, a change
//! to any upstream input changes the fingerprint of every asset downstream of
//! it while leaving unrelated subgraphs untouched.

use kiln_common::{AssetId, Fingerprint, FingerprintBuilder};

/// Domain tag separating asset fingerprints from other uses of the hash.
const DOMAIN: &str = "kiln-asset-v1";

/// Computes the input fingerprint of an asset.
pub fn compute(
    id: AssetId,
    revision: u32,
    input: Option<&[u8]>,
    dependencies: &[Fingerprint],
) -> Fingerprint {
    let mut builder = FingerprintBuilder::new()
        .str(DOMAIN)
        .str(id.as_str())
        .u32(revision)
        .optional(input)
        .u32(dependencies.len() as u32);
    for dep in dependencies {
        builder = builder.fingerprint(dep);
    }
    builder.finish()
}
