//! Stable identities for asset producers.

use std::fmt;

/// The stable identity of an asset producer.
///
/// Used as the memoization key within a run and as the on-disk cache key
/// across runs, so it must not change between releases unless the cached
/// state should be abandoned. Identities are lowercase ASCII alphanumerics
/// and `-`; [`AssetId::is_valid`] checks this.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(&'static str);

impl AssetId {
    /// Creates an identity from a static string.
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    /// Returns the identity string.
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Returns `true` if the identity is non-empty and only uses `[a-z0-9-]`.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}
