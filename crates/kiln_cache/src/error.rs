//! Error types for state cache operations.

use std::path::PathBuf;

/// Errors that can occur during state cache operations.
///
/// Read-side errors are recoverable: the resolver logs them and regenerates
/// the asset. Write-side errors are fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The state index could not be parsed as valid JSON.
    #[error("failed to parse state index: {reason}")]
    IndexParse {
        /// Description of the parse failure.
        reason: String,
    },

    /// A payload file has an invalid or missing header.
    #[error("invalid state header in {path}: {reason}")]
    InvalidHeader {
        /// The payload file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The stored checksum does not match the computed checksum of the payload.
    #[error("checksum mismatch in {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The payload file path.
        path: PathBuf,
        /// The expected checksum.
        expected: String,
        /// The checksum computed from the bytes on disk.
        actual: String,
    },

    /// The payload format version does not match the current version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The payload file path.
        path: PathBuf,
        /// The expected format version.
        expected: u32,
        /// The format version found in the file.
        actual: u32,
    },

    /// The payload header belongs to a different asset or fingerprint.
    #[error("inconsistent state in {path}: {reason}")]
    Inconsistent {
        /// The payload file path.
        path: PathBuf,
        /// Which header field disagreed with the index.
        reason: String,
    },

    /// A file recorded by a previous generation no longer exists.
    #[error("recorded file {path} is missing")]
    MissingArtifact {
        /// The missing file.
        path: PathBuf,
    },

    /// A file recorded by a previous generation was changed on disk.
    #[error("recorded file {path} was modified since it was written")]
    ModifiedArtifact {
        /// The modified file.
        path: PathBuf,
    },

    /// A file recorded by a previous generation has different permissions.
    #[error("recorded file {path} has mode {actual:o}, expected {expected:o}")]
    ModeChanged {
        /// The file whose permissions changed.
        path: PathBuf,
        /// The permission bits it was written with.
        expected: u32,
        /// The permission bits found on disk.
        actual: u32,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
