//! Parsing and validation of `install-config.toml`.
//!
//! This crate reads the user-supplied cluster description and produces a
//! strongly-typed [`InstallConfig`] with defaults applied and invalid values
//! rejected before any asset is generated from it.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_install_config, load_install_config_from_str, INSTALL_CONFIG_FILE};
pub use types::*;
