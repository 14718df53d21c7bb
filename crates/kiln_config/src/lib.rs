//! Parsing and validation of `kiln.toml` configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`KilnConfig`] describing the local compiler, the optional remote compilation
//! service, the scratch cache location, import search paths, and metadata
//! stripping overrides.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, load_config_or_default, CONFIG_FILE};
pub use types::*;
