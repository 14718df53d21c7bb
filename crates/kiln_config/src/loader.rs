//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::KilnConfig;
use std::path::Path;

/// Name of the configuration file within a project directory.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Loads and validates a `kiln.toml` configuration from a project directory.
///
/// Reads `<project_dir>/kiln.toml`, parses it, and validates its values.
pub fn load_config(project_dir: &Path) -> Result<KilnConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Loads `<project_dir>/kiln.toml`, or the default configuration when the
/// file does not exist. Any other failure is still an error.
pub fn load_config_or_default(project_dir: &Path) -> Result<KilnConfig, ConfigError> {
    if project_dir.join(CONFIG_FILE).is_file() {
        load_config(project_dir)
    } else {
        Ok(KilnConfig::default())
    }
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigError> {
    let config: KilnConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are usable.
fn validate_config(config: &KilnConfig) -> Result<(), ConfigError> {
    if config.compiler.binary.trim().is_empty() {
        return Err(ConfigError::MissingField("compiler.binary".to_string()));
    }
    if config.compiler.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "compiler.timeout_secs must be positive".to_string(),
        ));
    }
    if config.cache.scratch_dir.trim().is_empty() {
        return Err(ConfigError::MissingField("cache.scratch_dir".to_string()));
    }

    if let Some(remote) = &config.remote {
        if remote.url.is_empty() {
            return Err(ConfigError::MissingField("remote.url".to_string()));
        }
        if !(remote.url.starts_with("http://") || remote.url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "remote.url must be an http(s) URL, got '{}'",
                remote.url
            )));
        }
        if remote.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "remote.timeout_secs must be positive".to_string(),
            ));
        }
    }

    for rule in &config.metadata.strip {
        semver::VersionReq::parse(&rule.versions).map_err(|e| {
            ConfigError::ValidationError(format!(
                "metadata.strip versions '{}': {e}",
                rule.versions
            ))
        })?;
        if rule.hex_len % 2 != 0 {
            return Err(ConfigError::ValidationError(format!(
                "metadata.strip hex_len must be even, got {}",
                rule.hex_len
            )));
        }
    }
    Ok(())
}
