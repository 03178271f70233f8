//! Configuration file structures for ffi-bridge.
//!
//! This module defines structures for TOML configuration files:
//! - [`ConfigFile`]: Top-level configuration file structure
//! - [`LibraryEntry`]: The wrapped library to load

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::RuntimeConfig;

/// Top-level configuration file structure.
///
/// # Example
///
/// ```toml
/// [runtime.engine]
/// pooling_allocator = false
///
/// [runtime.limits]
/// max_memory_mb = 128
///
/// [runtime.abi]
/// alloc_export = "diplomat_alloc"
///
/// [library]
/// id = "icu4x"
/// path = "./lib/icu_capi.wasm"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Runtime configuration (engine, limits, ABI names).
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Library to load at startup.
    #[serde(default)]
    pub library: Option<LibraryEntry>,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigFileError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        debug!(path = %path.as_ref().display(), "Config file read");

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed as TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        toml::from_str(content).map_err(|e| ConfigFileError::Parse {
            message: e.to_string(),
        })
    }
}

/// The wrapped library to load.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryEntry {
    /// Identifier used in tracing output.
    #[serde(default = "defaults::library_id")]
    pub id: String,

    /// Path to the WebAssembly module file (`.wasm` or `.wat`).
    pub path: String,
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse config file: {message}")]
    Parse { message: String },
}

/// Default value functions for serde.
mod defaults {
    pub fn library_id() -> String {
        "library".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();

        assert!(config.library.is_none());
        assert_eq!(config.runtime.abi.alloc_export, "diplomat_alloc");
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [library]
            path = "./icu_capi.wasm"
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        let library = config.library.unwrap();
        assert_eq!(library.path, "./icu_capi.wasm");
        // Defaults applied
        assert_eq!(library.id, "library");
        assert_eq!(config.runtime.limits.max_memory_mb, 256);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [runtime.engine]
            pooling_allocator = true
            max_instances = 8

            [runtime.limits]
            max_memory_mb = 32

            [runtime.abi]
            memory_export = "mem"
            alloc_export = "lib_alloc"
            free_export = "lib_free"

            [library]
            id = "icu4x"
            path = "./lib/icu_capi.wasm"
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert!(config.runtime.engine.pooling_allocator);
        assert_eq!(config.runtime.engine.max_instances, 8);
        assert_eq!(config.runtime.limits.max_memory_mb, 32);
        assert_eq!(config.runtime.abi.memory_export, "mem");
        assert_eq!(config.runtime.abi.alloc_export, "lib_alloc");
        assert_eq!(config.runtime.abi.free_export, "lib_free");
        assert_eq!(
            config.runtime.abi.write_len_export,
            "diplomat_buffer_write_len"
        );

        let library = config.library.unwrap();
        assert_eq!(library.id, "icu4x");
        assert_eq!(library.path, "./lib/icu_capi.wasm");
    }

    #[test]
    fn test_parse_invalid_toml() {
        let invalid = "this is not valid toml [";
        let result = ConfigFile::from_toml(invalid);
        assert!(matches!(result, Err(ConfigFileError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigFile::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigFileError::Io { .. })));
    }
}
