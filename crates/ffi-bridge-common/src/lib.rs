//! Common types, errors, and configuration for ffi-bridge.
//!
//! This crate provides shared functionality used across the ffi-bridge workspace:
//! - Error types using `thiserror` for the marshaling error taxonomy
//! - Configuration structures for the engine, store limits, and ABI symbol names
//! - TOML configuration file loading

pub mod config;
pub mod config_file;
pub mod error;

pub use config::{AbiConfig, EngineConfig, LimitsConfig, RuntimeConfig};
pub use config_file::{ConfigFile, ConfigFileError, LibraryEntry};
pub use error::RuntimeError;
