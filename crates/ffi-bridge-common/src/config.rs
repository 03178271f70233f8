//! Configuration structures for ffi-bridge.
//!
//! This module defines configuration options for various components:
//! - [`RuntimeConfig`]: Top-level configuration containing all settings
//! - [`EngineConfig`]: Wasmtime engine settings (pooling, caching)
//! - [`LimitsConfig`]: Per-library store limits (linear memory ceiling)
//! - [`AbiConfig`]: Names of the runtime exports every wrapped library provides

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
///
/// It can be loaded from files (TOML, JSON) or built in code.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Wasmtime engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-library resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Runtime export names of the wrapped library.
    #[serde(default)]
    pub abi: AbiConfig,
}

/// Wasmtime engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Enable pooling allocator for instance creation.
    ///
    /// Useful when many library instances are created, e.g. one per worker.
    #[serde(default = "defaults::pooling_allocator")]
    pub pooling_allocator: bool,

    /// Maximum concurrent instances in the pool.
    ///
    /// Only effective when `pooling_allocator` is enabled.
    #[serde(default = "defaults::max_instances")]
    pub max_instances: u32,

    /// Memory per instance slot in megabytes.
    ///
    /// Only effective when `pooling_allocator` is enabled.
    #[serde(default = "defaults::instance_memory_mb")]
    pub instance_memory_mb: u32,

    /// Enable caching of compiled modules.
    #[serde(default = "defaults::cache_compiled_modules")]
    pub cache_compiled_modules: bool,

    /// Path to a Wasmtime cache configuration file.
    ///
    /// The default Wasmtime cache settings apply when unset. Only effective
    /// when `cache_compiled_modules` is enabled.
    #[serde(default)]
    pub cache_config: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pooling_allocator: defaults::pooling_allocator(),
            max_instances: defaults::max_instances(),
            instance_memory_mb: defaults::instance_memory_mb(),
            cache_compiled_modules: defaults::cache_compiled_modules(),
            cache_config: None,
        }
    }
}

/// Per-library store limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Maximum linear memory in megabytes.
    ///
    /// Growth beyond this limit fails inside the foreign allocator, which
    /// surfaces to the host as an out-of-foreign-memory error.
    #[serde(default = "defaults::max_memory_mb")]
    pub max_memory_mb: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: defaults::max_memory_mb(),
        }
    }
}

impl LimitsConfig {
    /// Get the memory ceiling in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        (self.max_memory_mb as usize) * 1024 * 1024
    }
}

/// Names of the runtime exports a wrapped library provides.
///
/// The defaults match libraries generated with the diplomat toolchain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AbiConfig {
    /// Exported linear memory.
    #[serde(default = "defaults::memory_export")]
    pub memory_export: String,

    /// `alloc(size: i32, align: i32) -> i32`.
    #[serde(default = "defaults::alloc_export")]
    pub alloc_export: String,

    /// `free(ptr: i32, size: i32, align: i32)`.
    #[serde(default = "defaults::free_export")]
    pub free_export: String,

    /// `write_create(capacity: i32) -> i32`.
    #[serde(default = "defaults::write_create_export")]
    pub write_create_export: String,

    /// `write_get_bytes(write: i32) -> i32`.
    #[serde(default = "defaults::write_bytes_export")]
    pub write_bytes_export: String,

    /// `write_len(write: i32) -> i32`.
    #[serde(default = "defaults::write_len_export")]
    pub write_len_export: String,

    /// `write_destroy(write: i32)`.
    #[serde(default = "defaults::write_destroy_export")]
    pub write_destroy_export: String,
}

impl Default for AbiConfig {
    fn default() -> Self {
        Self {
            memory_export: defaults::memory_export(),
            alloc_export: defaults::alloc_export(),
            free_export: defaults::free_export(),
            write_create_export: defaults::write_create_export(),
            write_bytes_export: defaults::write_bytes_export(),
            write_len_export: defaults::write_len_export(),
            write_destroy_export: defaults::write_destroy_export(),
        }
    }
}

/// Default value functions for serde.
mod defaults {
    pub const fn pooling_allocator() -> bool {
        false
    }

    pub const fn max_instances() -> u32 {
        100
    }

    pub const fn instance_memory_mb() -> u32 {
        64
    }

    pub const fn cache_compiled_modules() -> bool {
        false
    }

    pub const fn max_memory_mb() -> u32 {
        256
    }

    pub fn memory_export() -> String {
        "memory".to_string()
    }

    pub fn alloc_export() -> String {
        "diplomat_alloc".to_string()
    }

    pub fn free_export() -> String {
        "diplomat_free".to_string()
    }

    pub fn write_create_export() -> String {
        "diplomat_buffer_write_create".to_string()
    }

    pub fn write_bytes_export() -> String {
        "diplomat_buffer_write_get_bytes".to_string()
    }

    pub fn write_len_export() -> String {
        "diplomat_buffer_write_len".to_string()
    }

    pub fn write_destroy_export() -> String {
        "diplomat_buffer_write_destroy".to_string()
    }
}
