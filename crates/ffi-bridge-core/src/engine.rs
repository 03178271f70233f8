//! Wasmtime engine configuration and creation.
//!
//! The [`BridgeEngine`] compiles wrapped libraries and is shared by every
//! library instance created from it. Foreign calls are synchronous and run
//! to completion, so neither async support nor fuel metering is enabled.

use std::sync::Arc;

use tracing::{debug, info};
use wasmtime::{Config, Engine, InstanceAllocationStrategy, PoolingAllocationConfig};

use ffi_bridge_common::{EngineConfig, RuntimeError};

/// Thread-safe WebAssembly engine wrapper.
///
/// # Configuration
///
/// - **Pooling Allocator**: Pre-allocates instance slots, useful when one
///   library instance is created per worker thread
/// - **Module Cache**: Optional on-disk cache of compiled code
///
/// # Example
///
/// ```ignore
/// use ffi_bridge_common::EngineConfig;
/// use ffi_bridge_core::BridgeEngine;
///
/// let engine = BridgeEngine::new(&EngineConfig::default())?;
/// ```
#[derive(Clone)]
pub struct BridgeEngine {
    engine: Arc<Engine>,
    config: EngineConfig,
}

impl BridgeEngine {
    /// Create a new engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The Wasmtime configuration is invalid
    /// - The pooling allocator cannot be initialized
    /// - Cache configuration fails
    pub fn new(config: &EngineConfig) -> Result<Self, RuntimeError> {
        let mut wasmtime_config = Config::new();

        wasmtime_config.cranelift_opt_level(wasmtime::OptLevel::Speed);

        if config.pooling_allocator {
            let pooling_config = Self::create_pooling_config(config);

            wasmtime_config
                .allocation_strategy(InstanceAllocationStrategy::Pooling(pooling_config));

            info!(
                max_instances = config.max_instances,
                instance_memory_mb = config.instance_memory_mb,
                "Pooling allocator enabled"
            );
        }

        if config.cache_compiled_modules {
            let loaded = match &config.cache_config {
                Some(path) => {
                    debug!(cache_config = %path, "Module caching configured");
                    wasmtime_config.cache_config_load(path)
                }
                None => {
                    debug!("Module caching configured with default settings");
                    wasmtime_config.cache_config_load_default()
                }
            };

            loaded.map_err(|e| {
                RuntimeError::invalid_config(format!("Failed to load cache config: {e}"))
            })?;
        }

        let engine = Engine::new(&wasmtime_config).map_err(|e| {
            RuntimeError::invalid_config(format!("Failed to create Wasmtime engine: {e}"))
        })?;

        info!("Wasmtime engine initialized");

        Ok(Self {
            engine: Arc::new(engine),
            config: config.clone(),
        })
    }

    /// Create pooling allocation configuration.
    fn create_pooling_config(config: &EngineConfig) -> PoolingAllocationConfig {
        let mut pooling = PoolingAllocationConfig::default();

        pooling.total_core_instances(config.max_instances);
        pooling.total_memories(config.max_instances);
        pooling.total_tables(config.max_instances);

        let max_memory_bytes = (config.instance_memory_mb as usize) * 1024 * 1024;
        pooling.max_memory_size(max_memory_bytes);

        pooling
    }

    /// Get a reference to the inner Wasmtime engine.
    pub fn inner(&self) -> &Engine {
        &self.engine
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check if the pooling allocator is enabled.
    pub fn is_pooling_enabled(&self) -> bool {
        self.config.pooling_allocator
    }
}

impl std::fmt::Debug for BridgeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeEngine")
            .field("pooling_allocator", &self.config.pooling_allocator)
            .field("max_instances", &self.config.max_instances)
            .field("cache_compiled_modules", &self.config.cache_compiled_modules)
            .finish_non_exhaustive()
    }
}
