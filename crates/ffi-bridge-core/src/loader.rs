//! Library instantiation.
//!
//! [`LibraryLoader`] links host functions into compiled library modules and
//! instantiates them:
//!
//! 1. Create a store with the configured limits
//! 2. Instantiate the module against the linker
//! 3. Bind the runtime exports into a [`ForeignLibrary`]

use std::path::Path;
use std::time::Instant;

use tracing::{info, instrument};
use wasmtime::Linker;

use crate::library::ForeignLibrary;
use crate::store::{LibraryContext, create_store};
use crate::{BridgeEngine, CompiledModule};
use ffi_bridge_common::{RuntimeConfig, RuntimeError};

/// Instantiates compiled libraries.
///
/// The loader is reusable: one compiled module can be loaded any number of
/// times, each load producing an isolated instance with its own memory.
pub struct LibraryLoader {
    engine: BridgeEngine,
    linker: Linker<LibraryContext>,
    config: RuntimeConfig,
}

impl LibraryLoader {
    /// Create a loader with an empty linker.
    pub fn new(engine: BridgeEngine, config: RuntimeConfig) -> Self {
        let linker = Linker::new(engine.inner());

        Self {
            engine,
            linker,
            config,
        }
    }

    /// Get a mutable reference to the linker.
    ///
    /// Use this to register host functions before loading.
    pub fn linker_mut(&mut self) -> &mut Linker<LibraryContext> {
        &mut self.linker
    }

    /// Get the engine.
    pub fn engine(&self) -> &BridgeEngine {
        &self.engine
    }

    /// Get the runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Compile a library module with this loader's engine.
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompiledModule, RuntimeError> {
        CompiledModule::from_file(self.engine.inner(), path)
    }

    /// Instantiate `module` as library `library_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Instantiation fails (unresolved imports, start function trap)
    /// - The memory or allocator exports are missing
    #[instrument(skip(self, module), fields(content_hash = %module.content_hash()))]
    pub fn load(&self, module: &CompiledModule, library_id: &str) -> Result<ForeignLibrary, RuntimeError> {
        let start = Instant::now();

        let mut store = create_store(
            &self.engine,
            &self.config.limits,
            library_id,
            self.config.abi.memory_export.as_str(),
        )?;

        let instance = self
            .linker
            .instantiate(&mut store, module.as_module())
            .map_err(|e| RuntimeError::compilation_failed(format!("Instantiation failed: {e:#}")))?;

        let library = ForeignLibrary::new(store, instance, self.config.abi.clone())?;

        info!(
            library_id,
            duration_us = start.elapsed().as_micros(),
            "Library instantiated"
        );

        Ok(library)
    }
}

impl std::fmt::Debug for LibraryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryLoader")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
