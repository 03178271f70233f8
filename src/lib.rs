//! ffi-bridge: call into native libraries compiled to WebAssembly.
//!
//! This crate re-exports the workspace and adds the glue most hosts need:
//!
//! - [`telemetry`]: Tracing subscriber installation
//! - [`load_library`]: Engine, host functions and instantiation in one call
//! - [`bindings`]: Typed wrappers over the wrapped library's exports
//!
//! # Example
//!
//! ```ignore
//! use ffi_bridge::{ConfigFile, bindings::{ComposingNormalizer, DataProvider}};
//!
//! ffi_bridge::telemetry::init();
//!
//! let config = ConfigFile::from_file("ffi-bridge.toml")?;
//! let mut library = ffi_bridge::load_library(&config)?;
//!
//! let provider = DataProvider::compiled(&mut library)?;
//! let nfc = ComposingNormalizer::create_nfc(&mut library, &provider)?;
//! assert_eq!(nfc.normalize(&mut library, "cafe\u{301}")?, "café");
//! ```

pub mod telemetry;

pub use ffi_bridge_bindings as bindings;

pub use ffi_bridge_common::{
    AbiConfig, ConfigFile, ConfigFileError, EngineConfig, LibraryEntry, LimitsConfig, RuntimeConfig, RuntimeError,
};
pub use ffi_bridge_core::{
    BridgeEngine, CallScope, CompiledModule, Edges, Foreign, ForeignIter, ForeignLibrary, ForeignPtr, HandleState,
    LibraryLoader, LinearMemory, Opaque, OpaqueType, Retain,
};

use tracing::info;

/// Load the library named in `config`, with the host imports linked.
///
/// # Errors
///
/// `InvalidConfig` if the file has no `[library]` entry, otherwise whatever
/// engine creation, compilation or instantiation reports.
pub fn load_library(config: &ConfigFile) -> Result<ForeignLibrary, RuntimeError> {
    let entry = config
        .library
        .as_ref()
        .ok_or_else(|| RuntimeError::invalid_config("no [library] entry in configuration"))?;

    let engine = BridgeEngine::new(&config.runtime.engine)?;
    let mut loader = LibraryLoader::new(engine, config.runtime.clone());
    ffi_bridge_host::register_all(loader.linker_mut())?;

    let module = loader.compile_file(&entry.path)?;
    let library = loader.load(&module, &entry.id)?;

    info!(library_id = %entry.id, path = %entry.path, "Library ready");
    Ok(library)
}
