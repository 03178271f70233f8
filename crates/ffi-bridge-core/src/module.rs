//! WebAssembly module compilation and caching.
//!
//! This module provides [`CompiledModule`], a wrapper around Wasmtime's [`Module`]
//! that compiles wrapped libraries from binary or text files. Repeated
//! compilations of the same bytes hit Wasmtime's compilation cache when
//! `cache_compiled_modules` is enabled.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;
use std::time::Instant;

use tracing::{info, instrument};
use wasmtime::{Engine, ExternType, Module};

use ffi_bridge_common::RuntimeError;

/// A compiled foreign library module.
///
/// `CompiledModule` is cheap to clone and can be instantiated any number of
/// times, e.g. once per worker thread.
#[derive(Clone)]
pub struct CompiledModule {
    inner: Module,

    /// Hash of the original Wasm bytes.
    content_hash: String,
}

impl CompiledModule {
    /// Compile a module from WebAssembly bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation fails (e.g., invalid Wasm).
    #[instrument(skip(engine, bytes), fields(bytes_len = bytes.len()))]
    pub fn from_bytes(engine: &Engine, bytes: &[u8]) -> Result<Self, RuntimeError> {
        let start = Instant::now();

        Self::validate_wasm_header(bytes)?;

        let module = Module::new(engine, bytes).map_err(|e| {
            RuntimeError::compilation_failed(format!("Module compilation failed: {e}"))
        })?;

        let content_hash = compute_hash(bytes);

        info!(
            content_hash = %content_hash,
            duration_ms = start.elapsed().as_millis(),
            "Library module compiled"
        );

        Ok(Self {
            inner: module,
            content_hash,
        })
    }

    /// Compile a module from WAT (WebAssembly Text Format).
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or compilation fails.
    #[instrument(skip(engine, wat))]
    pub fn from_wat(engine: &Engine, wat: &str) -> Result<Self, RuntimeError> {
        let start = Instant::now();

        let module = Module::new(engine, wat).map_err(|e| {
            RuntimeError::compilation_failed(format!("WAT compilation failed: {e}"))
        })?;

        let content_hash = compute_hash(wat.as_bytes());

        info!(
            content_hash = %content_hash,
            duration_ms = start.elapsed().as_millis(),
            "WAT module compiled"
        );

        Ok(Self {
            inner: module,
            content_hash,
        })
    }

    /// Read and compile a `.wasm` or `.wat` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not compile.
    #[instrument(skip(engine, path), fields(path = %path.as_ref().display()))]
    pub fn from_file(engine: &Engine, path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;

        if path.extension().is_some_and(|ext| ext == "wat") {
            let wat = String::from_utf8(bytes).map_err(|e| {
                RuntimeError::compilation_failed(format!("WAT file is not UTF-8: {e}"))
            })?;
            Self::from_wat(engine, &wat)
        } else {
            Self::from_bytes(engine, &bytes)
        }
    }

    /// Get the content hash of the original Wasm bytes.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Returns `true` if the module exports a function called `name`.
    pub fn exports_function(&self, name: &str) -> bool {
        self.inner
            .get_export(name)
            .is_some_and(|ty| matches!(ty, ExternType::Func(_)))
    }

    /// Get the inner module.
    pub fn as_module(&self) -> &Module {
        &self.inner
    }

    /// Validate WebAssembly header (magic number).
    fn validate_wasm_header(bytes: &[u8]) -> Result<(), RuntimeError> {
        if bytes.len() < 8 {
            return Err(RuntimeError::compilation_failed(
                "Invalid Wasm: file too small",
            ));
        }

        if &bytes[0..4] != b"\0asm" {
            return Err(RuntimeError::compilation_failed(
                "Invalid Wasm: bad magic number",
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledModule")
            .field("content_hash", &self.content_hash)
            .finish_non_exhaustive()
    }
}

/// Compute a hash of the given bytes.
fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeEngine;
    use ffi_bridge_common::EngineConfig;

    // Empty module
    const MINIMAL_WASM: &[u8] = &[
        0x00, 0x61, 0x73, 0x6d, // magic: \0asm
        0x01, 0x00, 0x00, 0x00, // version: 1
    ];

    fn engine() -> BridgeEngine {
        BridgeEngine::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_validate_wasm_header() {
        assert!(CompiledModule::validate_wasm_header(MINIMAL_WASM).is_ok());
        assert!(CompiledModule::validate_wasm_header(&[0x00, 0x61]).is_err());

        let bad_magic = &[0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];
        assert!(CompiledModule::validate_wasm_header(bad_magic).is_err());
    }

    #[test]
    fn test_compute_hash() {
        let hash1 = compute_hash(b"hello");
        let hash2 = compute_hash(b"hello");
        let hash3 = compute_hash(b"world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 16);
    }

    #[test]
    fn test_module_compilation() {
        let engine = engine();
        let module = CompiledModule::from_bytes(engine.inner(), MINIMAL_WASM).unwrap();

        assert!(!module.content_hash().is_empty());
        assert!(!module.exports_function("diplomat_alloc"));
    }

    #[test]
    fn test_wat_exports() {
        let engine = engine();
        let module = CompiledModule::from_wat(
            engine.inner(),
            r#"(module (memory (export "memory") 1) (func (export "f")))"#,
        )
        .unwrap();

        assert!(module.exports_function("f"));
        assert!(!module.exports_function("memory"));
    }

    #[test]
    fn test_invalid_wat() {
        let engine = engine();
        let result = CompiledModule::from_wat(engine.inner(), "(module (func (export)))");
        assert!(matches!(result, Err(RuntimeError::CompilationFailed { .. })));
    }

    #[test]
    fn test_module_debug() {
        let engine = engine();
        let module = CompiledModule::from_bytes(engine.inner(), MINIMAL_WASM).unwrap();

        let debug_str = format!("{module:?}");
        assert!(debug_str.contains("CompiledModule"));
        assert!(debug_str.contains("content_hash"));
    }
}
