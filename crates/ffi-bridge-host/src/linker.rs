//! Host function registration for Wasmtime linkers.
//!
//! All imports live in the `env` module and receive strings as
//! `(ptr: i32, len: i32)` pairs of UTF-8 bytes in the caller's memory.

use anyhow::anyhow;
use ffi_bridge_common::RuntimeError;
use ffi_bridge_core::store::LibraryContext;
use ffi_bridge_core::{ForeignPtr, LinearMemory};
use tracing::warn;
use wasmtime::{Caller, Linker};

use crate::console::{CONSOLE_IMPORTS, ConsoleHost};

/// Import module of every host function.
pub const IMPORT_MODULE: &str = "env";

/// Import that aborts the in-flight call with a message.
pub const THROW_IMPORT: &str = "diplomat_throw_error_js";

/// Register all host functions.
///
/// # Errors
///
/// Returns an error if function registration fails.
pub fn register_all(linker: &mut Linker<LibraryContext>) -> Result<(), RuntimeError> {
    register_console(linker)?;
    register_throw(linker)?;
    Ok(())
}

/// Register the console imports.
///
/// Malformed messages are replaced lossily rather than failing the call.
pub fn register_console(linker: &mut Linker<LibraryContext>) -> Result<(), RuntimeError> {
    for (name, level) in CONSOLE_IMPORTS {
        linker
            .func_wrap(
                IMPORT_MODULE,
                name,
                move |mut caller: Caller<'_, LibraryContext>, ptr: u32, len: u32| {
                    let message = match read_message(&mut caller, ptr, len) {
                        Ok(message) => message,
                        Err(e) => {
                            warn!(import = name, error = %e, "Unreadable console message");
                            return;
                        }
                    };

                    ConsoleHost::log(caller.data_mut(), level, &message);
                },
            )
            .map_err(|e| {
                RuntimeError::invalid_config(format!("Failed to register {name}: {e}"))
            })?;
    }

    Ok(())
}

/// Register the throw import.
///
/// The message becomes the error of the in-flight call, which the host sees
/// as a trap.
pub fn register_throw(linker: &mut Linker<LibraryContext>) -> Result<(), RuntimeError> {
    linker
        .func_wrap(
            IMPORT_MODULE,
            THROW_IMPORT,
            |mut caller: Caller<'_, LibraryContext>, ptr: u32, len: u32| -> anyhow::Result<()> {
                let message = read_message(&mut caller, ptr, len)?;
                Err(anyhow!("{message}"))
            },
        )
        .map_err(|e| {
            RuntimeError::invalid_config(format!("Failed to register {THROW_IMPORT}: {e}"))
        })?;

    Ok(())
}

/// Copy a UTF-8 message out of the caller's memory.
fn read_message(caller: &mut Caller<'_, LibraryContext>, ptr: u32, len: u32) -> anyhow::Result<String> {
    let export = caller.data().memory_export.clone();
    let memory = caller
        .get_export(&export)
        .and_then(wasmtime::Extern::into_memory)
        .ok_or_else(|| anyhow!("memory export '{export}' not found"))?;

    let data = memory.data(&*caller);
    let bytes = data.read_bytes(ForeignPtr::new(ptr), len as usize)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffi_bridge_common::EngineConfig;
    use ffi_bridge_core::BridgeEngine;

    #[test]
    fn test_register_console() {
        let engine = BridgeEngine::new(&EngineConfig::default()).unwrap();
        let mut linker = Linker::new(engine.inner());

        assert!(register_console(&mut linker).is_ok());
    }

    #[test]
    fn test_register_all() {
        let engine = BridgeEngine::new(&EngineConfig::default()).unwrap();
        let mut linker = Linker::new(engine.inner());

        assert!(register_all(&mut linker).is_ok());
        // Registering twice is rejected by the linker.
        assert!(register_all(&mut linker).is_err());
    }
}
