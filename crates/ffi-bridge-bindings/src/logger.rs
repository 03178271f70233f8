//! The library's own logger.

use ffi_bridge_core::codec::bool_from_abi;
use ffi_bridge_core::{CallScope, ForeignLibrary, RuntimeError};
use tracing::debug;

/// Routes the library's log output to the console imports.
#[derive(Debug, Clone, Copy)]
pub struct Logger;

impl Logger {
    /// Install the console logger. Returns `false` if a logger was already
    /// installed.
    pub fn init_console_logger(library: &mut ForeignLibrary) -> Result<bool, RuntimeError> {
        let mut scope = CallScope::new(library);
        let raw: i32 = scope.call("icu4x_Logger_init_console_logger_mv1", ())?;
        scope.release()?;

        let installed = bool_from_abi(raw)?;
        debug!(installed, "Foreign console logger");
        Ok(installed)
    }
}
