//! Console output from wrapped libraries.
//!
//! Libraries report diagnostics through console imports, one per level.
//! Every line is:
//! 1. Stored in the [`LibraryContext`] for later retrieval
//! 2. Emitted via the `tracing` crate for observability

use ffi_bridge_core::store::{LibraryContext, LogLevel};
use tracing::{debug, error, info, warn};

/// Console imports and the level each one logs at.
pub const CONSOLE_IMPORTS: [(&str, LogLevel); 5] = [
    ("diplomat_console_debug_js", LogLevel::Debug),
    ("diplomat_console_info_js", LogLevel::Info),
    ("diplomat_console_log_js", LogLevel::Info),
    ("diplomat_console_warn_js", LogLevel::Warn),
    ("diplomat_console_error_js", LogLevel::Error),
];

/// Host side of the console imports.
pub struct ConsoleHost;

impl ConsoleHost {
    /// Record a console line at the specified level.
    pub fn log(ctx: &mut LibraryContext, level: LogLevel, message: &str) {
        ctx.log(level, message.to_string());

        let library_id = ctx.library_id.as_str();
        match level {
            LogLevel::Debug => debug!(library_id, foreign_log = true, "{}", message),
            LogLevel::Info => info!(library_id, foreign_log = true, "{}", message),
            LogLevel::Warn => warn!(library_id, foreign_log = true, "{}", message),
            LogLevel::Error => error!(library_id, foreign_log = true, "{}", message),
        }
    }
}

/// The level logged by console import `name`, if it is one.
pub fn level_for_import(name: &str) -> Option<LogLevel> {
    CONSOLE_IMPORTS
        .iter()
        .find(|(import, _)| *import == name)
        .map(|(_, level)| *level)
}
