//! Per-library store state.
//!
//! This module provides:
//! - [`LibraryContext`]: State of one library instance, accessible from host functions
//! - [`LogEntry`] and [`LogLevel`]: Console output captured from the foreign side
//! - [`CallMetrics`]: Counters of boundary traffic

use std::time::Instant;

use uuid::Uuid;
use wasmtime::{Store, StoreLimits, StoreLimitsBuilder};

use crate::BridgeEngine;
use ffi_bridge_common::{LimitsConfig, RuntimeError};

/// State of one library instance.
///
/// Host functions reach it through [`wasmtime::Caller::data`].
pub struct LibraryContext {
    /// Identifier of the wrapped library, from configuration.
    pub library_id: String,

    /// Unique identifier of this instance, for tracing.
    pub instance_id: Uuid,

    /// Name of the exported linear memory.
    pub memory_export: String,

    /// Console output collected from the foreign side.
    pub logs: Vec<LogEntry>,

    /// Boundary traffic counters.
    pub metrics: CallMetrics,

    limits: StoreLimits,
}

/// A single console line from the foreign side.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Log level (debug, info, warn, error).
    pub level: LogLevel,

    /// Log message content.
    pub message: String,

    /// Timestamp when the log was recorded.
    pub timestamp: Instant,
}

/// Log level of foreign console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug-level messages.
    Debug,
    /// Informational messages.
    Info,
    /// Warning messages.
    Warn,
    /// Error messages.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Boundary traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallMetrics {
    /// Exported functions invoked.
    pub calls: u64,
    /// Foreign allocations made by the host.
    pub allocations: u64,
    /// Foreign allocations released by the host.
    pub frees: u64,
    /// Destructors run.
    pub destructors: u64,
}

impl LibraryContext {
    /// Create a context for `library_id`.
    pub fn new(library_id: impl Into<String>, memory_export: impl Into<String>, limits: &LimitsConfig) -> Self {
        Self {
            library_id: library_id.into(),
            instance_id: Uuid::new_v4(),
            memory_export: memory_export.into(),
            logs: Vec::new(),
            metrics: CallMetrics::default(),
            limits: StoreLimitsBuilder::new()
                .memory_size(limits.max_memory_bytes())
                .build(),
        }
    }

    /// Add a log entry.
    pub fn log(&mut self, level: LogLevel, message: String) {
        self.logs.push(LogEntry {
            level,
            message,
            timestamp: Instant::now(),
        });
    }

    /// Take the collected log entries.
    pub fn take_logs(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.logs)
    }
}

/// Create a store for one library instance.
///
/// Memory growth beyond `limits` fails inside the foreign allocator instead
/// of trapping, so it surfaces as an allocation failure.
pub fn create_store(
    engine: &BridgeEngine,
    limits: &LimitsConfig,
    library_id: impl Into<String>,
    memory_export: impl Into<String>,
) -> Result<Store<LibraryContext>, RuntimeError> {
    if limits.max_memory_mb == 0 {
        return Err(RuntimeError::invalid_config("max_memory_mb must be non-zero"));
    }

    let context = LibraryContext::new(library_id, memory_export, limits);
    let mut store = Store::new(engine.inner(), context);
    store.limiter(|ctx| &mut ctx.limits);

    Ok(store)
}
