//! Error types for ffi-bridge.
//!
//! Every failure crossing the host/foreign boundary is a [`RuntimeError`].
//! The variants fall into three groups:
//! - Fatal conditions local to the in-flight call: [`RuntimeError::OutOfForeignMemory`],
//!   [`RuntimeError::DecodeMismatch`], [`RuntimeError::MemoryOutOfBounds`],
//!   [`RuntimeError::Trap`]
//! - Recoverable, typed failures reported by the foreign library through a
//!   result envelope: [`RuntimeError::DataError`]
//! - Host-side precondition and setup failures: [`RuntimeError::InvalidArgument`],
//!   [`RuntimeError::ExportNotFound`], [`RuntimeError::CompilationFailed`],
//!   [`RuntimeError::InvalidConfig`], [`RuntimeError::Io`]

use std::io;

use thiserror::Error;

/// Top-level runtime errors.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The foreign allocator could not satisfy a request.
    ///
    /// Partially staged arguments are inconsistent at this point, so the
    /// call is abandoned rather than retried.
    #[error("Out of foreign memory: requested {size} bytes (align {align})")]
    OutOfForeignMemory {
        /// Requested size in bytes.
        size: u32,
        /// Requested alignment in bytes.
        align: u32,
    },

    /// The foreign library reported a typed failure through a result envelope.
    #[error("{type_name}.{variant}")]
    DataError {
        /// Name of the foreign error enum.
        type_name: &'static str,
        /// Name of the decoded variant.
        variant: &'static str,
        /// Raw discriminant identifying the cause.
        discriminant: i32,
    },

    /// A discriminant or flag fell outside its closed set.
    ///
    /// This means the bindings and the foreign library disagree about a
    /// layout, which is a programming error rather than a user error.
    #[error("Decode mismatch for {type_name}: unexpected value {value}")]
    DecodeMismatch {
        /// The type being decoded.
        type_name: &'static str,
        /// The offending raw value.
        value: i64,
    },

    /// A host-supplied value failed a precondition checked before any foreign call.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Description of why the argument was invalid.
        reason: String,
    },

    /// An access fell outside the current linear memory bound.
    #[error("Linear memory access out of bounds: offset {offset} + {len} exceeds {memory_size} bytes")]
    MemoryOutOfBounds {
        /// Start offset of the access.
        offset: u64,
        /// Length of the access in bytes.
        len: u64,
        /// Memory size at the time of the access.
        memory_size: u64,
    },

    /// A required export is missing or has an unexpected signature.
    #[error("Export not found: {name}")]
    ExportNotFound {
        /// Name of the export.
        name: String,
    },

    /// WebAssembly compilation or instantiation failed.
    #[error("Compilation failed: {reason}")]
    CompilationFailed {
        /// Description of the compilation failure.
        reason: String,
    },

    /// A WebAssembly trap occurred inside a foreign call.
    #[error("Wasm trap: {message}")]
    Trap {
        /// Description of the trap.
        message: String,
    },

    /// Invalid configuration was provided.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    /// Create a new `OutOfForeignMemory` error.
    pub fn out_of_memory(size: u32, align: u32) -> Self {
        Self::OutOfForeignMemory { size, align }
    }

    /// Create a new `DecodeMismatch` error.
    pub fn decode_mismatch(type_name: &'static str, value: impl Into<i64>) -> Self {
        Self::DecodeMismatch {
            type_name,
            value: value.into(),
        }
    }

    /// Create a new `InvalidArgument` error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a new `MemoryOutOfBounds` error.
    pub fn out_of_bounds(offset: u64, len: u64, memory_size: usize) -> Self {
        Self::MemoryOutOfBounds {
            offset,
            len,
            memory_size: memory_size as u64,
        }
    }

    /// Create a new `ExportNotFound` error.
    pub fn export_not_found(name: impl Into<String>) -> Self {
        Self::ExportNotFound { name: name.into() }
    }

    /// Create a new `CompilationFailed` error.
    pub fn compilation_failed(reason: impl Into<String>) -> Self {
        Self::CompilationFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `Trap` error.
    pub fn trap(message: impl Into<String>) -> Self {
        Self::Trap {
            message: message.into(),
        }
    }

    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error aborts the in-flight call and must not be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::OutOfForeignMemory { .. }
                | Self::DecodeMismatch { .. }
                | Self::MemoryOutOfBounds { .. }
                | Self::Trap { .. }
        )
    }

    /// Returns `true` if the foreign library reported a typed, recoverable failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DataError { .. })
    }

    /// Returns the raw discriminant of a `DataError` raised by `type_name`.
    pub fn data_discriminant(&self, type_name: &str) -> Option<i32> {
        match self {
            Self::DataError {
                type_name: raised,
                discriminant,
                ..
            } if *raised == type_name => Some(*discriminant),
            _ => None,
        }
    }
}
