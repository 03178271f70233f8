//! Marshaling runtime and Wasmtime library host for ffi-bridge.
//!
//! This crate moves values between a Rust host and a native library compiled
//! to WebAssembly, and manages the lifetime of the foreign objects the host
//! holds on to.
//!
//! Marshaling components, leaves first:
//! - [`memory`]: Bounds-checked typed access to linear memory
//! - [`alloc`]: Allocator shim over the foreign heap
//! - [`codec`]: Layouts, scalars, enums, option and result envelopes, strings
//! - [`edges`]: Lifetime edges between wrapper objects
//! - [`handle`]: Opaque handles with exactly-once destruction
//! - [`arena`]: Per-call cleanup of transient allocations
//! - [`iter`]: Foreign iterators as host iterators
//!
//! Wasmtime embedding:
//! - [`BridgeEngine`]: Configured Wasmtime engine
//! - [`CompiledModule`]: Compiled library module
//! - [`LibraryLoader`]: Linking and instantiation
//! - [`ForeignLibrary`]: A live instance, implementing [`Foreign`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Binding method                       │
//! │  opens a CallScope, stages inputs, calls the export,    │
//! │  decodes outputs into values and Opaque handles         │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │               Foreign (ForeignLibrary)                  │
//! │  - LinearMemory view, re-derived per access             │
//! │  - Allocator exports                                    │
//! │  - Destructors, write buffers, finalization queue       │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │           Store<LibraryContext> + Instance              │
//! │  - Linear memory with growth limits                     │
//! │  - Captured console output and call metrics             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod alloc;
pub mod arena;
pub mod codec;
pub mod edges;
pub mod engine;
pub mod finalize;
pub mod foreign;
pub mod handle;
pub mod iter;
pub mod library;
pub mod loader;
pub mod memory;
pub mod module;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use alloc::{Allocation, Allocator};
pub use arena::{CallScope, ReceiveBuf};
pub use codec::{Decode, Encode, FfiEnum, FfiLayout, ForeignErrorExt, ForeignSlice, Layout, WriteBuffer};
pub use edges::{Edges, EdgesBuilder, Retain, Retained};
pub use engine::BridgeEngine;
pub use finalize::{Finalization, FinalizationQueue};
pub use foreign::Foreign;
pub use handle::{HandleState, Opaque, OpaqueType};
pub use iter::{Advance, ForeignIter, Steps};
pub use library::ForeignLibrary;
pub use loader::LibraryLoader;
pub use memory::{ForeignPtr, IntWidth, LinearMemory, Scalar};
pub use module::CompiledModule;
pub use store::{CallMetrics, LibraryContext, LogEntry, LogLevel};

pub use ffi_bridge_common::RuntimeError;
