//! Host functions imported by wrapped libraries.
//!
//! Libraries generated for a JavaScript host import a small set of functions
//! from the `env` module. This crate provides them for a Rust host.
//!
//! # Imports
//!
//! - [`console`]: `diplomat_console_{debug,info,log,warn,error}_js(ptr, len)`,
//!   captured into the library's store and emitted through `tracing`
//! - [`linker`]: Registration, plus `diplomat_throw_error_js(ptr, len)`,
//!   which aborts the in-flight call with the given message

pub mod console;
pub mod linker;

pub use console::ConsoleHost;
pub use linker::register_all;
