//! The seam between the marshaling runtime and a concrete foreign library.

use tracing::{debug, warn};

use crate::alloc::Allocator;
use crate::finalize::FinalizationQueue;
use crate::memory::{ForeignPtr, LinearMemory};
use ffi_bridge_common::RuntimeError;

/// A foreign library instance as seen by the marshaling runtime.
///
/// [`ForeignLibrary`](crate::ForeignLibrary) implements this over a Wasmtime
/// instance. Every method requires the caller to hold the instance
/// exclusively, which is how the single-call-at-a-time rule is enforced.
pub trait Foreign: LinearMemory + Allocator {
    /// Invoke the destructor export `destructor` on `ptr`.
    fn destroy(&mut self, destructor: &str, ptr: ForeignPtr) -> Result<(), RuntimeError>;

    /// Create a growable foreign write buffer.
    fn write_create(&mut self, capacity: u32) -> Result<ForeignPtr, RuntimeError>;

    /// Address of the bytes written so far.
    fn write_get_bytes(&mut self, write: ForeignPtr) -> Result<ForeignPtr, RuntimeError>;

    /// Number of bytes written so far.
    fn write_len(&mut self, write: ForeignPtr) -> Result<u32, RuntimeError>;

    /// Release a write buffer.
    fn write_destroy(&mut self, write: ForeignPtr) -> Result<(), RuntimeError>;

    /// Queue receiving drop-time finalizations of this library's handles.
    fn finalizers(&self) -> &FinalizationQueue;

    /// Run the destructor of every owning handle dropped since the last collection.
    ///
    /// Every pending destructor is attempted; the first failure is returned
    /// after the queue has been worked through.
    fn collect(&mut self) -> Result<usize, RuntimeError> {
        let pending = self.finalizers().drain();
        if pending.is_empty() {
            return Ok(0);
        }

        let mut collected = 0;
        let mut first_error = None;

        for event in pending {
            match self.destroy(event.destructor, event.ptr) {
                Ok(()) => collected += 1,
                Err(e) => {
                    warn!(
                        type_name = event.type_name,
                        ptr = %event.ptr,
                        error = %e,
                        "Finalizer failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        debug!(collected, "Finalizers collected");

        match first_error {
            Some(e) => Err(e),
            None => Ok(collected),
        }
    }
}
