//! Per-call cleanup arena.
//!
//! A [`CallScope`] is opened for every foreign call. Everything staged for
//! the call (argument copies, receive buffers, write buffers) is registered
//! with the scope and released when the scope ends, in reverse creation
//! order, whether the call returned normally, failed with `?`, or panicked.
//!
//! Opening a scope is also the point where drop-time finalizations of
//! handles are collected, since no call is in flight yet.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use tracing::{trace, warn};

use crate::alloc::{Allocation, Allocator};
use crate::codec::{Decode, Encode, FfiLayout, ForeignSlice, Layout, WriteBuffer, encode_utf16};
use crate::foreign::Foreign;
use crate::memory::{ForeignPtr, LinearMemory, Scalar};
use ffi_bridge_common::RuntimeError;

#[derive(Debug)]
enum Cleanup {
    Free(Allocation),
    DestroyWrite(ForeignPtr),
}

/// Exclusive access to a library for the duration of one call.
///
/// Dereferences to the library, so exports can be called through it.
pub struct CallScope<'f, F: Foreign + ?Sized> {
    foreign: &'f mut F,
    pending: Vec<Cleanup>,
    allocated: usize,
    released: usize,
    failed: usize,
}

impl<'f, F: Foreign + ?Sized> CallScope<'f, F> {
    /// Open a scope, collecting pending finalizations first.
    pub fn new(foreign: &'f mut F) -> Self {
        if let Err(e) = foreign.collect() {
            warn!(error = %e, "Collecting finalizers before call failed");
        }

        Self {
            foreign,
            pending: Vec::new(),
            allocated: 0,
            released: 0,
            failed: 0,
        }
    }

    /// Allocate transient foreign memory, released with the scope.
    pub fn alloc(&mut self, size: u32, align: u32) -> Result<ForeignPtr, RuntimeError> {
        let allocation = self.foreign.allocate(size, align)?;
        self.pending.push(Cleanup::Free(allocation));
        self.allocated += 1;
        Ok(allocation.ptr)
    }

    /// Allocate transient foreign memory for `layout`.
    pub fn alloc_layout(&mut self, layout: Layout) -> Result<ForeignPtr, RuntimeError> {
        self.alloc(layout.size, layout.align)
    }

    /// Allocate a buffer for a value the foreign function writes out.
    pub fn receive<T: FfiLayout>(&mut self) -> Result<ReceiveBuf<T>, RuntimeError> {
        let ptr = self.alloc_layout(T::LAYOUT)?;
        Ok(ReceiveBuf {
            ptr,
            _marker: PhantomData,
        })
    }

    /// Copy `value` into transient foreign memory.
    pub fn stage<T: Encode>(&mut self, value: &T) -> Result<ForeignPtr, RuntimeError> {
        let ptr = self.alloc_layout(T::LAYOUT)?;
        value.encode(&mut *self.foreign, ptr)?;
        Ok(ptr)
    }

    /// Stage `s` as UTF-8.
    pub fn str8(&mut self, s: &str) -> Result<ForeignSlice, RuntimeError> {
        let bytes = s.as_bytes();
        let len = length(bytes.len())?;
        let ptr = self.alloc(len, 1)?;
        self.foreign.write_bytes(ptr, bytes)?;
        Ok(ForeignSlice { ptr, len })
    }

    /// Stage `s` as UTF-16; the length counts 16-bit units.
    pub fn str16(&mut self, s: &str) -> Result<ForeignSlice, RuntimeError> {
        let bytes = encode_utf16(s);
        let len = length(bytes.len() / 2)?;
        let ptr = self.alloc(byte_size(len, 2)?, 2)?;
        self.foreign.write_bytes(ptr, &bytes)?;
        Ok(ForeignSlice { ptr, len })
    }

    /// Stage a slice of scalars.
    pub fn slice<T: Scalar>(&mut self, values: &[T]) -> Result<ForeignSlice, RuntimeError> {
        let len = length(values.len())?;
        let width = length(T::SIZE)?;
        let size = byte_size(len, width)?;

        let mut bytes = vec![0u8; size as usize];
        for (value, out) in values.iter().zip(bytes.chunks_exact_mut(T::SIZE)) {
            value.write_le(out);
        }

        let ptr = self.alloc(size, width)?;
        self.foreign.write_bytes(ptr, &bytes)?;
        Ok(ForeignSlice { ptr, len })
    }

    /// Stage the `{ptr, len}` struct of an already staged slice, for
    /// functions that take slices by pointer.
    pub fn slice_wrapper(&mut self, slice: ForeignSlice) -> Result<ForeignPtr, RuntimeError> {
        self.stage(&slice)
    }

    /// Create a write buffer, destroyed with the scope.
    pub fn write_buffer(&mut self) -> Result<WriteBuffer, RuntimeError> {
        let ptr = self.foreign.write_create(0)?;
        if ptr.is_null() {
            return Err(RuntimeError::out_of_memory(0, 1));
        }
        self.pending.push(Cleanup::DestroyWrite(ptr));
        self.allocated += 1;
        Ok(WriteBuffer::new(ptr))
    }

    /// Number of resources registered so far.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Number of resources released so far.
    pub fn released(&self) -> usize {
        self.released
    }

    /// Release everything now and report how many resources were released.
    ///
    /// # Errors
    ///
    /// Every resource is attempted; the first failure is returned.
    pub fn release(mut self) -> Result<usize, RuntimeError> {
        match self.release_all() {
            Some(e) => Err(e),
            None => Ok(self.released),
        }
    }

    fn release_all(&mut self) -> Option<RuntimeError> {
        let mut first_error = None;

        while let Some(cleanup) = self.pending.pop() {
            let result = match &cleanup {
                Cleanup::Free(allocation) => self.foreign.free(*allocation),
                Cleanup::DestroyWrite(ptr) => self.foreign.write_destroy(*ptr),
            };

            match result {
                Ok(()) => self.released += 1,
                Err(e) => {
                    warn!(cleanup = ?cleanup, error = %e, "Call cleanup failed");
                    self.failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        trace!(
            allocated = self.allocated,
            released = self.released,
            failed = self.failed,
            "Call scope released"
        );
        first_error
    }
}

impl<F: Foreign + ?Sized> Deref for CallScope<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        self.foreign
    }
}

impl<F: Foreign + ?Sized> DerefMut for CallScope<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        self.foreign
    }
}

impl<F: Foreign + ?Sized> Drop for CallScope<'_, F> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            // Errors were already logged per resource.
            let _ = self.release_all();
        }
    }
}

impl<F: Foreign + ?Sized> std::fmt::Debug for CallScope<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallScope")
            .field("pending", &self.pending.len())
            .field("allocated", &self.allocated)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

/// A scope-owned buffer for an out-parameter of type `T`.
#[derive(Debug)]
pub struct ReceiveBuf<T> {
    ptr: ForeignPtr,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ReceiveBuf<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ReceiveBuf<T> {}

impl<T> ReceiveBuf<T> {
    /// The pointer passed to the foreign function.
    pub fn ptr(&self) -> ForeignPtr {
        self.ptr
    }
}

impl<T: Decode> ReceiveBuf<T> {
    /// Decode the value the foreign function wrote.
    pub fn read<M: LinearMemory + ?Sized>(&self, memory: &M) -> Result<T, RuntimeError> {
        T::decode(memory, self.ptr)
    }
}

fn length(len: usize) -> Result<u32, RuntimeError> {
    u32::try_from(len).map_err(|_| RuntimeError::invalid_argument("length exceeds foreign address space"))
}

fn byte_size(len: u32, width: u32) -> Result<u32, RuntimeError> {
    len.checked_mul(width)
        .ok_or_else(|| RuntimeError::invalid_argument("slice too large for foreign memory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeForeign;

    #[test]
    fn test_release_matches_allocations() {
        let mut foreign = FakeForeign::new(256);

        let mut scope = CallScope::new(&mut foreign);
        scope.str8("hello").unwrap();
        scope.str16("hé").unwrap();
        scope.slice(&[1u32, 2, 3]).unwrap();
        scope.receive::<u64>().unwrap();
        scope.write_buffer().unwrap();

        assert_eq!(scope.allocated(), 5);
        assert_eq!(scope.release().unwrap(), 5);

        // Four frees plus header and data of the write buffer.
        assert_eq!(foreign.allocs, 6);
        assert_eq!(foreign.frees, 6);
        assert_eq!(foreign.live_writes, 0);
    }

    #[test]
    fn test_release_on_early_error() {
        fn staged_call(foreign: &mut FakeForeign) -> Result<(), RuntimeError> {
            let mut scope = CallScope::new(foreign);
            scope.str8("first")?;
            scope.str8("second")?;
            scope.str8("third")?;
            Ok(())
        }

        let mut foreign = FakeForeign::new(256);
        staged_call(&mut foreign).unwrap();
        assert_eq!(foreign.allocs, foreign.frees);

        // Fail the second staging; the first is still released.
        let mut foreign = FakeForeign::new(256);
        {
            let mut scope = CallScope::new(&mut foreign);
            scope.str8("first").unwrap();
            scope.fail_next_alloc = true;
            let err = scope.str8("second").unwrap_err();
            assert!(matches!(err, RuntimeError::OutOfForeignMemory { size: 6, align: 1 }));
        }
        assert_eq!(foreign.allocs, 1);
        assert_eq!(foreign.frees, 1);
    }

    #[test]
    fn test_release_on_panic() {
        let mut foreign = FakeForeign::new(256);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut scope = CallScope::new(&mut foreign);
            scope.alloc(16, 8).unwrap();
            panic!("binding bug");
        }));

        assert!(result.is_err());
        assert_eq!(foreign.allocs, 1);
        assert_eq!(foreign.frees, 1);
    }

    #[test]
    fn test_empty_string_and_slice() {
        let mut foreign = FakeForeign::new(64);

        let mut scope = CallScope::new(&mut foreign);
        let s = scope.str8("").unwrap();
        let v = scope.slice::<u16>(&[]).unwrap();

        assert_eq!(s.len, 0);
        assert!(!s.ptr.is_null());
        assert_eq!(v.len, 0);
        assert_eq!(s.read_str8(&*scope).unwrap(), "");
        scope.release().unwrap();

        // Zero-sized staging never reaches the foreign allocator.
        assert_eq!(foreign.allocs, 0);
        assert_eq!(foreign.frees, 0);
    }

    #[test]
    fn test_utf8_byte_length() {
        let mut foreign = FakeForeign::new(64);
        let mut scope = CallScope::new(&mut foreign);

        let s = scope.str8("naïve café").unwrap();
        assert_eq!(s.len, 12);
        assert_eq!(s.read_str8(&*scope).unwrap(), "naïve café");

        let w = scope.str16("naïve café").unwrap();
        assert_eq!(w.len, 10);
        assert_eq!(w.ptr.addr() % 2, 0);
    }

    #[test]
    fn test_staged_byte_size_overflow() {
        assert_eq!(byte_size(10, 2).unwrap(), 20);
        assert_eq!(byte_size(u32::MAX / 2, 2).unwrap(), u32::MAX - 1);
        assert!(matches!(
            byte_size(u32::MAX / 2 + 1, 2),
            Err(RuntimeError::InvalidArgument { .. })
        ));
        assert!(matches!(
            byte_size(u32::MAX / 4 + 1, 4),
            Err(RuntimeError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_slice_wrapper() {
        let mut foreign = FakeForeign::new(64);
        let mut scope = CallScope::new(&mut foreign);

        let slice = scope.slice(&[7u8, 8, 9]).unwrap();
        let wrapper = scope.slice_wrapper(slice).unwrap();

        assert_eq!(wrapper.addr() % 4, 0);
        assert_eq!(ForeignSlice::decode(&*scope, wrapper).unwrap(), slice);
        assert_eq!(slice.read_slice::<u8, _>(&*scope).unwrap(), vec![7, 8, 9]);
    }

    #[test]
    fn test_receive_buffer() {
        let mut foreign = FakeForeign::new(64);
        let mut scope = CallScope::new(&mut foreign);

        let buf = scope.receive::<Option<u32>>().unwrap();
        scope.write(buf.ptr(), 41u32).unwrap();
        scope.write(buf.ptr().offset(4), 1u8).unwrap();

        assert_eq!(buf.read(&*scope).unwrap(), Some(41));
    }

    #[test]
    fn test_scope_collects_finalizers() {
        use crate::finalize::Finalization;

        let mut foreign = FakeForeign::new(64);
        foreign.finalizers().push(Finalization {
            type_name: "Thing",
            destructor: "thing_destroy",
            ptr: ForeignPtr::new(40),
        });

        let scope = CallScope::new(&mut foreign);
        drop(scope);

        assert_eq!(
            foreign.destroyed,
            vec![("thing_destroy".to_string(), ForeignPtr::new(40))]
        );
    }
}
