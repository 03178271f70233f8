//! Allocator shim over the foreign heap.
//!
//! Implementors expose the foreign library's raw allocation exports; the
//! provided [`Allocator::allocate`] and [`Allocator::free`] add the host-side
//! checks. Transient allocations made during a call are never freed by hand:
//! they are registered with a [`CallScope`](crate::CallScope), which releases
//! them on every exit path.

use tracing::trace;

use crate::memory::ForeignPtr;
use ffi_bridge_common::RuntimeError;

/// A live foreign heap allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Start of the allocation.
    pub ptr: ForeignPtr,
    /// Size in bytes, as requested.
    pub size: u32,
    /// Alignment in bytes, as requested.
    pub align: u32,
}

impl Allocation {
    /// Zero-sized allocations never reach the foreign allocator.
    pub fn is_zero_sized(&self) -> bool {
        self.size == 0
    }
}

/// Access to the foreign allocator.
pub trait Allocator {
    /// Call the foreign allocation export. May return [`ForeignPtr::NULL`] on exhaustion.
    fn raw_alloc(&mut self, size: u32, align: u32) -> Result<ForeignPtr, RuntimeError>;

    /// Call the foreign deallocation export.
    fn raw_free(&mut self, ptr: ForeignPtr, size: u32, align: u32) -> Result<(), RuntimeError>;

    /// Allocate `size` bytes aligned to `align`.
    ///
    /// Zero-sized requests yield a dangling, aligned, non-null pointer
    /// without calling the foreign allocator.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `align` is not a power of two
    /// - `OutOfForeignMemory` if the foreign allocator returns null
    fn allocate(&mut self, size: u32, align: u32) -> Result<Allocation, RuntimeError> {
        if !align.is_power_of_two() {
            return Err(RuntimeError::invalid_argument(format!(
                "alignment {align} is not a power of two"
            )));
        }

        if size == 0 {
            return Ok(Allocation {
                ptr: ForeignPtr::new(align),
                size,
                align,
            });
        }

        let ptr = self.raw_alloc(size, align)?;
        if ptr.is_null() {
            return Err(RuntimeError::out_of_memory(size, align));
        }

        trace!(ptr = %ptr, size, align, "Foreign allocation");
        Ok(Allocation { ptr, size, align })
    }

    /// Return an allocation to the foreign heap.
    fn free(&mut self, allocation: Allocation) -> Result<(), RuntimeError> {
        if allocation.is_zero_sized() {
            return Ok(());
        }

        trace!(ptr = %allocation.ptr, size = allocation.size, "Foreign free");
        self.raw_free(allocation.ptr, allocation.size, allocation.align)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeForeign;

    #[test]
    fn test_allocate_and_free() {
        let mut foreign = FakeForeign::new(256);

        let allocation = foreign.allocate(10, 4).unwrap();
        assert_eq!(allocation.ptr.addr() % 4, 0);
        assert!(!allocation.ptr.is_null());
        assert_eq!(foreign.allocs, 1);

        foreign.free(allocation).unwrap();
        assert_eq!(foreign.frees, 1);
    }

    #[test]
    fn test_zero_sized_allocation() {
        let mut foreign = FakeForeign::new(256);

        let allocation = foreign.allocate(0, 8).unwrap();
        assert_eq!(allocation.ptr, ForeignPtr::new(8));
        assert!(allocation.is_zero_sized());

        foreign.free(allocation).unwrap();
        assert_eq!(foreign.allocs, 0);
        assert_eq!(foreign.frees, 0);
    }

    #[test]
    fn test_out_of_foreign_memory() {
        let mut foreign = FakeForeign::new(256);
        foreign.fail_next_alloc = true;

        let result = foreign.allocate(16, 4);
        assert!(matches!(
            result,
            Err(RuntimeError::OutOfForeignMemory { size: 16, align: 4 })
        ));
    }

    #[test]
    fn test_invalid_alignment() {
        let mut foreign = FakeForeign::new(256);

        assert!(matches!(
            foreign.allocate(16, 3),
            Err(RuntimeError::InvalidArgument { .. })
        ));
        assert!(foreign.allocate(16, 0).is_err());
        assert_eq!(foreign.allocs, 0);
    }
}
