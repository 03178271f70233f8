//! In-memory [`Foreign`] implementation for unit tests.
//!
//! Models a library with a bump allocator over a plain byte vector, write
//! buffers laid out as a `{buf, len, cap}` header, read recording and
//! failure injection.

use std::cell::RefCell;

use crate::alloc::Allocator;
use crate::finalize::FinalizationQueue;
use crate::foreign::Foreign;
use crate::memory::{ForeignPtr, LinearMemory, checked_range};
use ffi_bridge_common::RuntimeError;

const HEAP_START: u32 = 8;
const WRITE_HEADER: u32 = 12;
const WRITE_MIN_CAPACITY: u32 = 16;

pub(crate) struct FakeForeign {
    pub memory: Vec<u8>,
    heap: u32,
    pub allocs: usize,
    pub frees: usize,
    pub fail_next_alloc: bool,
    pub fail_destroy: bool,
    pub destroyed: Vec<(String, ForeignPtr)>,
    pub live_writes: usize,
    pub reads: RefCell<Vec<(u32, usize)>>,
    finalizers: FinalizationQueue,
}

impl FakeForeign {
    pub fn new(size: usize) -> Self {
        Self {
            memory: vec![0; size],
            heap: HEAP_START,
            allocs: 0,
            frees: 0,
            fail_next_alloc: false,
            fail_destroy: false,
            destroyed: Vec::new(),
            live_writes: 0,
            reads: RefCell::new(Vec::new()),
            finalizers: FinalizationQueue::new(),
        }
    }

    /// Grows the memory like `memory.grow` would, possibly moving it.
    fn grow_to(&mut self, end: usize) {
        if end > self.memory.len() {
            let mut grown = vec![0; end.next_multiple_of(64)];
            grown[..self.memory.len()].copy_from_slice(&self.memory);
            self.memory = grown;
        }
    }

    /// Append `data` to a write buffer, as a foreign function would.
    pub fn write_append(&mut self, write: ForeignPtr, data: &[u8]) -> Result<(), RuntimeError> {
        let buf: u32 = self.read(write)?;
        let len: u32 = self.read(write.offset(4))?;
        let cap: u32 = self.read(write.offset(8))?;
        let needed = len + u32::try_from(data.len()).unwrap_or(u32::MAX);

        let buf = if needed > cap {
            let new_cap = needed.max(cap * 2);
            let grown = self.raw_alloc(new_cap, 1)?;
            let old = self.read_bytes(ForeignPtr::new(buf), len as usize)?.to_vec();
            self.write_bytes(grown, &old)?;
            self.raw_free(ForeignPtr::new(buf), cap, 1)?;
            self.write(write, grown.addr())?;
            self.write(write.offset(8), new_cap)?;
            grown.addr()
        } else {
            buf
        };

        self.write_bytes(ForeignPtr::new(buf + len), data)?;
        self.write(write.offset(4), needed)
    }

    pub fn clear_reads(&self) {
        self.reads.borrow_mut().clear();
    }
}

impl LinearMemory for FakeForeign {
    fn bytes(&self) -> &[u8] {
        &self.memory
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn read_bytes(&self, ptr: ForeignPtr, len: usize) -> Result<&[u8], RuntimeError> {
        let range = checked_range(ptr, len, self.memory.len())?;
        self.reads.borrow_mut().push((ptr.addr(), len));
        Ok(&self.memory[range])
    }
}

impl Allocator for FakeForeign {
    fn raw_alloc(&mut self, size: u32, align: u32) -> Result<ForeignPtr, RuntimeError> {
        if std::mem::take(&mut self.fail_next_alloc) {
            return Ok(ForeignPtr::NULL);
        }

        let start = self.heap.next_multiple_of(align);
        self.heap = start + size;
        self.grow_to(self.heap as usize);
        self.allocs += 1;
        Ok(ForeignPtr::new(start))
    }

    fn raw_free(&mut self, _ptr: ForeignPtr, _size: u32, _align: u32) -> Result<(), RuntimeError> {
        self.frees += 1;
        Ok(())
    }
}

impl Foreign for FakeForeign {
    fn destroy(&mut self, destructor: &str, ptr: ForeignPtr) -> Result<(), RuntimeError> {
        if self.fail_destroy {
            return Err(RuntimeError::trap(format!("{destructor} trapped")));
        }
        self.destroyed.push((destructor.to_string(), ptr));
        Ok(())
    }

    fn write_create(&mut self, capacity: u32) -> Result<ForeignPtr, RuntimeError> {
        let cap = capacity.max(WRITE_MIN_CAPACITY);
        let header = self.raw_alloc(WRITE_HEADER, 4)?;
        if header.is_null() {
            return Ok(header);
        }
        let buf = self.raw_alloc(cap, 1)?;
        self.write(header, buf.addr())?;
        self.write(header.offset(4), 0u32)?;
        self.write(header.offset(8), cap)?;
        self.live_writes += 1;
        Ok(header)
    }

    fn write_get_bytes(&mut self, write: ForeignPtr) -> Result<ForeignPtr, RuntimeError> {
        self.read(write).map(ForeignPtr::new)
    }

    fn write_len(&mut self, write: ForeignPtr) -> Result<u32, RuntimeError> {
        self.read(write.offset(4))
    }

    fn write_destroy(&mut self, write: ForeignPtr) -> Result<(), RuntimeError> {
        let buf: u32 = self.read(write)?;
        let cap: u32 = self.read(write.offset(8))?;
        self.raw_free(ForeignPtr::new(buf), cap, 1)?;
        self.raw_free(write, WRITE_HEADER, 4)?;
        self.live_writes -= 1;
        Ok(())
    }

    fn finalizers(&self) -> &FinalizationQueue {
        &self.finalizers
    }
}
