//! Strings and slices.
//!
//! Strings cross the boundary as `(ptr, len)` pairs, never NUL-terminated.
//! Lengths count code units: bytes for UTF-8, 16-bit units for UTF-16,
//! elements for scalar slices.

use crate::codec::{Decode, Encode, FfiLayout, Layout};
use crate::foreign::Foreign;
use crate::memory::{ForeignPtr, LinearMemory, Scalar};
use ffi_bridge_common::RuntimeError;

/// A `(ptr, len)` view of a foreign buffer.
///
/// Returned by the staging methods of [`CallScope`](crate::CallScope) and
/// decoded from struct fields of slice type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForeignSlice {
    /// Start of the buffer.
    pub ptr: ForeignPtr,
    /// Length in code units.
    pub len: u32,
}

impl ForeignSlice {
    /// Read the slice as UTF-8.
    ///
    /// # Errors
    ///
    /// Invalid UTF-8 is a `DecodeMismatch` carrying the offset of the first
    /// invalid byte.
    pub fn read_str8<M: LinearMemory + ?Sized>(&self, memory: &M) -> Result<String, RuntimeError> {
        let bytes = memory.read_bytes(self.ptr, self.len as usize)?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_owned()),
            Err(e) => Err(RuntimeError::decode_mismatch(
                "str8",
                i64::try_from(e.valid_up_to()).unwrap_or(i64::MAX),
            )),
        }
    }

    /// Read the slice as UTF-16.
    ///
    /// # Errors
    ///
    /// Unpaired surrogates are a `DecodeMismatch`.
    pub fn read_str16<M: LinearMemory + ?Sized>(&self, memory: &M) -> Result<String, RuntimeError> {
        let units: Vec<u16> = self.read_slice(memory)?;
        String::from_utf16(&units)
            .map_err(|_| RuntimeError::decode_mismatch("str16", i64::from(self.len)))
    }

    /// Copy the slice out as scalars.
    pub fn read_slice<T: Scalar, M: LinearMemory + ?Sized>(&self, memory: &M) -> Result<Vec<T>, RuntimeError> {
        let bytes = memory.read_bytes(self.ptr, self.len as usize * T::SIZE)?;
        Ok(bytes.chunks_exact(T::SIZE).map(T::from_le_slice).collect())
    }

    /// Returns `true` for an empty slice.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FfiLayout for ForeignSlice {
    const LAYOUT: Layout = Layout::new(8, 4);
}

impl Encode for ForeignSlice {
    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, ptr: ForeignPtr) -> Result<(), RuntimeError> {
        memory.write(ptr, self.ptr.addr())?;
        memory.write(ptr.offset(4), self.len)
    }
}

impl Decode for ForeignSlice {
    fn decode<M: LinearMemory + ?Sized>(memory: &M, ptr: ForeignPtr) -> Result<Self, RuntimeError> {
        Ok(Self {
            ptr: ForeignPtr::new(memory.read(ptr)?),
            len: memory.read(ptr.offset(4))?,
        })
    }
}

/// A foreign growable byte sink that receives returned strings.
///
/// Created and released by [`CallScope::write_buffer`](crate::CallScope::write_buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBuffer {
    ptr: ForeignPtr,
}

impl WriteBuffer {
    pub(crate) fn new(ptr: ForeignPtr) -> Self {
        Self { ptr }
    }

    /// The pointer passed to foreign functions.
    pub fn ptr(&self) -> ForeignPtr {
        self.ptr
    }

    /// The bytes written so far.
    pub fn read_bytes<F: Foreign + ?Sized>(&self, foreign: &mut F) -> Result<Vec<u8>, RuntimeError> {
        let data = foreign.write_get_bytes(self.ptr)?;
        let len = foreign.write_len(self.ptr)?;
        Ok(foreign.read_bytes(data, len as usize)?.to_vec())
    }

    /// The contents as a string.
    ///
    /// # Errors
    ///
    /// Invalid UTF-8 is a `DecodeMismatch`.
    pub fn read_string<F: Foreign + ?Sized>(&self, foreign: &mut F) -> Result<String, RuntimeError> {
        let bytes = self.read_bytes(foreign)?;
        String::from_utf8(bytes).map_err(|e| {
            RuntimeError::decode_mismatch(
                "str8",
                i64::try_from(e.utf8_error().valid_up_to()).unwrap_or(i64::MAX),
            )
        })
    }
}

/// Transcode `s` to little-endian UTF-16 bytes.
pub fn encode_utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
