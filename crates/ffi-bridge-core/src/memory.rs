//! Linear memory access layer.
//!
//! All host access to foreign memory goes through [`LinearMemory`]. The
//! backing slice is re-derived from the implementor on every access, so a
//! memory that grew (and possibly moved) during the previous foreign call is
//! always observed at its current base and bound.
//!
//! Offsets are taken as given: there is no implicit alignment correction,
//! callers supply layout-correct offsets.

use std::fmt;
use std::ops::Range;

use ffi_bridge_common::RuntimeError;

/// An offset into the shared linear memory denoting foreign-owned data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForeignPtr(u32);

impl ForeignPtr {
    /// The null pointer, also used as the "already released" sentinel.
    pub const NULL: Self = Self(0);

    /// Wrap a raw address.
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// The raw address, as passed to foreign functions.
    pub const fn addr(self) -> u32 {
        self.0
    }

    /// Returns `true` for the null pointer.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Pointer `bytes` past this one.
    ///
    /// Saturates at `u32::MAX`; the bounds check of the following access
    /// rejects the result.
    #[must_use]
    pub const fn offset(self, bytes: u32) -> Self {
        Self(self.0.saturating_add(bytes))
    }
}

impl fmt::Display for ForeignPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Fixed-width little-endian values readable from linear memory.
pub trait Scalar: Copy + Sized {
    /// Width in bytes.
    const SIZE: usize;

    /// Decode from exactly `SIZE` little-endian bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Encode into exactly `SIZE` bytes.
    fn write_le(self, out: &mut [u8]);
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Integer widths understood by [`LinearMemory::read_int`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    /// Width in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            IntWidth::W8 => 1,
            IntWidth::W16 => 2,
            IntWidth::W32 => 4,
            IntWidth::W64 => 8,
        }
    }
}

/// Byte-addressed view of a foreign linear memory.
///
/// Implementors only provide the raw slices; every typed accessor is built on
/// [`read_bytes`](LinearMemory::read_bytes) and
/// [`write_bytes`](LinearMemory::write_bytes), which perform the bounds check.
pub trait LinearMemory {
    /// The current memory contents.
    fn bytes(&self) -> &[u8];

    /// The current memory contents, mutably.
    fn bytes_mut(&mut self) -> &mut [u8];

    /// Current memory size in bytes.
    fn size(&self) -> usize {
        self.bytes().len()
    }

    /// Borrow `len` bytes starting at `ptr`.
    fn read_bytes(&self, ptr: ForeignPtr, len: usize) -> Result<&[u8], RuntimeError> {
        let range = checked_range(ptr, len, self.size())?;
        Ok(&self.bytes()[range])
    }

    /// Copy `data` into memory starting at `ptr`.
    fn write_bytes(&mut self, ptr: ForeignPtr, data: &[u8]) -> Result<(), RuntimeError> {
        let range = checked_range(ptr, data.len(), self.size())?;
        self.bytes_mut()[range].copy_from_slice(data);
        Ok(())
    }

    /// Read a little-endian scalar at `ptr`.
    fn read<T: Scalar>(&self, ptr: ForeignPtr) -> Result<T, RuntimeError> {
        self.read_bytes(ptr, T::SIZE).map(T::from_le_slice)
    }

    /// Write a little-endian scalar at `ptr`.
    fn write<T: Scalar>(&mut self, ptr: ForeignPtr, value: T) -> Result<(), RuntimeError> {
        let mut raw = [0u8; 8];
        value.write_le(&mut raw[..T::SIZE]);
        self.write_bytes(ptr, &raw[..T::SIZE])
    }

    /// Read a one-byte boolean. Any byte other than 0 or 1 is a decode mismatch.
    fn read_bool(&self, ptr: ForeignPtr) -> Result<bool, RuntimeError> {
        match self.read::<u8>(ptr)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(RuntimeError::decode_mismatch("bool", other)),
        }
    }

    /// Read an integer of the given width, sign- or zero-extended to `i64`.
    ///
    /// Unsigned 64-bit values are returned bit-for-bit.
    #[allow(clippy::cast_possible_wrap)]
    fn read_int(&self, ptr: ForeignPtr, width: IntWidth, signed: bool) -> Result<i64, RuntimeError> {
        Ok(match (width, signed) {
            (IntWidth::W8, true) => i64::from(self.read::<i8>(ptr)?),
            (IntWidth::W8, false) => i64::from(self.read::<u8>(ptr)?),
            (IntWidth::W16, true) => i64::from(self.read::<i16>(ptr)?),
            (IntWidth::W16, false) => i64::from(self.read::<u16>(ptr)?),
            (IntWidth::W32, true) => i64::from(self.read::<i32>(ptr)?),
            (IntWidth::W32, false) => i64::from(self.read::<u32>(ptr)?),
            (IntWidth::W64, true) => self.read::<i64>(ptr)?,
            (IntWidth::W64, false) => self.read::<u64>(ptr)? as i64,
        })
    }

    /// Write the low `width` bytes of `value`.
    #[allow(clippy::cast_possible_truncation)]
    fn write_int(&mut self, ptr: ForeignPtr, width: IntWidth, value: i64) -> Result<(), RuntimeError> {
        match width {
            IntWidth::W8 => self.write(ptr, value as u8),
            IntWidth::W16 => self.write(ptr, value as u16),
            IntWidth::W32 => self.write(ptr, value as u32),
            IntWidth::W64 => self.write(ptr, value),
        }
    }
}

impl LinearMemory for [u8] {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

impl LinearMemory for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

/// Validate `[ptr, ptr + len)` against a memory of `size` bytes.
pub fn checked_range(ptr: ForeignPtr, len: usize, size: usize) -> Result<Range<usize>, RuntimeError> {
    let start = ptr.addr() as usize;
    match start.checked_add(len) {
        Some(end) if end <= size => Ok(start..end),
        _ => Err(RuntimeError::out_of_bounds(
            u64::from(ptr.addr()),
            len as u64,
            size,
        )),
    }
}
