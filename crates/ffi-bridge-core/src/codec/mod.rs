//! Value codec between host values and foreign memory layouts.
//!
//! Every value that crosses the boundary in memory (as opposed to as a
//! plain call argument) has a fixed [`Layout`]. [`Encode`] writes a value at
//! a layout-correct address, [`Decode`] reads one back. Aggregates are built
//! by composing field codecs at fixed offsets:
//!
//! ```ignore
//! impl Decode for Range {
//!     fn decode<M: LinearMemory + ?Sized>(memory: &M, ptr: ForeignPtr) -> Result<Self, RuntimeError> {
//!         Ok(Self {
//!             start: char::decode(memory, ptr)?,
//!             end: char::decode(memory, ptr.offset(4))?,
//!         })
//!     }
//! }
//! ```
//!
//! Discriminants, flags and code points are validated on decode: a value
//! outside its closed set is a [`RuntimeError::DecodeMismatch`].

mod enums;
mod envelope;
mod layout;
mod string;

pub use enums::{FfiEnum, ForeignErrorExt, data_error, raise};
pub use envelope::{option_flag_offset, result_flag_offset};
pub use layout::{Layout, StructLayout, align_up, checked_align_up};
pub use string::{ForeignSlice, WriteBuffer, encode_utf16};

use crate::memory::{ForeignPtr, LinearMemory, Scalar};
use ffi_bridge_common::RuntimeError;

/// Types with a fixed foreign layout.
pub trait FfiLayout {
    /// Size and alignment in foreign memory.
    const LAYOUT: Layout;
}

/// Host values that can be written into foreign memory.
pub trait Encode: FfiLayout {
    /// Write `self` at `ptr`.
    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, ptr: ForeignPtr) -> Result<(), RuntimeError>;
}

/// Host values that can be read out of foreign memory.
pub trait Decode: FfiLayout + Sized {
    /// Read a value at `ptr`.
    fn decode<M: LinearMemory + ?Sized>(memory: &M, ptr: ForeignPtr) -> Result<Self, RuntimeError>;
}

macro_rules! impl_scalar_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FfiLayout for $ty {
                #[allow(clippy::cast_possible_truncation)]
                const LAYOUT: Layout = Layout::new(
                    <$ty as Scalar>::SIZE as u32,
                    <$ty as Scalar>::SIZE as u32,
                );
            }

            impl Encode for $ty {
                fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, ptr: ForeignPtr) -> Result<(), RuntimeError> {
                    memory.write(ptr, *self)
                }
            }

            impl Decode for $ty {
                fn decode<M: LinearMemory + ?Sized>(memory: &M, ptr: ForeignPtr) -> Result<Self, RuntimeError> {
                    memory.read(ptr)
                }
            }
        )*
    };
}

impl_scalar_codec!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl FfiLayout for bool {
    const LAYOUT: Layout = Layout::new(1, 1);
}

impl Encode for bool {
    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, ptr: ForeignPtr) -> Result<(), RuntimeError> {
        memory.write(ptr, u8::from(*self))
    }
}

impl Decode for bool {
    fn decode<M: LinearMemory + ?Sized>(memory: &M, ptr: ForeignPtr) -> Result<Self, RuntimeError> {
        memory.read_bool(ptr)
    }
}

/// Code points travel as 32-bit Unicode scalar values.
impl FfiLayout for char {
    const LAYOUT: Layout = Layout::new(4, 4);
}

impl Encode for char {
    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, ptr: ForeignPtr) -> Result<(), RuntimeError> {
        memory.write(ptr, u32::from(*self))
    }
}

impl Decode for char {
    fn decode<M: LinearMemory + ?Sized>(memory: &M, ptr: ForeignPtr) -> Result<Self, RuntimeError> {
        let raw: u32 = memory.read(ptr)?;
        char::from_u32(raw).ok_or_else(|| RuntimeError::decode_mismatch("char", raw))
    }
}

impl FfiLayout for ForeignPtr {
    const LAYOUT: Layout = Layout::new(4, 4);
}

impl Encode for ForeignPtr {
    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, ptr: ForeignPtr) -> Result<(), RuntimeError> {
        memory.write(ptr, self.addr())
    }
}

impl Decode for ForeignPtr {
    fn decode<M: LinearMemory + ?Sized>(memory: &M, ptr: ForeignPtr) -> Result<Self, RuntimeError> {
        memory.read(ptr).map(ForeignPtr::new)
    }
}

impl FfiLayout for () {
    const LAYOUT: Layout = Layout::ZERO;
}

impl Encode for () {
    fn encode<M: LinearMemory + ?Sized>(&self, _memory: &mut M, _ptr: ForeignPtr) -> Result<(), RuntimeError> {
        Ok(())
    }
}

impl Decode for () {
    fn decode<M: LinearMemory + ?Sized>(_memory: &M, _ptr: ForeignPtr) -> Result<Self, RuntimeError> {
        Ok(())
    }
}

/// Interpret a boolean returned directly from a foreign call.
pub fn bool_from_abi(raw: i32) -> Result<bool, RuntimeError> {
    match raw {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RuntimeError::decode_mismatch("bool", other)),
    }
}
