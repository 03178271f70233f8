//! Option and result envelopes.
//!
//! Both put the payload at offset 0 and a one-byte flag after it. For
//! options the flag marks presence; for results the payload region is a
//! union of the success and error types and the flag selects the success
//! side. Decoding always reads the flag first and then exactly one region,
//! so an absent payload or the unselected side of the union is never
//! touched.

use crate::codec::{Decode, Encode, FfiLayout, Layout};
use crate::memory::{ForeignPtr, LinearMemory};
use ffi_bridge_common::RuntimeError;

/// Offset of the presence flag of an option around `payload`.
pub const fn option_flag_offset(payload: Layout) -> u32 {
    payload.size
}

/// Offset of the success flag of a result over `ok` and `err`.
pub const fn result_flag_offset(ok: Layout, err: Layout) -> u32 {
    ok.union(err).pad_to_align().size
}

impl<T: FfiLayout> FfiLayout for Option<T> {
    const LAYOUT: Layout = Layout::new(option_flag_offset(T::LAYOUT) + 1, T::LAYOUT.align).pad_to_align();
}

impl<T: Encode> Encode for Option<T> {
    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, ptr: ForeignPtr) -> Result<(), RuntimeError> {
        let flag = ptr.offset(option_flag_offset(T::LAYOUT));
        match self {
            Some(value) => {
                value.encode(memory, ptr)?;
                memory.write(flag, 1u8)
            }
            None => {
                memory.write_bytes(ptr, &vec![0; T::LAYOUT.size as usize])?;
                memory.write(flag, 0u8)
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode<M: LinearMemory + ?Sized>(memory: &M, ptr: ForeignPtr) -> Result<Self, RuntimeError> {
        if memory.read_bool(ptr.offset(option_flag_offset(T::LAYOUT)))? {
            T::decode(memory, ptr).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl<T: FfiLayout, E: FfiLayout> FfiLayout for Result<T, E> {
    const LAYOUT: Layout = Layout::new(
        result_flag_offset(T::LAYOUT, E::LAYOUT) + 1,
        T::LAYOUT.union(E::LAYOUT).align,
    )
    .pad_to_align();
}

impl<T: Encode, E: Encode> Encode for Result<T, E> {
    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, ptr: ForeignPtr) -> Result<(), RuntimeError> {
        let flag = ptr.offset(result_flag_offset(T::LAYOUT, E::LAYOUT));
        match self {
            Ok(value) => {
                value.encode(memory, ptr)?;
                memory.write(flag, 1u8)
            }
            Err(error) => {
                error.encode(memory, ptr)?;
                memory.write(flag, 0u8)
            }
        }
    }
}

impl<T: Decode, E: Decode> Decode for Result<T, E> {
    fn decode<M: LinearMemory + ?Sized>(memory: &M, ptr: ForeignPtr) -> Result<Self, RuntimeError> {
        let flag = ptr.offset(result_flag_offset(T::LAYOUT, E::LAYOUT));
        if memory.read_bool(flag)? {
            T::decode(memory, ptr).map(Ok)
        } else {
            E::decode(memory, ptr).map(Err)
        }
    }
}
