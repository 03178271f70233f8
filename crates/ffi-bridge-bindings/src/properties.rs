//! Character properties.

use std::ops::RangeInclusive;

use ffi_bridge_core::codec::bool_from_abi;
use ffi_bridge_core::{
    CallScope, Decode, Edges, FfiEnum, FfiLayout, ForeignIter, ForeignLibrary, ForeignPtr, Layout, LinearMemory,
    Opaque, OpaqueType, RuntimeError, ffi_enum,
};

use crate::data::{DataProvider, construct_with_provider};

ffi_enum! {
    /// The Hangul_Syllable_Type property.
    pub enum HangulSyllableType {
        NotApplicable = 0,
        LeadingJamo = 1,
        VowelJamo = 2,
        TrailingJamo = 3,
        LeadingVowelSyllable = 4,
        LeadingVowelTrailingSyllable = 5,
    }
}

impl HangulSyllableType {
    /// The property value of `ch`.
    pub fn for_char(library: &mut ForeignLibrary, ch: char) -> Result<Self, RuntimeError> {
        let mut scope = CallScope::new(library);
        let raw: i32 = scope.call("icu4x_HangulSyllableType_for_char_mv1", u32::from(ch))?;
        scope.release()?;

        Self::from_discriminant(raw).ok_or_else(|| RuntimeError::decode_mismatch(Self::NAME, raw))
    }

    /// The ICU4C integer value of this variant.
    pub fn to_integer_value(self, library: &mut ForeignLibrary) -> Result<u8, RuntimeError> {
        let mut scope = CallScope::new(library);
        let raw: u32 = scope.call("icu4x_HangulSyllableType_to_integer_value_mv1", self.discriminant())?;
        scope.release()?;

        u8::try_from(raw).map_err(|_| RuntimeError::decode_mismatch("u8", raw))
    }

    /// The variant for an ICU4C integer value, if there is one.
    pub fn from_integer_value(library: &mut ForeignLibrary, value: u8) -> Result<Option<Self>, RuntimeError> {
        let mut scope = CallScope::new(library);
        let ret = scope.receive::<Option<Self>>()?;
        scope.call::<(u32, u32), ()>(
            "icu4x_HangulSyllableType_from_integer_value_mv1",
            (ret.ptr().addr(), u32::from(value)),
        )?;

        let variant = ret.read(&*scope)?;
        scope.release()?;
        Ok(variant)
    }
}

opaque_wrapper! {
    /// A set of code points sharing a binary property.
    CodePointSetData, "icu4x_CodePointSetData_destroy_mv1"
}

/// Ranges of a [`CodePointSetData`], in ascending order.
///
/// Holds an edge to the set, which therefore stays alive until the
/// iterator is dropped.
pub type CodePointRangeIterator = ForeignIter<ForeignLibrary, RangeInclusive<char>>;

const RANGE_ITERATOR: OpaqueType =
    OpaqueType::new("CodePointRangeIterator", "icu4x_CodePointRangeIterator_destroy_mv1");

impl CodePointSetData {
    /// The ASCII_Hex_Digit property.
    pub fn create_ascii_hex_digit(library: &mut ForeignLibrary, provider: &DataProvider) -> Result<Self, RuntimeError> {
        construct_with_provider(
            library,
            "icu4x_CodePointSetData_create_ascii_hex_digit_with_provider_mv1",
            provider,
            Self::TYPE,
        )
        .map(|handle| Self { handle })
    }

    /// Whether `ch` is in the set.
    pub fn contains(&self, library: &mut ForeignLibrary, ch: char) -> Result<bool, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let raw: i32 = scope.call("icu4x_CodePointSetData_contains_mv1", (this.addr(), u32::from(ch)))?;
        scope.release()?;

        bool_from_abi(raw)
    }

    /// Iterate over the ranges of the set.
    pub fn iter_ranges(&self, library: &mut ForeignLibrary) -> Result<CodePointRangeIterator, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let ptr: u32 = scope.call("icu4x_CodePointSetData_iter_ranges_mv1", this.addr())?;
        let handle = Opaque::from_raw(
            &*scope,
            RANGE_ITERATOR,
            ForeignPtr::new(ptr),
            Edges::new(),
            Edges::of(self),
        );
        scope.release()?;

        Ok(ForeignIter::new(handle, next_range))
    }
}

/// One result of the range iterator's `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RangeStep {
    start: char,
    end: char,
    done: bool,
}

impl FfiLayout for RangeStep {
    const LAYOUT: Layout = Layout::new(12, 4);
}

impl Decode for RangeStep {
    fn decode<M: LinearMemory + ?Sized>(memory: &M, ptr: ForeignPtr) -> Result<Self, RuntimeError> {
        Ok(Self {
            start: char::decode(memory, ptr)?,
            end: char::decode(memory, ptr.offset(4))?,
            done: bool::decode(memory, ptr.offset(8))?,
        })
    }
}

fn next_range(
    scope: &mut CallScope<'_, ForeignLibrary>,
    iter: ForeignPtr,
    _edges: &Edges,
) -> Result<Option<RangeInclusive<char>>, RuntimeError> {
    let ret = scope.receive::<RangeStep>()?;
    scope.call::<(u32, u32), ()>("icu4x_CodePointRangeIterator_next_mv1", (ret.ptr().addr(), iter.addr()))?;

    let step = ret.read(&**scope)?;
    Ok((!step.done).then_some(step.start..=step.end))
}
