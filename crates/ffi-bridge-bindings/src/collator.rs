//! Collation.
//!
//! [`CollatorOptions`] is staged by pointer as four optional enums (8 bytes
//! each: discriminant, then presence flag). [`CollatorResolvedOptions`] is
//! returned through a 24-byte receive buffer holding six discriminants.

use std::cmp::Ordering;

use ffi_bridge_core::codec::raise;
use ffi_bridge_core::{
    CallScope, Decode, Encode, FfiLayout, ForeignLibrary, ForeignPtr, Layout, LinearMemory, Opaque, RuntimeError,
    ffi_enum,
};

use crate::data::{DataError, DataProvider};

ffi_enum! {
    /// Which differences are significant when comparing.
    pub enum CollatorStrength {
        Primary = 0,
        Secondary = 1,
        Tertiary = 2,
        Quaternary = 3,
        Identical = 4,
    }
}

ffi_enum! {
    /// Whether variable characters (spaces, punctuation) are ignorable.
    pub enum CollatorAlternateHandling {
        NonIgnorable = 0,
        Shifted = 1,
    }
}

ffi_enum! {
    /// Which case sorts first at the tertiary level.
    pub enum CollatorCaseFirst {
        Off = 0,
        Lower = 1,
        Upper = 2,
    }
}

ffi_enum! {
    /// The highest character class treated as variable.
    pub enum CollatorMaxVariable {
        Space = 0,
        Punctuation = 1,
        Symbol = 2,
        Currency = 3,
    }
}

ffi_enum! {
    /// Whether a separate case level is inserted below secondary strength.
    pub enum CollatorCaseLevel {
        Off = 0,
        On = 1,
    }
}

ffi_enum! {
    /// Whether digit sequences compare by numeric value.
    pub enum CollatorNumericOrdering {
        Off = 0,
        On = 1,
    }
}

/// Options for [`Collator::create`]. Unset fields keep the defaults of the
/// collation data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollatorOptions {
    pub strength: Option<CollatorStrength>,
    pub alternate_handling: Option<CollatorAlternateHandling>,
    pub max_variable: Option<CollatorMaxVariable>,
    pub case_level: Option<CollatorCaseLevel>,
}

impl CollatorOptions {
    /// Options with only the strength set.
    pub fn with_strength(strength: CollatorStrength) -> Self {
        Self {
            strength: Some(strength),
            ..Self::default()
        }
    }
}

impl FfiLayout for CollatorOptions {
    const LAYOUT: Layout = Layout::new(32, 4);
}

impl Encode for CollatorOptions {
    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, ptr: ForeignPtr) -> Result<(), RuntimeError> {
        self.strength.encode(memory, ptr)?;
        self.alternate_handling.encode(memory, ptr.offset(8))?;
        self.max_variable.encode(memory, ptr.offset(16))?;
        self.case_level.encode(memory, ptr.offset(24))
    }
}

/// The options a collator actually uses, after defaults are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct CollatorResolvedOptions {
    pub strength: CollatorStrength,
    pub alternate_handling: CollatorAlternateHandling,
    pub case_first: CollatorCaseFirst,
    pub max_variable: CollatorMaxVariable,
    pub case_level: CollatorCaseLevel,
    pub numeric: CollatorNumericOrdering,
}

impl FfiLayout for CollatorResolvedOptions {
    const LAYOUT: Layout = Layout::new(24, 4);
}

impl Decode for CollatorResolvedOptions {
    fn decode<M: LinearMemory + ?Sized>(memory: &M, ptr: ForeignPtr) -> Result<Self, RuntimeError> {
        Ok(Self {
            strength: CollatorStrength::decode(memory, ptr)?,
            alternate_handling: CollatorAlternateHandling::decode(memory, ptr.offset(4))?,
            case_first: CollatorCaseFirst::decode(memory, ptr.offset(8))?,
            max_variable: CollatorMaxVariable::decode(memory, ptr.offset(12))?,
            case_level: CollatorCaseLevel::decode(memory, ptr.offset(16))?,
            numeric: CollatorNumericOrdering::decode(memory, ptr.offset(20))?,
        })
    }
}

opaque_wrapper! {
    /// Locale-aware string comparison.
    Collator, "icu4x_Collator_destroy_mv1"
}

impl Collator {
    /// Create a collator for the root collation order.
    pub fn create(
        library: &mut ForeignLibrary,
        provider: &DataProvider,
        options: CollatorOptions,
    ) -> Result<Self, RuntimeError> {
        let provider = provider.handle().ptr()?;

        let mut scope = CallScope::new(library);
        let options = scope.stage(&options)?;
        let ret = scope.receive::<Result<ForeignPtr, DataError>>()?;
        scope.call::<(u32, u32, u32), ()>(
            "icu4x_Collator_create_v1_mv1",
            (ret.ptr().addr(), provider.addr(), options.addr()),
        )?;

        let ptr = raise(ret.read(&*scope)?)?;
        let handle = Opaque::owned(&*scope, Self::TYPE, ptr);
        scope.release()?;

        Ok(Self { handle })
    }

    /// Compare two strings.
    pub fn compare(&self, library: &mut ForeignLibrary, left: &str, right: &str) -> Result<Ordering, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let left = scope.str8(left)?;
        let right = scope.str8(right)?;
        let raw: i32 = scope.call(
            "icu4x_Collator_compare_utf8_mv1",
            (this.addr(), left.ptr.addr(), left.len, right.ptr.addr(), right.len),
        )?;
        scope.release()?;

        ordering_from_abi(raw)
    }

    /// The options in effect.
    pub fn resolved_options(&self, library: &mut ForeignLibrary) -> Result<CollatorResolvedOptions, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let ret = scope.receive::<CollatorResolvedOptions>()?;
        scope.call::<(u32, u32), ()>("icu4x_Collator_resolved_options_v1_mv1", (ret.ptr().addr(), this.addr()))?;

        let resolved = ret.read(&*scope)?;
        scope.release()?;
        Ok(resolved)
    }
}

fn ordering_from_abi(raw: i32) -> Result<Ordering, RuntimeError> {
    match raw {
        -1 => Ok(Ordering::Less),
        0 => Ok(Ordering::Equal),
        1 => Ok(Ordering::Greater),
        other => Err(RuntimeError::decode_mismatch("Ordering", other)),
    }
}
