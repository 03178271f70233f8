//! Time zones and their UTC offsets.

use ffi_bridge_core::codec::{bool_from_abi, data_error, option_flag_offset, raise};
use ffi_bridge_core::{
    CallScope, Decode, FfiLayout, Foreign, ForeignLibrary, ForeignPtr, Layout, Opaque, RuntimeError, ffi_enum,
};

use crate::data::{DataError, DataProvider};

opaque_wrapper! {
    /// A time zone identified by its BCP-47 ID.
    TimeZone, "icu4x_TimeZone_destroy_mv1"
}

opaque_wrapper! {
    /// An offset from UTC, in seconds.
    UtcOffset, "icu4x_UtcOffset_destroy_mv1"
}

opaque_wrapper! {
    /// Computes the standard and daylight offsets of a time zone.
    VariantOffsetsCalculator, "icu4x_VariantOffsetsCalculator_destroy_mv1"
}

ffi_enum! {
    /// Why the library refused to build a [`UtcOffset`]. The ABI reports
    /// the failure without a payload, so there is a single cause.
    pub enum UtcOffsetError {
        OutOfRange = 0,
    }
}

/// Largest offset from UTC the library accepts, in either direction.
pub const MAX_UTC_OFFSET_SECONDS: i32 = 18 * 60 * 60;

/// Offsets a time zone uses around some instant.
#[derive(Debug)]
#[non_exhaustive]
pub struct VariantOffsets {
    pub standard: UtcOffset,
    pub daylight: Option<UtcOffset>,
}

impl TimeZone {
    /// Look up a zone by BCP-47 ID, such as `usnyc`. Unrecognised IDs give
    /// the unknown zone.
    pub fn from_bcp47(library: &mut ForeignLibrary, id: &str) -> Result<Self, RuntimeError> {
        let mut scope = CallScope::new(library);
        let id = scope.str8(id)?;
        let ptr: u32 = scope.call("icu4x_TimeZone_create_from_bcp47_mv1", (id.ptr.addr(), id.len))?;
        let zone = Self::adopt(&*scope, ForeignPtr::new(ptr));
        scope.release()?;

        Ok(zone)
    }

    /// Take ownership of a zone the library returned.
    pub(crate) fn adopt<F: Foreign + ?Sized>(foreign: &F, ptr: ForeignPtr) -> Self {
        Self {
            handle: Opaque::owned(foreign, Self::TYPE, ptr),
        }
    }

    /// Whether this is the unknown zone.
    pub fn is_unknown(&self, library: &mut ForeignLibrary) -> Result<bool, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let raw: i32 = scope.call("icu4x_TimeZone_is_unknown_mv1", this.addr())?;
        scope.release()?;

        bool_from_abi(raw)
    }
}

impl UtcOffset {
    /// An offset of `seconds` east of UTC.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, without calling the library, for offsets beyond
    /// [`MAX_UTC_OFFSET_SECONDS`]. A rejection by the library itself is a
    /// `DataError` with cause [`UtcOffsetError::OutOfRange`].
    pub fn from_seconds(library: &mut ForeignLibrary, seconds: i32) -> Result<Self, RuntimeError> {
        if seconds.unsigned_abs() > MAX_UTC_OFFSET_SECONDS.unsigned_abs() {
            return Err(RuntimeError::invalid_argument(format!(
                "UTC offset out of range: {seconds}s"
            )));
        }

        let mut scope = CallScope::new(library);
        let ret = scope.receive::<Result<ForeignPtr, ()>>()?;
        scope.call::<(u32, i32), ()>("icu4x_UtcOffset_from_seconds_mv1", (ret.ptr().addr(), seconds))?;

        let ptr = offset_result(ret.read(&*scope)?)?;
        let handle = Opaque::owned(&*scope, Self::TYPE, ptr);
        scope.release()?;

        Ok(Self { handle })
    }

    /// The offset in seconds.
    pub fn seconds(&self, library: &mut ForeignLibrary) -> Result<i32, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let seconds = scope.call("icu4x_UtcOffset_seconds_mv1", this.addr())?;
        scope.release()?;
        Ok(seconds)
    }
}

impl VariantOffsetsCalculator {
    /// Load the zone offset data.
    pub fn create(library: &mut ForeignLibrary, provider: &DataProvider) -> Result<Self, RuntimeError> {
        let provider = provider.handle().ptr()?;

        let mut scope = CallScope::new(library);
        let ret = scope.receive::<Result<ForeignPtr, DataError>>()?;
        scope.call::<(u32, u32), ()>(
            "icu4x_VariantOffsetsCalculator_create_mv1",
            (ret.ptr().addr(), provider.addr()),
        )?;

        let ptr = raise(ret.read(&*scope)?)?;
        let handle = Opaque::owned(&*scope, Self::TYPE, ptr);
        scope.release()?;

        Ok(Self { handle })
    }

    /// The offsets of `zone` around `timestamp_ms` (milliseconds since the
    /// Unix epoch), or `None` for the unknown zone.
    pub fn compute_offsets_from_time_zone_and_timestamp(
        &self,
        library: &mut ForeignLibrary,
        zone: &TimeZone,
        timestamp_ms: i64,
    ) -> Result<Option<VariantOffsets>, RuntimeError> {
        let this = self.handle.ptr()?;
        let zone = zone.handle().ptr()?;

        let mut scope = CallScope::new(library);
        let ret = scope.receive::<Option<RawVariantOffsets>>()?;
        scope.call::<(u32, u32, u32, i64), ()>(
            "icu4x_VariantOffsetsCalculator_compute_offsets_from_time_zone_and_timestamp_mv1",
            (ret.ptr().addr(), this.addr(), zone.addr(), timestamp_ms),
        )?;

        let offsets = VariantOffsets::adopt(&*scope, ret.ptr())?;
        scope.release()?;

        Ok(offsets)
    }
}

fn offset_result(envelope: Result<ForeignPtr, ()>) -> Result<ForeignPtr, RuntimeError> {
    envelope.map_err(|()| data_error(UtcOffsetError::OutOfRange))
}

/// [`VariantOffsets`] as laid out in foreign memory: `standard` at 0, then
/// `daylight` as an optional pointer (flag at 8).
struct RawVariantOffsets;

impl RawVariantOffsets {
    const STANDARD: u32 = 0;
    const DAYLIGHT: u32 = 4;
}

impl FfiLayout for RawVariantOffsets {
    const LAYOUT: Layout = Layout::new(12, 4);
}

impl VariantOffsets {
    /// Take ownership of the offsets written at `ptr`, an
    /// `Option<RawVariantOffsets>`.
    ///
    /// Each pointer is wrapped as soon as it is read, so a malformed field
    /// after it still leaves the earlier objects to be destroyed.
    fn adopt<F: Foreign + ?Sized>(foreign: &F, ptr: ForeignPtr) -> Result<Option<Self>, RuntimeError> {
        if !foreign.read_bool(ptr.offset(option_flag_offset(RawVariantOffsets::LAYOUT)))? {
            return Ok(None);
        }

        let standard = UtcOffset {
            handle: Opaque::owned(
                foreign,
                UtcOffset::TYPE,
                ForeignPtr::decode(foreign, ptr.offset(RawVariantOffsets::STANDARD))?,
            ),
        };
        let daylight = Option::<ForeignPtr>::decode(foreign, ptr.offset(RawVariantOffsets::DAYLIGHT))?.map(|daylight| {
            UtcOffset {
                handle: Opaque::owned(foreign, UtcOffset::TYPE, daylight),
            }
        });

        Ok(Some(Self { standard, daylight }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffi_bridge_core::ForeignErrorExt;

    #[test]
    fn test_variant_offsets_layout() {
        let computed = Layout::for_struct(&[ForeignPtr::LAYOUT, <Option<ForeignPtr>>::LAYOUT]);
        assert_eq!(computed.offsets, vec![0, 4]);
        assert_eq!(computed.layout, RawVariantOffsets::LAYOUT);

        // Presence flag of the whole struct follows it.
        assert_eq!(<Option<RawVariantOffsets>>::LAYOUT, Layout::new(16, 4));
    }

    #[test]
    fn test_unit_error_envelope_layout() {
        assert_eq!(<Result<ForeignPtr, ()>>::LAYOUT, Layout::new(8, 4));
    }

    #[test]
    fn test_foreign_offset_rejection_is_typed() {
        assert_eq!(offset_result(Ok(ForeignPtr::new(40))).unwrap(), ForeignPtr::new(40));

        let err = offset_result(Err(())).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.foreign_cause::<UtcOffsetError>(), Some(UtcOffsetError::OutOfRange));
    }
}
