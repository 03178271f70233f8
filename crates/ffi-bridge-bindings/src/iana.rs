//! IANA time zone names.

use ffi_bridge_core::codec::option_flag_offset;
use ffi_bridge_core::{
    CallScope, Decode, Edges, FfiLayout, Foreign, ForeignIter, ForeignLibrary, ForeignPtr, ForeignSlice, Layout,
    LinearMemory, Opaque, OpaqueType, RuntimeError,
};

use crate::data::{DataProvider, construct_with_provider};
use crate::timezone::TimeZone;

opaque_wrapper! {
    /// Parses IANA names, reporting their canonical and normalized forms
    /// alongside the time zone.
    IanaParserExtended, "icu4x_IanaParserExtended_destroy_mv1"
}

/// The result of [`IanaParserExtended::parse`].
///
/// The names are borrowed from the parser's data and decoded on access.
/// The view holds an edge to the parser, which therefore stays alive
/// until the view is dropped.
#[derive(Debug)]
#[non_exhaustive]
pub struct TimeZoneAndCanonicalAndNormalized {
    pub time_zone: TimeZone,
    canonical: ForeignSlice,
    normalized: ForeignSlice,
    edges: Edges,
}

/// One item of [`TimeZoneAndCanonicalIterator`].
#[derive(Debug)]
#[non_exhaustive]
pub struct TimeZoneAndCanonical {
    pub time_zone: TimeZone,
    canonical: ForeignSlice,
    edges: Edges,
}

/// Every canonical IANA name the parser knows.
///
/// Items inherit the iterator's edges, so they keep the parser alive after
/// the iterator is gone.
pub type TimeZoneAndCanonicalIterator = ForeignIter<ForeignLibrary, TimeZoneAndCanonical>;

const NAME_ITERATOR: OpaqueType = OpaqueType::new(
    "TimeZoneAndCanonicalIterator",
    "icu4x_TimeZoneAndCanonicalIterator_destroy_mv1",
);

impl IanaParserExtended {
    /// Load the IANA name tables.
    pub fn create(library: &mut ForeignLibrary, provider: &DataProvider) -> Result<Self, RuntimeError> {
        construct_with_provider(
            library,
            "icu4x_IanaParserExtended_create_with_provider_mv1",
            provider,
            Self::TYPE,
        )
        .map(|handle| Self { handle })
    }

    /// Parse an IANA name, case-insensitively. Unrecognised names give the
    /// unknown zone and empty names.
    pub fn parse(
        &self,
        library: &mut ForeignLibrary,
        value: &str,
    ) -> Result<TimeZoneAndCanonicalAndNormalized, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let value = scope.str8(value)?;
        let value = scope.slice_wrapper(value)?;
        let ret = scope.receive::<RawTimeZoneAndCanonicalAndNormalized>()?;
        scope.call::<(u32, u32, u32), ()>(
            "icu4x_IanaParserExtended_parse_mv1",
            (ret.ptr().addr(), this.addr(), value.addr()),
        )?;

        let parsed = TimeZoneAndCanonicalAndNormalized::adopt(&*scope, ret.ptr(), Edges::of(self))?;
        scope.release()?;

        Ok(parsed)
    }

    /// Iterate over the canonical names.
    pub fn iter(&self, library: &mut ForeignLibrary) -> Result<TimeZoneAndCanonicalIterator, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let ptr: u32 = scope.call("icu4x_IanaParserExtended_iter_mv1", this.addr())?;
        let handle = Opaque::from_raw(
            &*scope,
            NAME_ITERATOR,
            ForeignPtr::new(ptr),
            Edges::new(),
            Edges::of(self),
        );
        scope.release()?;

        Ok(ForeignIter::new(handle, next_name))
    }
}

impl TimeZoneAndCanonicalAndNormalized {
    /// The canonical IANA name, such as `Asia/Kolkata` for `Asia/Calcutta`.
    pub fn canonical<M: LinearMemory + ?Sized>(&self, memory: &M) -> Result<String, RuntimeError> {
        self.canonical.read_str8(memory)
    }

    /// The parsed name with its case normalized.
    pub fn normalized<M: LinearMemory + ?Sized>(&self, memory: &M) -> Result<String, RuntimeError> {
        self.normalized.read_str8(memory)
    }

    pub fn edges(&self) -> &Edges {
        &self.edges
    }

    /// Take ownership of the zone written at `ptr`. The zone is wrapped
    /// before the names are read so a bad read still frees it.
    fn adopt<F: Foreign + ?Sized>(foreign: &F, ptr: ForeignPtr, edges: Edges) -> Result<Self, RuntimeError> {
        let time_zone = TimeZone::adopt(foreign, ForeignPtr::decode(foreign, ptr)?);

        Ok(Self {
            time_zone,
            canonical: ForeignSlice::decode(foreign, ptr.offset(RawTimeZoneAndCanonicalAndNormalized::CANONICAL))?,
            normalized: ForeignSlice::decode(foreign, ptr.offset(RawTimeZoneAndCanonicalAndNormalized::NORMALIZED))?,
            edges,
        })
    }
}

impl TimeZoneAndCanonical {
    /// The canonical IANA name.
    pub fn canonical<M: LinearMemory + ?Sized>(&self, memory: &M) -> Result<String, RuntimeError> {
        self.canonical.read_str8(memory)
    }

    pub fn edges(&self) -> &Edges {
        &self.edges
    }

    /// Take ownership of the item written at `ptr`, an
    /// `Option<RawTimeZoneAndCanonical>`.
    fn adopt<F: Foreign + ?Sized>(foreign: &F, ptr: ForeignPtr, edges: &Edges) -> Result<Option<Self>, RuntimeError> {
        if !foreign.read_bool(ptr.offset(option_flag_offset(RawTimeZoneAndCanonical::LAYOUT)))? {
            return Ok(None);
        }

        let time_zone = TimeZone::adopt(foreign, ForeignPtr::decode(foreign, ptr)?);

        Ok(Some(Self {
            time_zone,
            canonical: ForeignSlice::decode(foreign, ptr.offset(RawTimeZoneAndCanonical::CANONICAL))?,
            edges: Edges::builder().inherit(edges).build(),
        }))
    }
}

/// Zone pointer at 0, then the canonical and normalized names.
struct RawTimeZoneAndCanonicalAndNormalized;

impl RawTimeZoneAndCanonicalAndNormalized {
    const CANONICAL: u32 = 4;
    const NORMALIZED: u32 = 12;
}

impl FfiLayout for RawTimeZoneAndCanonicalAndNormalized {
    const LAYOUT: Layout = Layout::new(20, 4);
}

struct RawTimeZoneAndCanonical;

impl RawTimeZoneAndCanonical {
    const CANONICAL: u32 = 4;
}

impl FfiLayout for RawTimeZoneAndCanonical {
    const LAYOUT: Layout = Layout::new(12, 4);
}

fn next_name(
    scope: &mut CallScope<'_, ForeignLibrary>,
    iter: ForeignPtr,
    edges: &Edges,
) -> Result<Option<TimeZoneAndCanonical>, RuntimeError> {
    let ret = scope.receive::<Option<RawTimeZoneAndCanonical>>()?;
    scope.call::<(u32, u32), ()>(
        "icu4x_TimeZoneAndCanonicalIterator_next_mv1",
        (ret.ptr().addr(), iter.addr()),
    )?;

    TimeZoneAndCanonical::adopt(&**scope, ret.ptr(), edges)
}
