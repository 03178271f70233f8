//! Typed bindings over an ICU4X-style C ABI compiled to WebAssembly.
//!
//! Every wrapper owns an [`Opaque`](ffi_bridge_core::Opaque) handle and
//! exposes the library's methods on it. Methods take the
//! [`ForeignLibrary`](ffi_bridge_core::ForeignLibrary) by `&mut`, open one
//! [`CallScope`](ffi_bridge_core::CallScope) per call and return host
//! values, so nothing staged for a call outlives it.
//!
//! - [`data`]: Data providers and the `DataError` enum
//! - [`normalizer`]: Composing normalization
//! - [`collator`]: Collation and its option structs
//! - [`properties`]: Hangul syllable types and code point sets
//! - [`script`]: Script lookup, owned and borrowed
//! - [`timezone`]: Time zones and UTC offsets
//! - [`iana`]: IANA name parsing with canonical and normalized forms
//! - [`logger`]: Foreign console logger

/// Declare a wrapper around one foreign opaque type.
macro_rules! opaque_wrapper {
    ($(#[$meta:meta])* $name:ident, $destructor:literal) => {
        $(#[$meta])*
        pub struct $name {
            handle: ffi_bridge_core::Opaque,
        }

        impl $name {
            pub(crate) const TYPE: ffi_bridge_core::OpaqueType =
                ffi_bridge_core::OpaqueType::new(stringify!($name), $destructor);

            /// The underlying handle.
            pub fn handle(&self) -> &ffi_bridge_core::Opaque {
                &self.handle
            }

            /// Run the foreign destructor now instead of at drop.
            pub fn dispose(
                &self,
                library: &mut ffi_bridge_core::ForeignLibrary,
            ) -> Result<bool, ffi_bridge_core::RuntimeError> {
                self.handle.dispose(library)
            }
        }

        impl ffi_bridge_core::Retain for $name {
            fn retainer(&self) -> ffi_bridge_core::Retained {
                self.handle.retainer()
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.handle).finish()
            }
        }
    };
}

pub mod collator;
pub mod data;
pub mod iana;
pub mod logger;
pub mod normalizer;
pub mod properties;
pub mod script;
pub mod timezone;

pub use collator::{
    Collator, CollatorAlternateHandling, CollatorCaseFirst, CollatorCaseLevel, CollatorMaxVariable,
    CollatorNumericOrdering, CollatorOptions, CollatorResolvedOptions, CollatorStrength,
};
pub use data::{DataError, DataProvider};
pub use iana::{
    IanaParserExtended, TimeZoneAndCanonical, TimeZoneAndCanonicalAndNormalized, TimeZoneAndCanonicalIterator,
};
pub use logger::Logger;
pub use normalizer::ComposingNormalizer;
pub use properties::{CodePointRangeIterator, CodePointSetData, HangulSyllableType};
pub use script::{ScriptWithExtensions, ScriptWithExtensionsBorrowed};
pub use timezone::{MAX_UTC_OFFSET_SECONDS, TimeZone, UtcOffset, UtcOffsetError, VariantOffsets, VariantOffsetsCalculator};
