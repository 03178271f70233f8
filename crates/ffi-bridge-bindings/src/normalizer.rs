//! Composing normalization (NFC and NFKC).

use ffi_bridge_core::codec::bool_from_abi;
use ffi_bridge_core::{CallScope, ForeignLibrary, RuntimeError};

use crate::data::{DataProvider, construct_with_provider};

opaque_wrapper! {
    /// A normalizer to one of the composed forms.
    ComposingNormalizer, "icu4x_ComposingNormalizer_destroy_mv1"
}

impl ComposingNormalizer {
    /// Normalizer to Normalization Form C.
    pub fn create_nfc(library: &mut ForeignLibrary, provider: &DataProvider) -> Result<Self, RuntimeError> {
        construct_with_provider(library, "icu4x_ComposingNormalizer_create_nfc_mv1", provider, Self::TYPE)
            .map(|handle| Self { handle })
    }

    /// Normalizer to Normalization Form KC.
    pub fn create_nfkc(library: &mut ForeignLibrary, provider: &DataProvider) -> Result<Self, RuntimeError> {
        construct_with_provider(library, "icu4x_ComposingNormalizer_create_nfkc_mv1", provider, Self::TYPE)
            .map(|handle| Self { handle })
    }

    /// Normalize `s`, passed and returned as UTF-8.
    pub fn normalize(&self, library: &mut ForeignLibrary, s: &str) -> Result<String, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let input = scope.str8(s)?;
        let write = scope.write_buffer()?;
        scope.call::<(u32, u32, u32, u32), ()>(
            "icu4x_ComposingNormalizer_normalize_mv1",
            (this.addr(), input.ptr.addr(), input.len, write.ptr().addr()),
        )?;

        let normalized = write.read_string(&mut *scope)?;
        scope.release()?;
        Ok(normalized)
    }

    /// Whether `s` is already normalized. The check runs over UTF-16.
    pub fn is_normalized(&self, library: &mut ForeignLibrary, s: &str) -> Result<bool, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let input = scope.str16(s)?;
        let raw: i32 = scope.call(
            "icu4x_ComposingNormalizer_is_normalized_utf16_mv1",
            (this.addr(), input.ptr.addr(), input.len),
        )?;

        let normalized = bool_from_abi(raw)?;
        scope.release()?;
        Ok(normalized)
    }

    /// Length in UTF-16 code units of the longest prefix of `s` that is
    /// known to be normalized.
    pub fn is_normalized_up_to(&self, library: &mut ForeignLibrary, s: &str) -> Result<usize, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let input = scope.str16(s)?;
        let up_to: u32 = scope.call(
            "icu4x_ComposingNormalizer_is_normalized_utf16_up_to_mv1",
            (this.addr(), input.ptr.addr(), input.len),
        )?;

        if up_to > input.len {
            return Err(RuntimeError::decode_mismatch("usize", i64::from(up_to)));
        }
        scope.release()?;
        Ok(up_to as usize)
    }
}
