//! Script property lookup.
//!
//! Script values are ICU4C `UScriptCode` numbers (Latin = 25, Greek = 14).

use ffi_bridge_core::codec::bool_from_abi;
use ffi_bridge_core::{CallScope, Edges, ForeignLibrary, ForeignPtr, Opaque, RuntimeError};

use crate::data::{DataProvider, construct_with_provider};

opaque_wrapper! {
    /// The Script and Script_Extensions properties.
    ScriptWithExtensions, "icu4x_ScriptWithExtensions_destroy_mv1"
}

opaque_wrapper! {
    /// A view of a [`ScriptWithExtensions`] that borrows from it.
    ///
    /// Never destroyed from the host side; the view keeps its owner alive.
    ScriptWithExtensionsBorrowed, "icu4x_ScriptWithExtensionsBorrowed_destroy_mv1"
}

impl ScriptWithExtensions {
    /// Load the script data.
    pub fn create(library: &mut ForeignLibrary, provider: &DataProvider) -> Result<Self, RuntimeError> {
        construct_with_provider(
            library,
            "icu4x_ScriptWithExtensions_create_with_provider_mv1",
            provider,
            Self::TYPE,
        )
        .map(|handle| Self { handle })
    }

    /// The Script value of `ch`.
    pub fn get_script_val(&self, library: &mut ForeignLibrary, ch: char) -> Result<u16, RuntimeError> {
        script_val(library, "icu4x_ScriptWithExtensions_get_script_val_mv1", &self.handle, ch)
    }

    /// A borrowed view for cheaper lookups.
    pub fn as_borrowed(&self, library: &mut ForeignLibrary) -> Result<ScriptWithExtensionsBorrowed, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let ptr: u32 = scope.call("icu4x_ScriptWithExtensions_as_borrowed_mv1", this.addr())?;
        let handle = Opaque::from_raw(
            &*scope,
            ScriptWithExtensionsBorrowed::TYPE,
            ForeignPtr::new(ptr),
            Edges::of(self),
            Edges::new(),
        );
        scope.release()?;

        Ok(ScriptWithExtensionsBorrowed { handle })
    }
}

impl ScriptWithExtensionsBorrowed {
    /// The Script value of `ch`.
    pub fn get_script_val(&self, library: &mut ForeignLibrary, ch: char) -> Result<u16, RuntimeError> {
        script_val(library, "icu4x_ScriptWithExtensionsBorrowed_get_script_val_mv1", &self.handle, ch)
    }

    /// Whether `ch` has `script` in its Script_Extensions.
    pub fn has_script(&self, library: &mut ForeignLibrary, ch: char, script: u16) -> Result<bool, RuntimeError> {
        let this = self.handle.ptr()?;

        let mut scope = CallScope::new(library);
        let raw: i32 = scope.call(
            "icu4x_ScriptWithExtensionsBorrowed_has_script_mv1",
            (this.addr(), u32::from(ch), u32::from(script)),
        )?;
        scope.release()?;

        bool_from_abi(raw)
    }
}

fn script_val(library: &mut ForeignLibrary, export: &str, handle: &Opaque, ch: char) -> Result<u16, RuntimeError> {
    let this = handle.ptr()?;

    let mut scope = CallScope::new(library);
    let raw: u32 = scope.call(export, (this.addr(), u32::from(ch)))?;
    scope.release()?;

    u16::try_from(raw).map_err(|_| RuntimeError::decode_mismatch("u16", raw))
}
