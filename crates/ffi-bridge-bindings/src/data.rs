//! Data providers.
//!
//! Every factory in the library takes a provider and reports lookup
//! failures as a [`DataError`] in a result envelope.

use ffi_bridge_core::codec::raise;
use ffi_bridge_core::{CallScope, ForeignLibrary, ForeignPtr, Opaque, OpaqueType, RuntimeError, ffi_enum};
use tracing::debug;

ffi_enum! {
    /// Failure to load data for a factory.
    pub enum DataError {
        Unknown = 0,
        MarkerNotFound = 1,
        IdentifierNotFound = 2,
        InvalidRequest = 3,
        InconsistentData = 4,
        Downcast = 5,
        Deserialize = 6,
        Custom = 7,
        Io = 8,
    }
}

opaque_wrapper! {
    /// A source of locale data for the library's factories.
    DataProvider, "icu4x_DataProvider_destroy_mv1"
}

impl DataProvider {
    /// The data compiled into the library.
    pub fn compiled(library: &mut ForeignLibrary) -> Result<Self, RuntimeError> {
        Self::create(library, "icu4x_DataProvider_compiled_mv1")
    }

    /// A provider without any data; every factory fails with
    /// [`DataError::MarkerNotFound`].
    pub fn empty(library: &mut ForeignLibrary) -> Result<Self, RuntimeError> {
        Self::create(library, "icu4x_DataProvider_empty_mv1")
    }

    fn create(library: &mut ForeignLibrary, export: &str) -> Result<Self, RuntimeError> {
        let mut scope = CallScope::new(library);
        let ptr: u32 = scope.call(export, ())?;
        let handle = Opaque::owned(&*scope, Self::TYPE, ForeignPtr::new(ptr));
        scope.release()?;

        Ok(Self { handle })
    }
}

/// Run a `(ret, provider)` factory returning `Result<ptr, DataError>` and
/// wrap the object it creates.
pub(crate) fn construct_with_provider(
    library: &mut ForeignLibrary,
    export: &str,
    provider: &DataProvider,
    ty: OpaqueType,
) -> Result<Opaque, RuntimeError> {
    let provider = provider.handle().ptr()?;

    let mut scope = CallScope::new(library);
    let ret = scope.receive::<Result<ForeignPtr, DataError>>()?;
    scope.call::<(u32, u32), ()>(export, (ret.ptr().addr(), provider.addr()))?;

    let ptr = raise(ret.read(&*scope)?).inspect_err(|e| {
        debug!(export, error = %e, "Factory reported a data error");
    })?;
    let handle = Opaque::owned(&*scope, ty, ptr);
    scope.release()?;

    Ok(handle)
}
