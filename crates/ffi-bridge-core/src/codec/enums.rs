//! Closed enums carried as 4-byte discriminants.

use ffi_bridge_common::RuntimeError;

/// A foreign enum with a closed set of variants.
///
/// Implemented through [`ffi_enum!`](crate::ffi_enum), which also provides
/// the 4-byte codec.
pub trait FfiEnum: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// Name of the enum, used in errors.
    const NAME: &'static str;

    /// Every variant, in declaration order.
    const VARIANTS: &'static [Self];

    /// The raw discriminant.
    fn discriminant(self) -> i32;

    /// The variant name.
    fn name(self) -> &'static str;

    /// Every variant, in declaration order.
    fn variants() -> &'static [Self] {
        Self::VARIANTS
    }

    /// The variant with discriminant `raw`, if any.
    fn from_discriminant(raw: i32) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|v| v.discriminant() == raw)
    }

    /// The variant called `name`, if any.
    fn from_name(name: &str) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|v| v.name() == name)
    }
}

/// Declare a closed foreign enum with its discriminants.
///
/// ```ignore
/// ffi_enum! {
///     /// Collation strength.
///     pub enum CollatorStrength {
///         Primary = 0,
///         Secondary = 1,
///     }
/// }
/// ```
#[macro_export]
macro_rules! ffi_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )+
        }

        impl $crate::codec::FfiEnum for $name {
            const NAME: &'static str = stringify!($name);
            const VARIANTS: &'static [Self] = &[$(Self::$variant),+];

            fn discriminant(self) -> i32 {
                self as i32
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }
        }

        impl $crate::codec::FfiLayout for $name {
            const LAYOUT: $crate::codec::Layout = $crate::codec::Layout::new(4, 4);
        }

        impl $crate::codec::Encode for $name {
            fn encode<M: $crate::LinearMemory + ?Sized>(
                &self,
                memory: &mut M,
                ptr: $crate::ForeignPtr,
            ) -> Result<(), $crate::RuntimeError> {
                $crate::LinearMemory::write(memory, ptr, *self as i32)
            }
        }

        impl $crate::codec::Decode for $name {
            fn decode<M: $crate::LinearMemory + ?Sized>(
                memory: &M,
                ptr: $crate::ForeignPtr,
            ) -> Result<Self, $crate::RuntimeError> {
                let raw: i32 = $crate::LinearMemory::read(memory, ptr)?;
                <Self as $crate::codec::FfiEnum>::from_discriminant(raw)
                    .ok_or_else(|| $crate::RuntimeError::decode_mismatch(stringify!($name), raw))
            }
        }
    };
}

/// The recoverable error for a foreign error enum value.
pub fn data_error<E: FfiEnum>(error: E) -> RuntimeError {
    RuntimeError::DataError {
        type_name: E::NAME,
        variant: error.name(),
        discriminant: error.discriminant(),
    }
}

/// Turn a decoded result envelope into a host result.
///
/// # Errors
///
/// The error side becomes a [`RuntimeError::DataError`].
pub fn raise<T, E: FfiEnum>(envelope: Result<T, E>) -> Result<T, RuntimeError> {
    envelope.map_err(data_error)
}

/// Recover typed foreign causes from a [`RuntimeError`].
pub trait ForeignErrorExt {
    /// The variant of `E` this error was raised with, if it came from `E`.
    fn foreign_cause<E: FfiEnum>(&self) -> Option<E>;
}

impl ForeignErrorExt for RuntimeError {
    fn foreign_cause<E: FfiEnum>(&self) -> Option<E> {
        self.data_discriminant(E::NAME)
            .and_then(E::from_discriminant)
    }
}
