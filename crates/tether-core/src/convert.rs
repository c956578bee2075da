//! Conversion traits between dynamic caller values and native Rust values.
//!
//! - [`FromDynamic`]: extract a Rust value from a [`Dynamic`]
//! - [`IntoDynamic`]: turn a Rust value into a [`Dynamic`]
//!
//! This is the minimal marshaling layer native implementations need; a host
//! adapter is free to put its own representation in front of it.
//!
//! ## Example
//!
//! ```
//! use tether_core::{Dynamic, FromDynamic, IntoDynamic};
//!
//! let value = 42i32.into_dynamic();
//! assert_eq!(i32::from_dynamic(&value).unwrap(), 42);
//! ```

use crate::error::ConversionError;
use crate::runtime::{Callback, Dynamic, WrapperHandle};

/// Extract a value from a [`Dynamic`].
pub trait FromDynamic: Sized {
    /// Extract a value from the given dynamic value.
    ///
    /// Returns a `ConversionError` if the value holds an incompatible type.
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError>;
}

/// Convert a value into a [`Dynamic`].
pub trait IntoDynamic {
    /// Convert this value into a dynamic value.
    fn into_dynamic(self) -> Dynamic;
}

fn mismatch(expected: &'static str, value: &Dynamic) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        actual: value.type_name(),
    }
}

// ============================================================================
// Integer implementations
// ============================================================================

macro_rules! impl_dynamic_int {
    ($($ty:ty),*) => {
        $(
            impl FromDynamic for $ty {
                fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
                    match value {
                        Dynamic::Int(v) => <$ty>::try_from(*v).map_err(|_| {
                            ConversionError::IntegerOverflow {
                                value: *v,
                                target_type: stringify!($ty),
                            }
                        }),
                        _ => Err(mismatch("int", value)),
                    }
                }
            }

            impl IntoDynamic for $ty {
                fn into_dynamic(self) -> Dynamic {
                    Dynamic::Int(self as i64)
                }
            }
        )*
    };
}

impl_dynamic_int!(i8, i16, i32, i64, u8, u16, u32);

// u64 keys travel as their bit pattern
impl FromDynamic for u64 {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Int(v) => Ok(*v as u64),
            _ => Err(mismatch("int", value)),
        }
    }
}

impl IntoDynamic for u64 {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Int(self as i64)
    }
}

// ============================================================================
// Float implementations
// ============================================================================

impl FromDynamic for f32 {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Float(v) if !v.is_finite() || v.abs() <= f32::MAX as f64 => Ok(*v as f32),
            Dynamic::Float(v) => Err(ConversionError::FloatConversion {
                value: *v,
                target_type: "f32",
            }),
            Dynamic::Int(v) => Ok(*v as f32),
            _ => Err(mismatch("float", value)),
        }
    }
}

impl IntoDynamic for f32 {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Float(self as f64)
    }
}

impl FromDynamic for f64 {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Float(v) => Ok(*v),
            Dynamic::Int(v) => Ok(*v as f64),
            _ => Err(mismatch("float", value)),
        }
    }
}

impl IntoDynamic for f64 {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Float(self)
    }
}

// ============================================================================
// Bool, unit, string
// ============================================================================

impl FromDynamic for bool {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Bool(v) => Ok(*v),
            _ => Err(mismatch("bool", value)),
        }
    }
}

impl IntoDynamic for bool {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Bool(self)
    }
}

impl FromDynamic for () {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Void => Ok(()),
            _ => Err(mismatch("void", value)),
        }
    }
}

impl IntoDynamic for () {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Void
    }
}

impl FromDynamic for String {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::String(s) => Ok(s.clone()),
            _ => Err(mismatch("string", value)),
        }
    }
}

impl IntoDynamic for String {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::String(self)
    }
}

impl IntoDynamic for &str {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::String(self.to_string())
    }
}

// ============================================================================
// Handles and callbacks
// ============================================================================

impl FromDynamic for WrapperHandle {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Object(handle) => Ok(*handle),
            Dynamic::NullHandle => Err(ConversionError::NullHandle {
                target_type: "object",
            }),
            _ => Err(mismatch("object", value)),
        }
    }
}

impl IntoDynamic for WrapperHandle {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Object(self)
    }
}

impl FromDynamic for Callback {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::Callback(cb) => Ok(cb.clone()),
            _ => Err(mismatch("callback", value)),
        }
    }
}

impl IntoDynamic for Callback {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Callback(self)
    }
}

impl<T: FromDynamic> FromDynamic for Option<T> {
    fn from_dynamic(value: &Dynamic) -> Result<Self, ConversionError> {
        match value {
            Dynamic::NullHandle | Dynamic::Void => Ok(None),
            other => T::from_dynamic(other).map(Some),
        }
    }
}

impl<T: IntoDynamic> IntoDynamic for Option<T> {
    fn into_dynamic(self) -> Dynamic {
        match self {
            Some(value) => value.into_dynamic(),
            None => Dynamic::NullHandle,
        }
    }
}

impl IntoDynamic for Dynamic {
    fn into_dynamic(self) -> Dynamic {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_checks_bounds() {
        assert_eq!(i8::from_dynamic(&Dynamic::Int(-128)).unwrap(), -128);
        assert!(matches!(
            i8::from_dynamic(&Dynamic::Int(128)),
            Err(ConversionError::IntegerOverflow { value: 128, target_type: "i8" })
        ));
        assert!(u8::from_dynamic(&Dynamic::Int(-1)).is_err());
        assert_eq!(u32::from_dynamic(&Dynamic::Int(4294967295)).unwrap(), u32::MAX);
    }

    #[test]
    fn u64_reinterprets_bits() {
        assert_eq!(u64::from_dynamic(&Dynamic::Int(-1)).unwrap(), u64::MAX);
        assert!(matches!(u64::MAX.into_dynamic(), Dynamic::Int(-1)));
    }

    #[test]
    fn floats_accept_ints() {
        assert_eq!(f64::from_dynamic(&Dynamic::Int(42)).unwrap(), 42.0);
        assert_eq!(f32::from_dynamic(&Dynamic::Float(1.5)).unwrap(), 1.5);
        assert!(f32::from_dynamic(&Dynamic::Float(f64::MAX)).is_err());
        assert!(f32::from_dynamic(&Dynamic::Float(f64::INFINITY)).unwrap().is_infinite());
    }

    #[test]
    fn type_mismatch_names_both_sides() {
        let err = bool::from_dynamic(&Dynamic::String("yes".into())).unwrap_err();
        assert_eq!(
            err,
            ConversionError::TypeMismatch {
                expected: "bool",
                actual: "string"
            }
        );
    }

    #[test]
    fn strings_convert() {
        assert_eq!(String::from_dynamic(&"hi".into_dynamic()).unwrap(), "hi");
    }

    #[test]
    fn null_handle_is_not_an_object() {
        assert!(matches!(
            WrapperHandle::from_dynamic(&Dynamic::NullHandle),
            Err(ConversionError::NullHandle { .. })
        ));
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Option::<i32>::from_dynamic(&Dynamic::NullHandle).unwrap(), None);
        assert_eq!(Option::<i32>::from_dynamic(&Dynamic::Int(3)).unwrap(), Some(3));
        assert!(matches!(None::<i32>.into_dynamic(), Dynamic::NullHandle));
    }
}
