//! Dynamic values passed across the binding boundary.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::NativeError;

use super::WrapperHandle;

/// A dynamically-typed value as seen by the caller.
///
/// Note: Dynamic does not implement Clone because Native values may not be cloneable.
/// Use `Dynamic::clone_if_possible()` for values that don't contain Native values.
#[derive(Default)]
pub enum Dynamic {
    /// Void/empty
    #[default]
    Void,
    /// Integer value (all integer widths stored as i64)
    Int(i64),
    /// Floating point value (f32, f64 both stored as f64)
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// String value (owned)
    String(String),
    /// Handle to a wrapped native object
    Object(WrapperHandle),
    /// Unwrapped native value, e.g. a freshly constructed instance
    Native(Box<dyn Any + Send + Sync>),
    /// Caller-supplied callable
    Callback(Callback),
    /// Null handle
    NullHandle,
}

impl Dynamic {
    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Void => "void",
            Dynamic::Int(_) => "int",
            Dynamic::Float(_) => "float",
            Dynamic::Bool(_) => "bool",
            Dynamic::String(_) => "string",
            Dynamic::Object(_) => "object",
            Dynamic::Native(_) => "native",
            Dynamic::Callback(_) => "callback",
            Dynamic::NullHandle => "null",
        }
    }

    /// Box a native value.
    pub fn native<T: Any + Send + Sync>(value: T) -> Self {
        Dynamic::Native(Box::new(value))
    }

    /// Check if this value is void.
    pub fn is_void(&self) -> bool {
        matches!(self, Dynamic::Void)
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::NullHandle)
    }

    /// The wrapper handle, if this is an object.
    pub fn as_object(&self) -> Option<WrapperHandle> {
        match self {
            Dynamic::Object(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Clone the value if it doesn't contain a Native value.
    ///
    /// Returns None for Native values since they may not be cloneable.
    pub fn clone_if_possible(&self) -> Option<Self> {
        match self {
            Dynamic::Void => Some(Dynamic::Void),
            Dynamic::Int(v) => Some(Dynamic::Int(*v)),
            Dynamic::Float(v) => Some(Dynamic::Float(*v)),
            Dynamic::Bool(v) => Some(Dynamic::Bool(*v)),
            Dynamic::String(s) => Some(Dynamic::String(s.clone())),
            Dynamic::Object(h) => Some(Dynamic::Object(*h)),
            Dynamic::Native(_) => None,
            Dynamic::Callback(cb) => Some(Dynamic::Callback(cb.clone())),
            Dynamic::NullHandle => Some(Dynamic::NullHandle),
        }
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Void => write!(f, "Void"),
            Dynamic::Int(v) => write!(f, "Int({})", v),
            Dynamic::Float(v) => write!(f, "Float({})", v),
            Dynamic::Bool(v) => write!(f, "Bool({})", v),
            Dynamic::String(s) => write!(f, "String({:?})", s),
            Dynamic::Object(h) => write!(f, "Object({:?})", h),
            Dynamic::Native(_) => write!(f, "Native(...)"),
            Dynamic::Callback(_) => write!(f, "Callback(...)"),
            Dynamic::NullHandle => write!(f, "NullHandle"),
        }
    }
}

impl PartialEq for Dynamic {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Dynamic::Void, Dynamic::Void) => true,
            (Dynamic::Int(a), Dynamic::Int(b)) => a == b,
            (Dynamic::Float(a), Dynamic::Float(b)) => a == b,
            (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
            (Dynamic::String(a), Dynamic::String(b)) => a == b,
            (Dynamic::Object(a), Dynamic::Object(b)) => a == b,
            (Dynamic::Callback(a), Dynamic::Callback(b)) => a.ptr_eq(b),
            (Dynamic::NullHandle, Dynamic::NullHandle) => true,
            // Native values can't be compared for equality
            _ => false,
        }
    }
}

type CallbackFn = dyn Fn(&[Dynamic]) -> Result<Dynamic, NativeError> + Send + Sync;

/// A callable supplied by the caller, e.g. a result collector.
#[derive(Clone)]
pub struct Callback {
    inner: Arc<CallbackFn>,
}

impl Callback {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Dynamic]) -> Result<Dynamic, NativeError> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Invoke the callback.
    pub fn call(&self, args: &[Dynamic]) -> Result<Dynamic, NativeError> {
        (self.inner)(args)
    }

    /// Whether two callbacks share the same closure.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").finish_non_exhaustive()
    }
}
