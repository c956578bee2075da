//! Native function storage and callable trait.

use std::fmt;
use std::sync::Arc;

use crate::error::NativeError;

use super::CallContext;

/// Type-erased native invocation entry point.
///
/// Every callable, whatever its role or arity, is stored behind this one
/// type. The role tag on the owning [`Signature`](crate::Signature) tells the
/// router how to call it.
///
/// The inner callable is wrapped in Arc so registrations can share it.
pub struct NativeFn {
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    /// Create a new NativeFn from a callable.
    pub fn new<F>(f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Call this native function with the given context.
    pub fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError> {
        self.inner.call(ctx)
    }

    /// Whether two entry points share the same callable.
    pub fn ptr_eq(&self, other: &NativeFn) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").finish_non_exhaustive()
    }
}

impl Clone for NativeFn {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Trait for callable native functions.
///
/// The `call` method receives a `CallContext` that provides access to
/// arguments, the receiver and the return slot.
pub trait NativeCallable {
    /// Call this function with the given context.
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError>;
}

// Implement NativeCallable for closures that take CallContext
impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext<'_>) -> Result<(), NativeError>,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError> {
        (self)(ctx)
    }
}
