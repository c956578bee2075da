//! Call context bridging the router and native Rust functions.

use std::any::Any;
use std::fmt;

use crate::convert::{FromDynamic, IntoDynamic};
use crate::error::NativeError;

use super::{Dynamic, WrapperHandle, WrapperHeap};

/// Context for native function calls.
///
/// Gives a native implementation its arguments, its receiver (for instance
/// members), the return slot, and optional access to the wrapper heap and
/// the host bindings.
///
/// ## Typed Argument Access
///
/// ```ignore
/// let x: f64 = ctx.arg(0)?;
/// let point = ctx.this_mut::<Point>()?;
/// point.x = x;
/// ```
pub struct CallContext<'a> {
    /// Argument values
    args: &'a mut [Dynamic],
    /// Receiver for instance members
    this: Option<&'a mut (dyn Any + Send + Sync + 'static)>,
    /// Return value slot
    return_slot: &'a mut Dynamic,
    /// Wrapper heap, for arguments that are wrapped objects
    heap: Option<&'a WrapperHeap>,
    /// Host services (the bindings table)
    host: Option<&'a (dyn Any + Send + Sync + 'static)>,
}

impl<'a> CallContext<'a> {
    /// Create a call context for a free or static call.
    pub fn new(args: &'a mut [Dynamic], return_slot: &'a mut Dynamic) -> Self {
        Self {
            args,
            this: None,
            return_slot,
            heap: None,
            host: None,
        }
    }

    /// Attach the receiver of an instance call.
    pub fn with_this(mut self, this: &'a mut (dyn Any + Send + Sync + 'static)) -> Self {
        self.this = Some(this);
        self
    }

    /// Attach the wrapper heap.
    pub fn with_heap(mut self, heap: &'a WrapperHeap) -> Self {
        self.heap = Some(heap);
        self
    }

    /// Attach host services.
    pub fn with_host(mut self, host: &'a (dyn Any + Send + Sync + 'static)) -> Self {
        self.host = Some(host);
        self
    }

    /// Get the number of arguments.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Get a raw reference to an argument.
    pub fn arg_slot(&self, index: usize) -> Result<&Dynamic, NativeError> {
        self.args.get(index).ok_or(NativeError::ArgumentIndexOutOfBounds {
            index,
            count: self.args.len(),
        })
    }

    /// Get a typed argument value.
    pub fn arg<T: FromDynamic>(&self, index: usize) -> Result<T, NativeError> {
        let slot = self.arg_slot(index)?;
        T::from_dynamic(slot).map_err(NativeError::Conversion)
    }

    /// Move an argument out, leaving `Void` in its place.
    ///
    /// Used for values that cannot be cloned, such as native boxes.
    pub fn take_arg(&mut self, index: usize) -> Result<Dynamic, NativeError> {
        let count = self.args.len();
        self.args
            .get_mut(index)
            .map(std::mem::take)
            .ok_or(NativeError::ArgumentIndexOutOfBounds { index, count })
    }

    /// Set the return value from a raw value.
    pub fn set_return_slot(&mut self, value: Dynamic) {
        *self.return_slot = value;
    }

    /// Set a typed return value.
    pub fn set_return<T: IntoDynamic>(&mut self, value: T) {
        *self.return_slot = value.into_dynamic();
    }

    /// Whether a receiver is attached.
    pub fn has_this(&self) -> bool {
        self.this.is_some()
    }

    /// Get an immutable reference to the receiver.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no receiver or its type isn't `T`.
    pub fn this<T: Any>(&self) -> Result<&T, NativeError> {
        let this = self
            .this
            .as_deref()
            .ok_or_else(|| NativeError::invalid_this("no receiver for a static call"))?;
        this.downcast_ref::<T>().ok_or_else(|| {
            NativeError::invalid_this(format!(
                "type mismatch: expected {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Get a mutable reference to the receiver.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no receiver or its type isn't `T`.
    pub fn this_mut<T: Any>(&mut self) -> Result<&mut T, NativeError> {
        let this = self
            .this
            .as_deref_mut()
            .ok_or_else(|| NativeError::invalid_this("no receiver for a static call"))?;
        this.downcast_mut::<T>().ok_or_else(|| {
            NativeError::invalid_this(format!(
                "type mismatch: expected {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Run `f` against another wrapped object passed as an argument.
    ///
    /// # Errors
    ///
    /// Fails if no heap is attached, the handle is stale, the object is the
    /// receiver of the current call, or its type isn't `T`.
    pub fn with_object<T: Any, R>(
        &self,
        handle: WrapperHandle,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, NativeError> {
        let heap = self
            .heap
            .ok_or_else(|| NativeError::other("no wrapper heap attached to this call"))?;
        let wrapper = heap.get(handle).ok_or(NativeError::ObjectUnavailable {
            index: handle.index,
        })?;
        wrapper
            .try_with_instance(|instance| instance.downcast_mut::<T>().map(f))
            .ok_or(NativeError::ObjectUnavailable {
                index: handle.index,
            })?
            .ok_or_else(|| {
                NativeError::Conversion(crate::ConversionError::TypeMismatch {
                    expected: std::any::type_name::<T>(),
                    actual: "object",
                })
            })
    }

    /// Get host services of type `H`.
    pub fn host<H: Any>(&self) -> Result<&H, NativeError> {
        self.host
            .and_then(|host| host.downcast_ref::<H>())
            .ok_or_else(|| {
                NativeError::other(format!(
                    "host services of type {} are not available",
                    std::any::type_name::<H>()
                ))
            })
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("arg_count", &self.arg_count())
            .field("has_this", &self.has_this())
            .finish()
    }
}
