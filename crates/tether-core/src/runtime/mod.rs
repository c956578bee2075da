//! Native function storage, call context and object wrappers.
//!
//! This module provides the infrastructure the router uses to call native
//! Rust functions on behalf of a dynamically-typed caller.
//!
//! ## Key Types
//!
//! - [`Dynamic`]: value type crossing the boundary (primitives, handles, native values)
//! - [`NativeFn`]: type-erased invocation entry point
//! - [`CallContext`]: bridge between the router and a native function
//! - [`ObjectWrapper`]: owner of one native instance with at-most-once release
//! - [`WrapperHeap`]: generational arena handing out [`WrapperHandle`]s

mod call_context;
mod dynamic;
mod native_fn;
mod wrapper_heap;

pub use call_context::CallContext;
pub use dynamic::{Callback, Dynamic};
pub use native_fn::{NativeCallable, NativeFn};
pub use wrapper_heap::{Deleter, ObjectWrapper, WrapperHandle, WrapperHeap};
