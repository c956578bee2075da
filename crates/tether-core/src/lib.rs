//! Core types for the tether binding layer.
//!
//! This crate holds everything the registry and router share:
//!
//! - [`TypeKey`] / [`TypeIdentity`]: comparable, printable type identities
//! - [`Signature`] / [`MemberDef`]: what a registered callable is and how it is called
//! - [`naming`]: getter-name normalization
//! - [`runtime`]: dynamic values, call context, object wrappers
//! - error enums for each layer

pub mod convert;
pub mod error;
pub mod ids;
pub mod naming;
pub mod primitive;
pub mod runtime;
pub mod signature;
pub mod type_identity;

pub use convert::{FromDynamic, IntoDynamic};
pub use error::{BindError, ConversionError, NativeError, RegistrationError};
pub use ids::ClassId;
pub use primitive::{Primitive, PrimitiveFlags, PrimitiveInfo};
pub use runtime::{
    CallContext, Callback, Deleter, Dynamic, NativeCallable, NativeFn, ObjectWrapper,
    WrapperHandle, WrapperHeap,
};
pub use signature::{EMPTY_GETTER, EMPTY_SETTER, MemberDef, Signature, SignatureRole};
pub use type_identity::{TypeCategory, TypeIdentity, TypeKey};
