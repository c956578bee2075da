//! Tether: expose native Rust types to a dynamic caller.
//!
//! Classes and free functions are declared once into a [`Registry`],
//! frozen into [`Bindings`] by [`Registry::initialize_all`], and invoked
//! through a [`Router`] that owns the wrapped objects.

pub use tether_core::{
    BindError, CallContext, Callback, ClassId, ConversionError, Dynamic, FromDynamic,
    IntoDynamic, NativeError, RegistrationError, TypeCategory, TypeIdentity, TypeKey,
    WrapperHandle,
};
pub use tether_registry::{
    AccessorId, BindingConfig, Bindings, ClassBuilder, FunctionBuilder, Registry, Router, Target,
    global,
};

pub mod prelude {
    pub use tether_core::naming::normalize;
    pub use tether_core::{
        BindError, CallContext, Callback, ClassId, ConversionError, Dynamic, FromDynamic,
        IntoDynamic, MemberDef, NativeError, Primitive, RegistrationError, Signature,
        SignatureRole, TypeCategory, TypeIdentity, TypeKey, WrapperHandle,
    };
    pub use tether_registry::{
        Accessor, AccessorId, BindingConfig, Bindings, ClassBinding, ClassBuilder, ClassEntry,
        DynamicVisitor, FunctionBuilder, ROOT_CLASS, ReflectVisitor, Registry, Router,
        TYPE_IDENTITY_CLASS, Target, TypeDetail, global,
    };
}
