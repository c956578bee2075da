//! Introspection: type queries, reflection and the built-in classes.
//!
//! Two classes are registered ahead of every user class:
//!
//! - `Tether`, the root class. Its static members `bind_value`, `reflect`
//!   and `queryType` expose [`Bindings::bind_value`], [`Bindings::reflect`]
//!   and [`Bindings::query_type`] to a dynamic caller.
//! - `TypeIdentity`, constructed from a hex key, so callers can hold
//!   identities and pass them back to `queryType`.

use std::sync::Arc;

use tether_core::{
    CallContext, Callback, ClassId, ConversionError, Dynamic, NativeError, PrimitiveFlags,
    PrimitiveInfo, Signature, TypeCategory, TypeIdentity, TypeKey,
};

use crate::binding::{Bindings, ClassBinding, NamedType};
use crate::class_entry::{ClassBuilder, ClassEntry};

/// Display name of the root class.
pub const ROOT_CLASS: &str = "Tether";

/// Display name of the type identity class.
pub const TYPE_IDENTITY_CLASS: &str = "TypeIdentity";

/// Instance type of the root class.
#[derive(Debug, Default)]
pub struct RootObject;

/// What the bindings know about a type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDetail {
    Primitive {
        name: String,
        size: usize,
        flags: PrimitiveFlags,
    },
    Class {
        id: ClassId,
        name: String,
    },
    Named {
        name: String,
        category: TypeCategory,
    },
    Unknown {
        key: TypeKey,
    },
}

impl TypeDetail {
    pub fn kind(&self) -> &'static str {
        match self {
            TypeDetail::Primitive { .. } => "primitive",
            TypeDetail::Class { .. } => "class",
            TypeDetail::Named { category, .. } => category.name(),
            TypeDetail::Unknown { .. } => "unknown",
        }
    }

    /// Arguments handed to a dynamic `queryType` callback.
    fn to_args(&self) -> Vec<Dynamic> {
        let kind = Dynamic::String(self.kind().to_string());
        match self {
            TypeDetail::Primitive { name, size, flags } => vec![
                kind,
                Dynamic::String(name.clone()),
                Dynamic::Int(*size as i64),
                Dynamic::Bool(flags.contains(PrimitiveFlags::SIGNED)),
                Dynamic::Bool(flags.contains(PrimitiveFlags::FLOAT)),
            ],
            TypeDetail::Class { id, name } => vec![
                kind,
                Dynamic::String(name.clone()),
                Dynamic::Int(i64::from(id.index())),
            ],
            TypeDetail::Named { name, .. } => vec![kind, Dynamic::String(name.clone())],
            TypeDetail::Unknown { key } => vec![kind, Dynamic::String(key.to_string())],
        }
    }
}

/// Receives one call per reflected item, in registration order.
pub trait ReflectVisitor {
    fn primitive(&mut self, info: &PrimitiveInfo) -> Result<(), NativeError>;

    fn ty(&mut self, ty: &NamedType) -> Result<(), NativeError>;

    fn class(&mut self, class: &ClassBinding) -> Result<(), NativeError>;

    /// A class member, or a free function when `class` is `None`.
    fn method(
        &mut self,
        class: Option<&ClassBinding>,
        signature: &Signature,
    ) -> Result<(), NativeError>;
}

impl Bindings {
    /// Describe the type behind an identity.
    pub fn query_type(&self, identity: &TypeIdentity) -> TypeDetail {
        let key = identity.key();
        if let Some(info) = self.primitives().iter().find(|p| p.key() == key) {
            return TypeDetail::Primitive {
                name: info.name.clone(),
                size: info.size,
                flags: info.flags,
            };
        }
        if let Some(class) = self.class_by_key(key) {
            return TypeDetail::Class {
                id: class.id(),
                name: class.name().to_string(),
            };
        }
        if let Some(named) = self.types().iter().find(|t| t.identity.key() == key) {
            return TypeDetail::Named {
                name: named.name.clone(),
                category: named.identity.category(),
            };
        }
        TypeDetail::Unknown { key }
    }

    /// Walk primitives, named types, classes with their members, then free
    /// functions.
    ///
    /// Stops at the first visitor error.
    pub fn reflect(&self, visitor: &mut dyn ReflectVisitor) -> Result<(), NativeError> {
        for info in self.primitives() {
            visitor.primitive(info)?;
        }
        for ty in self.types() {
            visitor.ty(ty)?;
        }
        for class in self.classes() {
            visitor.class(class)?;
            for signature in class.members() {
                visitor.method(Some(class), signature)?;
            }
        }
        for signature in self.functions() {
            visitor.method(None, signature)?;
        }
        Ok(())
    }
}

/// Adapts four dynamic callbacks to [`ReflectVisitor`].
///
/// | Callback    | Arguments                                       |
/// |-------------|-------------------------------------------------|
/// | `primitive` | key, name, size, signed, float                  |
/// | `ty`        | key, name, category                             |
/// | `class`     | id, name, key                                   |
/// | `method`    | class id (null for free functions), name, num,  |
/// |             | role, arity (null when undeclared)              |
pub struct DynamicVisitor {
    pub primitive: Callback,
    pub ty: Callback,
    pub class: Callback,
    pub method: Callback,
}

impl DynamicVisitor {
    /// Take the four callbacks from a call's first four arguments.
    pub fn from_args(ctx: &CallContext<'_>) -> Result<Self, NativeError> {
        Ok(Self {
            primitive: ctx.arg(0)?,
            ty: ctx.arg(1)?,
            class: ctx.arg(2)?,
            method: ctx.arg(3)?,
        })
    }
}

impl ReflectVisitor for DynamicVisitor {
    fn primitive(&mut self, info: &PrimitiveInfo) -> Result<(), NativeError> {
        self.primitive.call(&[
            Dynamic::String(info.identity.as_hex().to_string()),
            Dynamic::String(info.name.clone()),
            Dynamic::Int(info.size as i64),
            Dynamic::Bool(info.flags.contains(PrimitiveFlags::SIGNED)),
            Dynamic::Bool(info.flags.contains(PrimitiveFlags::FLOAT)),
        ])?;
        Ok(())
    }

    fn ty(&mut self, ty: &NamedType) -> Result<(), NativeError> {
        self.ty.call(&[
            Dynamic::String(ty.identity.as_hex().to_string()),
            Dynamic::String(ty.name.clone()),
            Dynamic::String(ty.identity.category().name().to_string()),
        ])?;
        Ok(())
    }

    fn class(&mut self, class: &ClassBinding) -> Result<(), NativeError> {
        self.class.call(&[
            Dynamic::Int(i64::from(class.id().index())),
            Dynamic::String(class.name().to_string()),
            Dynamic::String(class.type_key().to_string()),
        ])?;
        Ok(())
    }

    fn method(
        &mut self,
        class: Option<&ClassBinding>,
        signature: &Signature,
    ) -> Result<(), NativeError> {
        let owner = class.map_or(Dynamic::NullHandle, |c| Dynamic::Int(i64::from(c.id().index())));
        let arity = signature
            .arity()
            .map_or(Dynamic::NullHandle, |n| Dynamic::Int(n as i64));
        self.method.call(&[
            owner,
            Dynamic::String(signature.name().to_string()),
            Dynamic::Int(i64::from(signature.num())),
            Dynamic::String(signature.role().name().to_string()),
            arity,
        ])?;
        Ok(())
    }
}

fn identity_arg(ctx: &CallContext<'_>, index: usize) -> Result<TypeIdentity, NativeError> {
    match ctx.arg_slot(index)? {
        Dynamic::String(hex) => TypeKey::from_hex(hex)
            .map(TypeIdentity::new)
            .ok_or_else(|| bad_hex().into()),
        Dynamic::Object(handle) => ctx.with_object::<TypeIdentity, _>(*handle, |id| id.clone()),
        other => Err(ConversionError::TypeMismatch {
            expected: "type identity",
            actual: other.type_name(),
        }
        .into()),
    }
}

fn bad_hex() -> ConversionError {
    ConversionError::TypeMismatch {
        expected: "hex type key",
        actual: "string",
    }
}

/// The always-first class.
pub(crate) fn root_class() -> Arc<ClassEntry> {
    let string = TypeKey::of::<String>();
    let callback = TypeKey::of::<Callback>();

    ClassBuilder::<RootObject>::new(ROOT_CLASS)
        .constructor(|_| Ok(RootObject))
        .params(&[])
        .function("bind_value", |ctx| {
            let name: String = ctx.arg(0)?;
            let value = ctx.take_arg(1)?;
            ctx.host::<Bindings>()?.bind_value(name, value);
            Ok(())
        })
        .params(&[string, TypeKey::of::<Dynamic>()])
        .function("reflect", |ctx| {
            let mut visitor = DynamicVisitor::from_args(ctx)?;
            ctx.host::<Bindings>()?.reflect(&mut visitor)
        })
        .params(&[callback, callback, callback, callback])
        .function("queryType", |ctx| {
            let identity = identity_arg(ctx, 0)?;
            let callback: Callback = ctx.arg(1)?;
            let detail = ctx.host::<Bindings>()?.query_type(&identity);
            let result = callback.call(&detail.to_args())?;
            ctx.set_return_slot(result);
            Ok(())
        })
        .params(&[TypeKey::of::<TypeIdentity>(), callback])
        .build()
}

/// Class wrapping [`TypeIdentity`] values.
pub(crate) fn type_identity_class() -> Arc<ClassEntry> {
    ClassBuilder::<TypeIdentity>::new(TYPE_IDENTITY_CLASS)
        .constructor(|ctx| {
            let hex: String = ctx.arg(0)?;
            TypeKey::from_hex(&hex)
                .map(TypeIdentity::new)
                .ok_or_else(|| NativeError::from(bad_hex()))
        })
        .params(&[TypeKey::of::<String>()])
        .method("toString", |ctx| {
            let hex = ctx.this::<TypeIdentity>()?.as_hex().to_string();
            ctx.set_return(hex);
            Ok(())
        })
        .params(&[])
        .returns(TypeKey::of::<String>())
        .build()
}
