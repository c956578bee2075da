//! Signature descriptors and class member definitions.
//!
//! A [`Signature`] describes one registered callable: its role, its
//! invocation entry point, its numeric id and its declared shape. A
//! [`MemberDef`] is one entry in a class's ordered member list; it carries
//! either a signature or nothing at all, in which case the member is a
//! marker that clears a pending accessor half during class initialization.

use std::fmt;
use std::sync::Arc;

use crate::error::NativeError;
use crate::runtime::{CallContext, NativeFn};
use crate::type_identity::TypeKey;

/// Reserved member name that clears the pending getter.
pub const EMPTY_GETTER: &str = "<empty getter>";

/// Reserved member name that clears the pending setter.
pub const EMPTY_SETTER: &str = "<empty setter>";

/// How the router interprets a signature's entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureRole {
    /// Produces a new native instance.
    Constructor,
    /// Instance method; receives the wrapped instance as `this`.
    Method,
    /// Free function, or class-level static function.
    Function,
    /// Reads a property of the wrapped instance.
    Getter,
    /// Writes a property of the wrapped instance.
    Setter,
}

impl SignatureRole {
    /// Lowercase display name.
    pub const fn name(self) -> &'static str {
        match self {
            SignatureRole::Constructor => "constructor",
            SignatureRole::Method => "method",
            SignatureRole::Function => "function",
            SignatureRole::Getter => "getter",
            SignatureRole::Setter => "setter",
        }
    }

    /// Whether the entry point expects a receiver.
    pub const fn needs_this(self) -> bool {
        matches!(
            self,
            SignatureRole::Method | SignatureRole::Getter | SignatureRole::Setter
        )
    }
}

impl fmt::Display for SignatureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptor of one registered callable.
///
/// Immutable once registered; shared through `Arc` by the registry entry and
/// the bindings table built from it.
#[derive(Debug, Clone)]
pub struct Signature {
    role: SignatureRole,
    name: String,
    num: u32,
    caller: NativeFn,
    params: Option<Vec<TypeKey>>,
    returns: Option<TypeKey>,
}

impl Signature {
    /// Create a signature with an undeclared shape.
    pub fn new(role: SignatureRole, name: impl Into<String>, num: u32, caller: NativeFn) -> Self {
        Self {
            role,
            name: name.into(),
            num,
            caller,
            params: None,
            returns: None,
        }
    }

    /// Declare the parameter types.
    pub fn with_params(mut self, params: impl Into<Vec<TypeKey>>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Declare the return type.
    pub fn with_returns(mut self, returns: TypeKey) -> Self {
        self.returns = Some(returns);
        self
    }

    /// Replace the numeric id.
    pub fn with_num(mut self, num: u32) -> Self {
        self.num = num;
        self
    }

    pub fn role(&self) -> SignatureRole {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn caller(&self) -> &NativeFn {
        &self.caller
    }

    /// Declared parameter types, if any were declared.
    pub fn params(&self) -> Option<&[TypeKey]> {
        self.params.as_deref()
    }

    pub fn returns(&self) -> Option<TypeKey> {
        self.returns
    }

    /// Declared number of parameters.
    pub fn arity(&self) -> Option<usize> {
        self.params.as_ref().map(Vec::len)
    }

    /// Invoke the entry point.
    #[inline]
    pub fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError> {
        self.caller.call(ctx)
    }
}

/// One entry of a class's ordered member list.
#[derive(Debug, Clone)]
pub struct MemberDef {
    name: String,
    signature: Option<Arc<Signature>>,
}

impl MemberDef {
    /// A member backed by a signature.
    pub fn new(signature: Signature) -> Self {
        Self {
            name: signature.name.clone(),
            signature: Some(Arc::new(signature)),
        }
    }

    /// A member without a signature.
    ///
    /// Only the reserved names [`EMPTY_GETTER`] and [`EMPTY_SETTER`] have an
    /// effect; any other marker is ignored during initialization.
    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: None,
        }
    }

    /// Marker clearing the pending getter.
    pub fn clear_getter() -> Self {
        Self::marker(EMPTY_GETTER)
    }

    /// Marker clearing the pending setter.
    pub fn clear_setter() -> Self {
        Self::marker(EMPTY_SETTER)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> Option<&Arc<Signature>> {
        self.signature.as_ref()
    }

    /// Numeric id; markers report 0.
    pub fn num(&self) -> u32 {
        self.signature.as_ref().map_or(0, |sig| sig.num())
    }

    /// Role of the signature; `None` for markers.
    pub fn role(&self) -> Option<SignatureRole> {
        self.signature.as_ref().map(|sig| sig.role())
    }

    pub fn is_marker(&self) -> bool {
        self.signature.is_none()
    }

    /// Mutable access to the signature while the member is still being
    /// declared. Returns `None` for markers and once the signature is shared.
    pub fn signature_mut(&mut self) -> Option<&mut Signature> {
        self.signature.as_mut().and_then(Arc::get_mut)
    }
}
