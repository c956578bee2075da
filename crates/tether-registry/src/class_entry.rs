//! Class entries and the builders that declare them.
//!
//! A [`ClassEntry`] is the registry's record of one native class: its name,
//! its ordered member list, its destruction routine and its readiness flag.
//! Entries are normally produced with [`ClassBuilder`]:
//!
//! ```
//! use tether_registry::ClassBuilder;
//!
//! struct Point {
//!     x: f64,
//! }
//!
//! let point = ClassBuilder::<Point>::new("Point")
//!     .constructor(|ctx| Ok(Point { x: ctx.arg(0)? }))
//!     .params(&[tether_core::TypeKey::of::<f64>()])
//!     .property("getX", "setX", |p: &Point| p.x, |p: &mut Point, x: f64| p.x = x)
//!     .build();
//! assert_eq!(point.name(), "Point");
//! ```

use std::any::Any;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tether_core::{
    CallContext, Deleter, Dynamic, FromDynamic, IntoDynamic, MemberDef, NativeError,
    NativeFn, Signature, SignatureRole, TypeKey,
};

/// Registry record of one native class.
///
/// The entry describes the class; it does not own any instance of it.
pub struct ClassEntry {
    name: String,
    type_key: TypeKey,
    members: Vec<MemberDef>,
    deleter: Option<Deleter>,
    ready: AtomicBool,
}

impl ClassEntry {
    /// Create an entry from an already assembled member list.
    pub fn new(
        name: impl Into<String>,
        type_key: TypeKey,
        members: Vec<MemberDef>,
        deleter: Option<Deleter>,
    ) -> Self {
        Self {
            name: name.into(),
            type_key,
            members,
            deleter,
            ready: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Ordered member list, in declaration order.
    pub fn members(&self) -> &[MemberDef] {
        &self.members
    }

    pub fn deleter(&self) -> Option<&Deleter> {
        self.deleter.as_ref()
    }

    /// Whether the class has been initialized.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Mark the class initialized.
    ///
    /// Returns true only for the call that performed the transition.
    pub fn init(&self) -> bool {
        !self.ready.swap(true, Ordering::AcqRel)
    }
}

impl std::fmt::Debug for ClassEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassEntry")
            .field("name", &self.name)
            .field("type_key", &self.type_key)
            .field("members", &self.members.len())
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Fluent builder for a [`ClassEntry`] describing the Rust type `T`.
///
/// Member ids are assigned from 1 upward in declaration order; clear
/// markers take no id. [`params`](Self::params) and
/// [`returns`](Self::returns) annotate the most recently declared member.
///
/// Accessor pairing follows declaration order: a getter is paired with the
/// setter declared before it. [`property`](Self::property) declares both
/// halves in that order.
pub struct ClassBuilder<T> {
    name: String,
    members: Vec<MemberDef>,
    next_num: u32,
    deleter: Option<Deleter>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    /// Start declaring a class with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            next_num: 1,
            deleter: None,
            _marker: PhantomData,
        }
    }

    fn push(mut self, role: SignatureRole, name: impl Into<String>, caller: NativeFn) -> Self {
        let num = self.next_num;
        self.next_num += 1;
        self.members
            .push(MemberDef::new(Signature::new(role, name, num, caller)));
        self
    }

    fn annotate(mut self, f: impl FnOnce(Signature) -> Signature) -> Self {
        if let Some(sig) = self.members.last_mut().and_then(MemberDef::signature_mut) {
            *sig = f(sig.clone());
        }
        self
    }

    /// Declare a constructor returning a new instance.
    pub fn constructor<F>(self, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<T, NativeError> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        let caller = NativeFn::new(move |ctx: &mut CallContext<'_>| {
            let instance = f(ctx)?;
            ctx.set_return_slot(Dynamic::native(instance));
            Ok(())
        });
        self.push(SignatureRole::Constructor, name, caller)
            .returns(TypeKey::of::<T>())
    }

    /// Declare an instance method.
    pub fn method<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.push(SignatureRole::Method, name, NativeFn::new(f))
    }

    /// Declare a class-level static function.
    pub fn function<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.push(SignatureRole::Function, name, NativeFn::new(f))
    }

    /// Declare a getter working on the raw call context.
    pub fn getter<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.push(SignatureRole::Getter, name, NativeFn::new(f))
    }

    /// Declare a setter working on the raw call context.
    pub fn setter<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.push(SignatureRole::Setter, name, NativeFn::new(f))
    }

    /// Declare a typed getter.
    pub fn property_getter<R, F>(self, name: impl Into<String>, f: F) -> Self
    where
        R: IntoDynamic + 'static,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        self.getter(name, move |ctx| {
            let value = f(ctx.this::<T>()?);
            ctx.set_return(value);
            Ok(())
        })
        .params(&[])
    }

    /// Declare a typed setter.
    pub fn property_setter<A, F>(self, name: impl Into<String>, f: F) -> Self
    where
        A: FromDynamic + 'static,
        F: Fn(&mut T, A) + Send + Sync + 'static,
    {
        self.setter(name, move |ctx| {
            let value: A = ctx.arg(0)?;
            f(ctx.this_mut::<T>()?, value);
            Ok(())
        })
        .params(&[TypeKey::of::<A>()])
    }

    /// Declare a read/write property: the setter first, then the getter.
    pub fn property<R, A, G, S>(
        self,
        getter_name: impl Into<String>,
        setter_name: impl Into<String>,
        get: G,
        set: S,
    ) -> Self
    where
        R: IntoDynamic + 'static,
        A: FromDynamic + 'static,
        G: Fn(&T) -> R + Send + Sync + 'static,
        S: Fn(&mut T, A) + Send + Sync + 'static,
    {
        self.property_setter(setter_name, set)
            .property_getter(getter_name, get)
    }

    /// Unbind the getter half of the accessor exposed by the pending getter.
    pub fn clear_getter(mut self) -> Self {
        self.members.push(MemberDef::clear_getter());
        self
    }

    /// Drop the pending setter, so the next getter starts without a setter half.
    pub fn clear_setter(mut self) -> Self {
        self.members.push(MemberDef::clear_setter());
        self
    }

    /// Declare the parameter types of the last member.
    pub fn params(self, params: &[TypeKey]) -> Self {
        self.annotate(|sig| sig.with_params(params.to_vec()))
    }

    /// Declare the return type of the last member.
    ///
    /// A method whose return type is a registered class hands back a new
    /// wrapper for the returned instance.
    pub fn returns(self, key: TypeKey) -> Self {
        self.annotate(|sig| sig.with_returns(key))
    }

    /// Destruction routine run when a wrapper releases its instance.
    pub fn deleter<F>(mut self, f: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.deleter = Some(Arc::new(move |instance: Box<dyn Any + Send + Sync>| {
            if let Ok(instance) = instance.downcast::<T>() {
                f(*instance);
            }
        }));
        self
    }

    /// Finish the declaration.
    pub fn build(self) -> Arc<ClassEntry> {
        Arc::new(ClassEntry::new(
            self.name,
            TypeKey::of::<T>(),
            self.members,
            self.deleter,
        ))
    }
}

/// Builder for a free function signature.
///
/// The numeric id is assigned by the registry when the function is
/// registered.
pub struct FunctionBuilder {
    signature: Signature,
}

impl FunctionBuilder {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        Self {
            signature: Signature::new(SignatureRole::Function, name, 0, NativeFn::new(f)),
        }
    }

    pub fn params(mut self, params: &[TypeKey]) -> Self {
        self.signature = self.signature.with_params(params.to_vec());
        self
    }

    pub fn returns(mut self, key: TypeKey) -> Self {
        self.signature = self.signature.with_returns(key);
        self
    }

    pub fn build(self) -> Signature {
        self.signature
    }
}
