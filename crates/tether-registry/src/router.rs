//! Dispatch router.
//!
//! The [`Router`] turns a dynamic call (target, member num, arguments) into
//! an invocation of the registered native implementation. It owns the
//! [`WrapperHeap`] holding every object the caller can see.
//!
//! Resolution is by num within the target's class (or the free-function
//! table). When several members share a name, the by-name entry points
//! reach the last registered one; arguments are never used to pick between
//! them, except for constructors with declared arity.

use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use tether_core::{
    BindError, CallContext, ClassId, Dynamic, NativeError, ObjectWrapper, Signature,
    SignatureRole, WrapperHandle, WrapperHeap,
};

use crate::binding::{AccessorId, Bindings, ClassBinding, FREE_MEMBER};

/// What a call is made on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A wrapped object; instance members.
    Instance(WrapperHandle),
    /// A class; static members and constructors.
    Class(ClassId),
    /// The free-function table.
    Global,
}

/// Routes dynamic calls to native implementations.
pub struct Router {
    bindings: Arc<Bindings>,
    heap: WrapperHeap,
}

impl Router {
    pub fn new(bindings: Arc<Bindings>) -> Self {
        Self {
            bindings,
            heap: WrapperHeap::new(),
        }
    }

    pub fn bindings(&self) -> &Arc<Bindings> {
        &self.bindings
    }

    pub fn heap(&self) -> &WrapperHeap {
        &self.heap
    }

    /// Class of a live wrapper.
    pub fn class_of(&self, handle: WrapperHandle) -> Option<ClassId> {
        self.heap.get(handle).map(|wrapper| wrapper.class())
    }

    /// Invoke member `num` of `target`.
    ///
    /// Instance targets reach methods, getters and setters; class targets
    /// reach static functions and constructors (returning the new object);
    /// the global target reaches free functions.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn invoke(
        &mut self,
        target: Target,
        num: u32,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, BindError> {
        match target {
            Target::Instance(handle) => {
                let wrapper = self.wrapper(handle)?;
                let sig = self
                    .class(wrapper.class())?
                    .signature(num)
                    .filter(|sig| sig.role().needs_this())
                    .cloned()
                    .ok_or_else(|| self.unbound_num(wrapper.class(), num))?;
                let ret = self.call(&sig, Some((handle, &*wrapper)), args)?;
                Ok(self.adopt_return(&sig, ret))
            }
            Target::Class(class) => {
                let sig = self
                    .class(class)?
                    .signature(num)
                    .filter(|sig| !sig.role().needs_this())
                    .cloned()
                    .ok_or_else(|| self.unbound_num(class, num))?;
                if sig.role() == SignatureRole::Constructor {
                    return self.construct_with(class, &sig, args).map(Dynamic::Object);
                }
                let ret = self.call(&sig, None, args)?;
                Ok(self.adopt_return(&sig, ret))
            }
            Target::Global => {
                let sig = self
                    .bindings
                    .function(num)
                    .cloned()
                    .ok_or_else(|| unbound(format!("function #{num}")))?;
                let ret = self.call(&sig, None, args)?;
                Ok(self.adopt_return(&sig, ret))
            }
        }
    }

    /// Construct a new instance of `class` and wrap it.
    pub fn construct(
        &mut self,
        class: ClassId,
        args: Vec<Dynamic>,
    ) -> Result<WrapperHandle, BindError> {
        let binding = self.class(class)?;
        let sig = binding
            .select_constructor(args.len())
            .cloned()
            .ok_or_else(|| BindError::NotConstructible {
                class: binding.name().to_string(),
            })?;
        self.construct_with(class, &sig, args)
    }

    fn construct_with(
        &mut self,
        class: ClassId,
        sig: &Signature,
        args: Vec<Dynamic>,
    ) -> Result<WrapperHandle, BindError> {
        match self.call(sig, None, args)? {
            Dynamic::Native(instance) => self.wrap_boxed(class, instance),
            Dynamic::Object(handle) => Ok(handle),
            other => Err(BindError::from_native(
                sig.name(),
                NativeError::other(format!(
                    "constructor returned {} instead of an instance",
                    other.type_name()
                )),
            )),
        }
    }

    /// Read an accessor through its getter half.
    pub fn get_property(
        &mut self,
        handle: WrapperHandle,
        accessor: AccessorId,
    ) -> Result<Dynamic, BindError> {
        self.invoke_accessor(handle, accessor, SignatureRole::Getter, Vec::new())
    }

    /// Write an accessor through its setter half.
    pub fn set_property(
        &mut self,
        handle: WrapperHandle,
        accessor: AccessorId,
        value: Dynamic,
    ) -> Result<(), BindError> {
        self.invoke_accessor(handle, accessor, SignatureRole::Setter, vec![value])
            .map(|_| ())
    }

    fn invoke_accessor(
        &mut self,
        handle: WrapperHandle,
        accessor: AccessorId,
        role: SignatureRole,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, BindError> {
        let wrapper = self.wrapper(handle)?;
        let class = wrapper.class();
        let num = match role {
            SignatureRole::Setter => accessor.setter(),
            _ => accessor.getter(),
        };
        // num 0 is a cleared or missing accessor half
        let sig = (num != 0)
            .then(|| self.class(class).ok()?.signature(num).cloned())
            .flatten()
            .filter(|sig| sig.role() == role)
            .ok_or_else(|| self.unbound_accessor(class, accessor, role))?;
        let ret = self.call(&sig, Some((handle, &*wrapper)), args)?;
        Ok(self.adopt_return(&sig, ret))
    }

    /// Release a wrapped object.
    ///
    /// Returns true if this call destroyed the instance. Freeing a stale
    /// handle is a no-op.
    pub fn free(&mut self, handle: WrapperHandle) -> bool {
        self.heap
            .remove(handle)
            .is_some_and(|wrapper| wrapper.release())
    }

    /// Wrap an existing native instance as an object of `class`.
    pub fn wrap_ptr<T: Any + Send + Sync>(
        &mut self,
        class: ClassId,
        instance: T,
    ) -> Result<WrapperHandle, BindError> {
        self.wrap_boxed(class, Box::new(instance))
    }

    fn wrap_boxed(
        &mut self,
        class: ClassId,
        instance: Box<dyn Any + Send + Sync>,
    ) -> Result<WrapperHandle, BindError> {
        let deleter = self.class(class)?.deleter().cloned();
        Ok(self.heap.insert(ObjectWrapper::new(class, instance, deleter)))
    }

    /// Call an instance method by name.
    ///
    /// `free` releases the object unless the class declares its own `free`.
    pub fn call_method(
        &mut self,
        handle: WrapperHandle,
        name: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, BindError> {
        let class = self.wrapper(handle)?.class();
        let method = self.class(class)?.method_num(name);
        match method {
            Some(num) => self.invoke(Target::Instance(handle), num, args),
            None if name == FREE_MEMBER => {
                self.free(handle);
                Ok(Dynamic::Void)
            }
            None => Err(self.unbound_name(class, name)),
        }
    }

    /// Call a static function of a class by name.
    pub fn call_static(
        &mut self,
        class: ClassId,
        name: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, BindError> {
        let num = self
            .class(class)?
            .static_num(name)
            .ok_or_else(|| self.unbound_name(class, name))?;
        self.invoke(Target::Class(class), num, args)
    }

    /// Call a free function by name.
    pub fn call_function(&mut self, name: &str, args: Vec<Dynamic>) -> Result<Dynamic, BindError> {
        let num = self
            .bindings
            .function_num(name)
            .ok_or_else(|| unbound(name.to_string()))?;
        self.invoke(Target::Global, num, args)
    }

    /// Read a property by its exposed name.
    pub fn get(&mut self, handle: WrapperHandle, property: &str) -> Result<Dynamic, BindError> {
        let accessor = self.accessor(handle, property)?;
        self.get_property(handle, accessor)
    }

    /// Write a property by its exposed name.
    pub fn set(
        &mut self,
        handle: WrapperHandle,
        property: &str,
        value: Dynamic,
    ) -> Result<(), BindError> {
        let accessor = self.accessor(handle, property)?;
        self.set_property(handle, accessor, value)
    }

    fn accessor(&self, handle: WrapperHandle, property: &str) -> Result<AccessorId, BindError> {
        let class = self.wrapper(handle)?.class();
        self.class(class)?
            .accessor(property)
            .map(|accessor| accessor.id)
            .ok_or_else(|| self.unbound_name(class, property))
    }

    fn wrapper(&self, handle: WrapperHandle) -> Result<Arc<ObjectWrapper>, BindError> {
        self.heap
            .get(handle)
            .cloned()
            .ok_or(BindError::StaleHandle {
                index: handle.index,
            })
    }

    fn class(&self, class: ClassId) -> Result<&ClassBinding, BindError> {
        self.bindings
            .class(class)
            .ok_or_else(|| unbound(class.to_string()))
    }

    fn unbound_num(&self, class: ClassId, num: u32) -> BindError {
        match self.bindings.class(class) {
            Some(binding) => unbound(format!("{}#{}", binding.name(), num)),
            None => unbound(format!("{class}#{num}")),
        }
    }

    fn unbound_accessor(
        &self,
        class: ClassId,
        accessor: AccessorId,
        role: SignatureRole,
    ) -> BindError {
        let half = match role {
            SignatureRole::Setter => "setter",
            _ => "getter",
        };
        let Some(binding) = self.bindings.class(class) else {
            return unbound(format!("{class}.{accessor} ({half})"));
        };
        match binding.accessors().iter().find(|a| a.id == accessor) {
            Some(exposed) => unbound(format!("{}.{} ({half})", binding.name(), exposed.name)),
            None => unbound(format!("{}.{accessor} ({half})", binding.name())),
        }
    }

    fn unbound_name(&self, class: ClassId, name: &str) -> BindError {
        match self.bindings.class(class) {
            Some(binding) => unbound(format!("{}.{}", binding.name(), name)),
            None => unbound(format!("{class}.{name}")),
        }
    }

    fn call(
        &self,
        sig: &Signature,
        this: Option<(WrapperHandle, &ObjectWrapper)>,
        mut args: Vec<Dynamic>,
    ) -> Result<Dynamic, BindError> {
        if self.bindings.config().strict_arity
            && let Some(arity) = sig.arity()
            && arity != args.len()
        {
            let err = BindError::argument_mismatch(
                sig.name(),
                format!("expected {arity} arguments, got {}", args.len()),
            );
            debug!(error = %err, "dispatch failed");
            return Err(err);
        }

        let heap = &self.heap;
        let host: &(dyn Any + Send + Sync + 'static) = &*self.bindings;
        let mut ret = Dynamic::Void;

        let result = match this {
            Some((handle, wrapper)) => wrapper
                .with_instance(|instance| {
                    let mut ctx = CallContext::new(&mut args, &mut ret)
                        .with_this(instance)
                        .with_heap(heap)
                        .with_host(host);
                    sig.call(&mut ctx)
                })
                .ok_or(BindError::StaleHandle {
                    index: handle.index,
                })?,
            None => {
                let mut ctx = CallContext::new(&mut args, &mut ret)
                    .with_heap(heap)
                    .with_host(host);
                sig.call(&mut ctx)
            }
        };

        result.map_err(|source| {
            let err = BindError::from_native(sig.name(), source);
            debug!(error = %err, "native call failed");
            err
        })?;
        Ok(ret)
    }

    /// Wrap a native return value whose declared type is a registered class.
    fn adopt_return(&mut self, sig: &Signature, ret: Dynamic) -> Dynamic {
        let class = sig
            .returns()
            .and_then(|key| self.bindings.class_by_key(key))
            .map(ClassBinding::id);
        match (ret, class) {
            (Dynamic::Native(instance), Some(class)) => self
                .wrap_boxed(class, instance)
                .map_or(Dynamic::NullHandle, Dynamic::Object),
            (ret, _) => ret,
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("bindings", &self.bindings)
            .field("heap", &self.heap)
            .finish()
    }
}

fn unbound(member: String) -> BindError {
    debug!(member = %member, "unbound member");
    BindError::unbound(member)
}
