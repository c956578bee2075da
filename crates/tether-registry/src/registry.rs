//! Registry - class and free-function tables.
//!
//! This module provides [`Registry`], where declaration code records native
//! classes, free functions, primitives and named types during bring-up, and
//! [`Registry::initialize_all`], which turns them into the dispatch-ready
//! [`Bindings`] table.
//!
//! # Thread Safety
//!
//! `Registry` is not internally synchronized. Registration and
//! initialization are single-threaded bring-up phases that finish before any
//! dispatch happens; afterwards the registry is sealed and only the shared
//! [`Bindings`] are used. The process-wide instance in [`global`] is guarded
//! by a mutex.
//!
//! # Example
//!
//! ```
//! use tether_registry::{ClassBuilder, Registry};
//!
//! struct Counter(i64);
//!
//! let mut registry = Registry::new();
//! registry
//!     .register_class(ClassBuilder::<Counter>::new("Counter").build())
//!     .unwrap();
//!
//! let bindings = registry.initialize_all();
//! assert!(bindings.class_by_name("Counter").is_some());
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use tether_core::{
    CallContext, ClassId, NativeError, Primitive, PrimitiveInfo, RegistrationError, Signature,
    TypeCategory, TypeKey,
};

use crate::binding::{Bindings, ClassBinding, NamedType};
use crate::class_entry::{ClassEntry, FunctionBuilder};
use crate::config::BindingConfig;
use crate::reflect;

/// A registered free function.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub name: String,
    pub signature: Arc<Signature>,
}

/// Class and free-function registry.
pub struct Registry {
    config: BindingConfig,
    /// Class slots in registration order; `None` once evicted by a walk.
    classes: Vec<Option<Arc<ClassEntry>>>,
    /// Id of each class slot, parallel to `classes`.
    slot_ids: Vec<ClassId>,
    class_names: FxHashMap<String, ClassId>,
    /// Distinct entries, indexed by their id in this registry.
    entries: Vec<Arc<ClassEntry>>,
    functions: Vec<FunctionEntry>,
    primitives: Vec<PrimitiveInfo>,
    types: Vec<NamedType>,
    root: Option<Arc<ClassEntry>>,
    bindings: Option<Arc<Bindings>>,
}

impl Registry {
    /// Create a registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BindingConfig::default())
    }

    /// Create a registry with the given configuration.
    ///
    /// The standard primitives are pre-registered. With
    /// [`BindingConfig::root_class`] set, the built-in `Tether` root class and
    /// the `TypeIdentity` class are registered first.
    pub fn with_config(config: BindingConfig) -> Self {
        let mut registry = Self {
            config,
            classes: Vec::new(),
            slot_ids: Vec::new(),
            class_names: FxHashMap::default(),
            entries: Vec::new(),
            functions: Vec::new(),
            primitives: PrimitiveInfo::standard(),
            types: Vec::new(),
            root: None,
            bindings: None,
        };

        if config.root_class {
            let root = reflect::root_class();
            registry.root = Some(Arc::clone(&root));
            for entry in [root, reflect::type_identity_class()] {
                if let Err(err) = registry.register_class(entry) {
                    debug!(error = %err, "built-in class not registered");
                }
            }
        }
        registry
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Whether [`initialize_all`](Self::initialize_all) has run.
    pub fn is_sealed(&self) -> bool {
        self.bindings.is_some()
    }

    fn check_open(&self, what: &str) -> Result<(), RegistrationError> {
        if self.is_sealed() {
            return Err(RegistrationError::Sealed(what.to_string()));
        }
        Ok(())
    }

    /// Append a class to the class list.
    ///
    /// Ids are local to this registry. Registering the same entry again
    /// appends a second slot with the same id; the walk initializes it once.
    /// A different entry under an existing name is rejected.
    pub fn register_class(&mut self, entry: Arc<ClassEntry>) -> Result<ClassId, RegistrationError> {
        self.check_open(entry.name())?;

        let id = match self.class_names.get(entry.name()) {
            Some(&id) if self.entry(id).is_some_and(|known| Arc::ptr_eq(known, &entry)) => id,
            Some(_) => return Err(RegistrationError::DuplicateClass(entry.name().to_string())),
            None => {
                let id = ClassId::new(self.entries.len() as u32);
                self.entries.push(Arc::clone(&entry));
                self.class_names.insert(entry.name().to_string(), id);
                id
            }
        };

        trace!(class = entry.name(), id = %id, "registered class");
        self.classes.push(Some(entry));
        self.slot_ids.push(id);
        Ok(id)
    }

    fn entry(&self, id: ClassId) -> Option<&Arc<ClassEntry>> {
        self.entries.get(id.index() as usize)
    }

    /// Id this registry assigned to `entry`, if it was registered here.
    pub fn class_id(&self, entry: &Arc<ClassEntry>) -> Option<ClassId> {
        self.class_names
            .get(entry.name())
            .copied()
            .filter(|&id| self.entry(id).is_some_and(|known| Arc::ptr_eq(known, entry)))
    }

    /// Append a free function and assign its num.
    ///
    /// Nums start at 1. Registering a name again keeps the earlier function
    /// reachable by num; by name the last registration wins.
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        signature: Signature,
    ) -> Result<u32, RegistrationError> {
        let name = name.into();
        self.check_open(&name)?;

        let num = self.functions.len() as u32 + 1;
        trace!(function = %name, num, "registered function");
        self.functions.push(FunctionEntry {
            name,
            signature: Arc::new(signature.with_num(num)),
        });
        Ok(num)
    }

    /// Register a free function from a closure.
    pub fn function<F>(&mut self, name: impl Into<String>, f: F) -> Result<u32, RegistrationError>
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        let name = name.into();
        let signature = FunctionBuilder::new(name.clone(), f).build();
        self.register_function(name, signature)
    }

    /// Record a primitive type under a custom name.
    pub fn register_primitive<T: Primitive>(
        &mut self,
        name: impl Into<String>,
    ) -> Result<(), RegistrationError> {
        let info = PrimitiveInfo::named::<T>(name);
        self.check_open(&info.name)?;
        self.primitives.retain(|existing| existing.key() != info.key());
        self.primitives.push(info);
        Ok(())
    }

    /// Record a named non-class type for introspection.
    pub fn register_type(
        &mut self,
        key: TypeKey,
        name: impl Into<String>,
        category: TypeCategory,
    ) -> Result<(), RegistrationError> {
        let named = NamedType::new(key, name, category);
        self.check_open(&named.name)?;
        self.types.push(named);
        Ok(())
    }

    /// Class slots in registration order.
    pub fn class_list(&self) -> &[Option<Arc<ClassEntry>>] {
        &self.classes
    }

    /// Free functions in registration order.
    pub fn function_list(&self) -> &[FunctionEntry] {
        &self.functions
    }

    pub fn primitives(&self) -> &[PrimitiveInfo] {
        &self.primitives
    }

    /// The always-first class, if the configuration registers one.
    pub fn root_class(&self) -> Option<&Arc<ClassEntry>> {
        self.root.as_ref()
    }

    /// Initialize every registered class and seal the registry.
    ///
    /// The root class is initialized first, then the class list is walked in
    /// registration order. Empty slots and classes that are already ready
    /// are skipped and evicted. Later calls return the same table.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn initialize_all(&mut self) -> Arc<Bindings> {
        if let Some(bindings) = &self.bindings {
            return Arc::clone(bindings);
        }

        let mut classes = Vec::new();

        let root_id = self.root.as_ref().and_then(|root| {
            let id = self.class_id(root)?;
            if root.init() {
                classes.push(ClassBinding::build(root, id, None, &self.config));
            }
            Some(id)
        });

        for (slot, &id) in self.classes.iter_mut().zip(&self.slot_ids) {
            let Some(entry) = slot.as_ref() else {
                continue;
            };
            if !entry.init() {
                debug!(class = entry.name(), "class already initialized, skipping");
                *slot = None;
                continue;
            }
            classes.push(ClassBinding::build(entry, id, root_id, &self.config));
        }

        let functions = self
            .functions
            .iter()
            .map(|function| Arc::clone(&function.signature))
            .collect();

        debug!(
            classes = classes.len(),
            functions = self.functions.len(),
            "initialized bindings"
        );

        let bindings = Arc::new(Bindings::new(
            self.config,
            classes,
            functions,
            self.primitives.clone(),
            self.types.clone(),
            root_id,
        ));
        self.bindings = Some(Arc::clone(&bindings));
        bindings
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("classes", &self.classes.len())
            .field("functions", &self.functions.len())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

/// The process-wide registry.
///
/// Declaration code registers into it during bring-up; the host adapter
/// calls [`bindings`] once bring-up is complete.
pub mod global {
    use std::sync::Arc;

    use lazy_static::lazy_static;
    use parking_lot::Mutex;

    use tether_core::{ClassId, RegistrationError, Signature};

    use super::Registry;
    use crate::binding::Bindings;
    use crate::class_entry::ClassEntry;

    lazy_static! {
        static ref GLOBAL: Mutex<Registry> = Mutex::new(Registry::new());
    }

    pub fn register_class(entry: Arc<ClassEntry>) -> Result<ClassId, RegistrationError> {
        GLOBAL.lock().register_class(entry)
    }

    pub fn register_function(
        name: impl Into<String>,
        signature: Signature,
    ) -> Result<u32, RegistrationError> {
        GLOBAL.lock().register_function(name, signature)
    }

    /// Run `f` with exclusive access to the process-wide registry.
    pub fn with_registry<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
        f(&mut GLOBAL.lock())
    }

    /// Initialize the process-wide registry (once) and return its bindings.
    pub fn bindings() -> Arc<Bindings> {
        GLOBAL.lock().initialize_all()
    }
}
