//! The bindings table produced by initializing a registry.
//!
//! Initialization partitions each class's member list by role:
//!
//! | Role          | Exposed as                                        |
//! |---------------|---------------------------------------------------|
//! | `Constructor` | entry in the class's constructor table            |
//! | `Method`      | instance member under its raw name                |
//! | `Function`    | static member under its raw name                  |
//! | `Setter`      | becomes the pending setter; also completes the    |
//! |               | accessor of a pending getter that has no setter   |
//! | `Getter`      | accessor under the normalized name, paired with   |
//! |               | the pending setter; becomes the pending getter    |
//!
//! The empty getter marker zeroes the getter half of the pending getter's
//! accessor and the empty setter marker drops the pending setter.
//!
//! Accessors carry a packed [`AccessorId`]: the setter num in the high 16
//! bits and the getter num in the low 16 bits. A num of 0 marks a missing
//! half.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use tether_core::naming::normalize;
use tether_core::{
    ClassId, Deleter, Dynamic, EMPTY_GETTER, EMPTY_SETTER, PrimitiveInfo, Signature,
    SignatureRole, TypeCategory, TypeIdentity, TypeKey,
};

use crate::class_entry::ClassEntry;
use crate::config::BindingConfig;

/// Name of the implicit destruction member every class exposes.
pub const FREE_MEMBER: &str = "free";

/// Packed getter/setter pair identifying an accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessorId(u32);

impl AccessorId {
    /// Shift of the setter num.
    pub const SETTER_SHIFT: u32 = 16;
    /// Mask of the getter num.
    pub const GETTER_MASK: u32 = 0xffff;
    /// Largest num either half can hold. Accessors with larger nums are
    /// not exposed.
    pub const MAX_NUM: u32 = Self::GETTER_MASK;

    /// Pack a setter and getter num.
    ///
    /// Each num is truncated to 16 bits.
    #[inline]
    pub const fn pack(setter: u32, getter: u32) -> Self {
        Self(((setter & Self::GETTER_MASK) << Self::SETTER_SHIFT) | (getter & Self::GETTER_MASK))
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Getter num, 0 if the accessor cannot be read.
    #[inline]
    pub const fn getter(self) -> u32 {
        self.0 & Self::GETTER_MASK
    }

    /// Setter num, 0 if the accessor cannot be written.
    #[inline]
    pub const fn setter(self) -> u32 {
        self.0 >> Self::SETTER_SHIFT
    }
}

impl fmt::Display for AccessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.setter(), self.getter())
    }
}

/// An exposed property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub name: String,
    pub id: AccessorId,
}

/// A named non-class type recorded for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedType {
    pub identity: TypeIdentity,
    pub name: String,
}

impl NamedType {
    pub fn new(key: TypeKey, name: impl Into<String>, category: TypeCategory) -> Self {
        Self {
            identity: TypeIdentity::structured(key, category),
            name: name.into(),
        }
    }
}

/// The initialized, dispatch-ready view of one class.
pub struct ClassBinding {
    id: ClassId,
    name: String,
    type_key: TypeKey,
    constructors: Vec<Arc<Signature>>,
    methods: FxHashMap<String, u32>,
    statics: FxHashMap<String, u32>,
    accessors: Vec<Accessor>,
    accessor_index: FxHashMap<String, usize>,
    signatures: FxHashMap<u32, Arc<Signature>>,
    members: Vec<Arc<Signature>>,
    deleter: Option<Deleter>,
    root: Option<ClassId>,
}

impl ClassBinding {
    /// Partition a class's member list.
    ///
    /// Never fails: malformed declarations are accepted and simply stay
    /// unreachable.
    pub fn build(
        entry: &ClassEntry,
        id: ClassId,
        root: Option<ClassId>,
        config: &BindingConfig,
    ) -> Self {
        let mut binding = Self {
            id,
            name: entry.name().to_string(),
            type_key: entry.type_key(),
            constructors: Vec::new(),
            methods: FxHashMap::default(),
            statics: FxHashMap::default(),
            accessors: Vec::new(),
            accessor_index: FxHashMap::default(),
            signatures: FxHashMap::default(),
            members: Vec::new(),
            deleter: entry.deleter().cloned(),
            root,
        };

        // pending setter, and the last getter with the index of the
        // accessor it exposed
        let mut setter_num = 0;
        let mut pending_getter: Option<(u32, usize)> = None;

        for member in entry.members() {
            let Some(sig) = member.signature() else {
                match member.name() {
                    EMPTY_GETTER => {
                        if let Some((_, index)) = pending_getter.take() {
                            let setter = binding.accessors[index].id.setter();
                            binding.accessors[index].id = AccessorId::pack(setter, 0);
                        }
                    }
                    EMPTY_SETTER => setter_num = 0,
                    other => trace!(class = %binding.name, marker = other, "ignoring unknown marker"),
                }
                continue;
            };

            binding.signatures.insert(sig.num(), Arc::clone(sig));
            binding.members.push(Arc::clone(sig));

            let accessor_role = matches!(sig.role(), SignatureRole::Getter | SignatureRole::Setter);
            if accessor_role && sig.num() > AccessorId::MAX_NUM {
                debug!(
                    class = %binding.name,
                    member = sig.name(),
                    num = sig.num(),
                    "accessor num does not fit in 16 bits, not exposed"
                );
                continue;
            }

            match sig.role() {
                SignatureRole::Constructor => binding.constructors.push(Arc::clone(sig)),
                SignatureRole::Method => {
                    binding.methods.insert(sig.name().to_string(), sig.num());
                }
                SignatureRole::Function => {
                    binding.statics.insert(sig.name().to_string(), sig.num());
                }
                SignatureRole::Setter => {
                    setter_num = sig.num();
                    if let Some((getter, index)) = pending_getter
                        && binding.accessors[index].id.setter() == 0
                    {
                        let name = binding.accessors[index].name.clone();
                        binding.expose_accessor(name, AccessorId::pack(setter_num, getter));
                    }
                }
                SignatureRole::Getter => {
                    let name = if config.normalize_getters {
                        normalize(sig.name()).into_owned()
                    } else {
                        sig.name().to_string()
                    };
                    let index =
                        binding.expose_accessor(name, AccessorId::pack(setter_num, sig.num()));
                    pending_getter = Some((sig.num(), index));
                }
            }
        }

        debug!(
            class = %binding.name,
            id = %binding.id,
            methods = binding.methods.len(),
            statics = binding.statics.len(),
            accessors = binding.accessors.len(),
            constructors = binding.constructors.len(),
            "initialized class"
        );
        binding
    }

    fn expose_accessor(&mut self, name: String, id: AccessorId) -> usize {
        match self.accessor_index.get(&name) {
            Some(&index) => {
                self.accessors[index].id = id;
                index
            }
            None => {
                let index = self.accessors.len();
                self.accessor_index.insert(name.clone(), index);
                self.accessors.push(Accessor { name, id });
                index
            }
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Back-reference to the root class; `None` for the root itself.
    pub fn root(&self) -> Option<ClassId> {
        self.root
    }

    pub fn deleter(&self) -> Option<&Deleter> {
        self.deleter.as_ref()
    }

    /// Constructors in declaration order.
    pub fn constructors(&self) -> &[Arc<Signature>] {
        &self.constructors
    }

    /// Pick the constructor for a call with `argc` arguments.
    ///
    /// Later declarations win. A constructor whose declared arity matches is
    /// preferred, then one without a declared arity, then the last one.
    pub fn select_constructor(&self, argc: usize) -> Option<&Arc<Signature>> {
        let candidates = || self.constructors.iter().rev();
        candidates()
            .find(|sig| sig.arity() == Some(argc))
            .or_else(|| candidates().find(|sig| sig.arity().is_none()))
            .or_else(|| self.constructors.last())
    }

    /// Any signature of this class by num.
    pub fn signature(&self, num: u32) -> Option<&Arc<Signature>> {
        self.signatures.get(&num)
    }

    pub fn method_num(&self, name: &str) -> Option<u32> {
        self.methods.get(name).copied()
    }

    pub fn static_num(&self, name: &str) -> Option<u32> {
        self.statics.get(name).copied()
    }

    pub fn accessor(&self, name: &str) -> Option<&Accessor> {
        self.accessor_index
            .get(name)
            .and_then(|&index| self.accessors.get(index))
    }

    /// Exposed accessors in exposure order.
    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    /// Exposed instance member names, including the implicit `free`.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        let free = (!self.methods.contains_key(FREE_MEMBER)).then_some(FREE_MEMBER);
        self.methods.keys().map(String::as_str).chain(free)
    }

    pub fn static_names(&self) -> impl Iterator<Item = &str> {
        self.statics.keys().map(String::as_str)
    }

    /// Every signature in declaration order.
    pub fn members(&self) -> &[Arc<Signature>] {
        &self.members
    }
}

impl fmt::Debug for ClassBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBinding")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("constructors", &self.constructors.len())
            .field("methods", &self.methods)
            .field("statics", &self.statics)
            .field("accessors", &self.accessors)
            .field("root", &self.root)
            .finish()
    }
}

/// Everything the host adapter needs after initialization.
///
/// Immutable apart from the bound-value table.
pub struct Bindings {
    config: BindingConfig,
    classes: Vec<ClassBinding>,
    by_name: FxHashMap<String, usize>,
    by_id: FxHashMap<ClassId, usize>,
    by_key: FxHashMap<TypeKey, usize>,
    functions: Vec<Arc<Signature>>,
    function_nums: FxHashMap<u32, usize>,
    function_names: FxHashMap<String, u32>,
    primitives: Vec<PrimitiveInfo>,
    types: Vec<NamedType>,
    root: Option<ClassId>,
    values: RwLock<FxHashMap<String, Arc<Dynamic>>>,
}

impl Bindings {
    pub(crate) fn new(
        config: BindingConfig,
        classes: Vec<ClassBinding>,
        functions: Vec<Arc<Signature>>,
        primitives: Vec<PrimitiveInfo>,
        types: Vec<NamedType>,
        root: Option<ClassId>,
    ) -> Self {
        let mut by_name = FxHashMap::default();
        let mut by_id = FxHashMap::default();
        let mut by_key = FxHashMap::default();
        for (index, class) in classes.iter().enumerate() {
            by_name.insert(class.name.clone(), index);
            by_id.insert(class.id, index);
            by_key.insert(class.type_key, index);
        }

        let mut function_nums = FxHashMap::default();
        let mut function_names = FxHashMap::default();
        for (index, sig) in functions.iter().enumerate() {
            function_nums.insert(sig.num(), index);
            function_names.insert(sig.name().to_string(), sig.num());
        }

        Self {
            config,
            classes,
            by_name,
            by_id,
            by_key,
            functions,
            function_nums,
            function_names,
            primitives,
            types,
            root,
            values: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Classes in initialization order.
    pub fn classes(&self) -> &[ClassBinding] {
        &self.classes
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassBinding> {
        self.by_id.get(&id).map(|&index| &self.classes[index])
    }

    pub fn class_by_name(&self, name: &str) -> Option<&ClassBinding> {
        self.by_name.get(name).map(|&index| &self.classes[index])
    }

    pub fn class_by_key(&self, key: TypeKey) -> Option<&ClassBinding> {
        self.by_key.get(&key).map(|&index| &self.classes[index])
    }

    /// The always-first class, if one was registered.
    pub fn root(&self) -> Option<ClassId> {
        self.root
    }

    /// Free functions in registration order.
    pub fn functions(&self) -> &[Arc<Signature>] {
        &self.functions
    }

    pub fn function(&self, num: u32) -> Option<&Arc<Signature>> {
        self.function_nums
            .get(&num)
            .map(|&index| &self.functions[index])
    }

    /// Num of the last function registered under `name`.
    pub fn function_num(&self, name: &str) -> Option<u32> {
        self.function_names.get(name).copied()
    }

    pub fn primitives(&self) -> &[PrimitiveInfo] {
        &self.primitives
    }

    pub fn types(&self) -> &[NamedType] {
        &self.types
    }

    /// Bind a named value; rebinding replaces the previous value.
    pub fn bind_value(&self, name: impl Into<String>, value: Dynamic) {
        let name = name.into();
        trace!(name = %name, kind = value.type_name(), "bound value");
        self.values.write().insert(name, Arc::new(value));
    }

    pub fn bound_value(&self, name: &str) -> Option<Arc<Dynamic>> {
        self.values.read().get(name).cloned()
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("classes", &self.classes.len())
            .field("functions", &self.functions.len())
            .field("primitives", &self.primitives.len())
            .field("types", &self.types.len())
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tether_core::{CallContext, MemberDef, NativeError, NativeFn};

    use super::*;
    use crate::class_entry::ClassBuilder;

    struct Point;

    fn ok(_: &mut CallContext<'_>) -> Result<(), NativeError> {
        Ok(())
    }

    fn build(entry: &ClassEntry) -> ClassBinding {
        ClassBinding::build(entry, ClassId::new(1), None, &BindingConfig::default())
    }

    #[test]
    fn accessor_id_packing() {
        let id = AccessorId::pack(2, 1);
        assert_eq!(id.bits(), (2 << 16) | 1);
        assert_eq!(id.getter(), 1);
        assert_eq!(id.setter(), 2);
        assert_eq!(AccessorId::from_bits((2 << 16) | 1), id);
        assert_eq!(id.to_string(), "2:1");
        assert_eq!(AccessorId::pack(0, 5).setter(), 0);
    }

    #[test]
    fn roles_are_partitioned() {
        let entry = ClassBuilder::<Point>::new("Point")
            .constructor(|_| Ok(Point))
            .method("move", ok)
            .function("origin", ok)
            .setter("setX", ok)
            .getter("getX", ok)
            .build();
        let binding = build(&entry);

        assert_eq!(binding.constructors().len(), 1);
        assert_eq!(binding.method_num("move"), Some(2));
        assert_eq!(binding.static_num("origin"), Some(3));
        assert_eq!(binding.method_num("setX"), None);
        assert_eq!(binding.accessor("x").map(|a| a.id), Some(AccessorId::pack(4, 5)));
        assert_eq!(binding.accessor("getX"), None);
        assert_eq!(binding.members().len(), 5);
        assert!(binding.signature(4).is_some());
    }

    #[test]
    fn setter_after_getter_completes_accessor() {
        let entry = ClassBuilder::<Point>::new("Point")
            .getter("getX", ok)
            .setter("setX", ok)
            .build();
        let binding = build(&entry);
        let id = binding.accessor("x").unwrap().id;
        assert_eq!(id.getter(), 1);
        assert_eq!(id.setter(), 2);
    }

    #[test]
    fn clear_getter_keeps_setter_bound() {
        let entry = ClassBuilder::<Point>::new("Point")
            .getter("getX", ok)
            .setter("setX", ok)
            .clear_getter()
            .build();
        let binding = build(&entry);
        let id = binding.accessor("x").unwrap().id;
        assert_eq!(id.getter(), 0);
        assert_eq!(id.setter(), 2);
        assert!(binding.signature(1).is_some());
    }

    #[test]
    fn clear_getter_without_pending_getter_is_a_no_op() {
        let entry = ClassBuilder::<Point>::new("Point")
            .setter("setX", ok)
            .getter("getX", ok)
            .clear_getter()
            .clear_getter()
            .getter("getY", ok)
            .build();
        let binding = build(&entry);
        assert_eq!(binding.accessor("x").unwrap().id, AccessorId::pack(1, 0));
        assert_eq!(binding.accessor("y").unwrap().id, AccessorId::pack(1, 3));
    }

    #[test]
    fn consecutive_properties_do_not_clobber() {
        let entry = ClassBuilder::<Point>::new("Point")
            .property("getX", "setX", |_: &Point| 0.0, |_: &mut Point, _: f64| {})
            .property("getY", "setY", |_: &Point| 0.0, |_: &mut Point, _: f64| {})
            .build();
        let binding = build(&entry);
        assert_eq!(binding.accessor("x").unwrap().id, AccessorId::pack(1, 2));
        assert_eq!(binding.accessor("y").unwrap().id, AccessorId::pack(3, 4));
    }

    #[test]
    fn oversized_accessor_nums_are_not_exposed() {
        let getter = Signature::new(SignatureRole::Getter, "getBig", 0x1_0001, NativeFn::new(ok));
        let setter = Signature::new(SignatureRole::Setter, "setBig", 0x1_0002, NativeFn::new(ok));
        let entry = ClassEntry::new(
            "Point",
            TypeKey::of::<Point>(),
            vec![MemberDef::new(setter), MemberDef::new(getter)],
            None,
        );
        let binding = build(&entry);
        assert!(binding.accessors().is_empty());
        assert!(binding.signature(0x1_0001).is_some());
    }

    #[test]
    fn clear_setter_stops_pairing() {
        let entry = ClassBuilder::<Point>::new("Point")
            .setter("setX", ok)
            .getter("getX", ok)
            .clear_setter()
            .getter("getLength", ok)
            .build();
        let binding = build(&entry);
        assert_eq!(binding.accessor("x").unwrap().id, AccessorId::pack(1, 2));
        assert_eq!(binding.accessor("length").unwrap().id, AccessorId::pack(0, 3));
    }

    #[test]
    fn pending_setter_carries_over_without_marker() {
        let entry = ClassBuilder::<Point>::new("Point")
            .setter("setX", ok)
            .getter("getX", ok)
            .getter("getY", ok)
            .build();
        let binding = build(&entry);
        assert_eq!(binding.accessor("y").unwrap().id, AccessorId::pack(1, 3));
    }

    #[test]
    fn unknown_markers_are_ignored() {
        let entry = ClassEntry::new(
            "Point",
            TypeKey::of::<Point>(),
            vec![MemberDef::marker("<bogus>")],
            None,
        );
        let binding = build(&entry);
        assert!(binding.members().is_empty());
        assert!(binding.accessors().is_empty());
    }

    #[test]
    fn normalization_can_be_disabled() {
        let entry = ClassBuilder::<Point>::new("Point").getter("getX", ok).build();
        let config = BindingConfig::default().with_normalize_getters(false);
        let binding = ClassBinding::build(&entry, ClassId::new(1), None, &config);
        assert!(binding.accessor("getX").is_some());
        assert!(binding.accessor("x").is_none());
    }

    #[test]
    fn same_name_last_wins() {
        let entry = ClassBuilder::<Point>::new("Point")
            .method("move", ok)
            .method("move", ok)
            .getter("getX", ok)
            .getter("get_x", ok)
            .build();
        let binding = build(&entry);
        assert_eq!(binding.method_num("move"), Some(2));
        assert_eq!(binding.accessors().len(), 1);
        assert_eq!(binding.accessor("x").unwrap().id.getter(), 4);
    }

    #[test]
    fn constructor_selection() {
        let entry = ClassBuilder::<Point>::new("Point")
            .constructor(|_| Ok(Point))
            .params(&[])
            .constructor(|_| Ok(Point))
            .params(&[TypeKey::of::<f64>(), TypeKey::of::<f64>()])
            .constructor(|_| Ok(Point))
            .build();
        let binding = build(&entry);

        assert_eq!(binding.select_constructor(0).unwrap().num(), 1);
        assert_eq!(binding.select_constructor(2).unwrap().num(), 2);
        assert_eq!(binding.select_constructor(5).unwrap().num(), 3);
    }

    #[test]
    fn implicit_free_member() {
        let entry = ClassBuilder::<Point>::new("Point").method("move", ok).build();
        let binding = build(&entry);
        let mut names: Vec<_> = binding.method_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["free", "move"]);
    }

    #[test]
    fn bound_values_replace() {
        let bindings = Bindings::new(
            BindingConfig::default(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            None,
        );
        bindings.bind_value("answer", Dynamic::Int(41));
        bindings.bind_value("answer", Dynamic::Int(42));
        assert_eq!(*bindings.bound_value("answer").unwrap(), Dynamic::Int(42));
        assert!(bindings.bound_value("missing").is_none());
    }
}
