//! Canonical identity for native types crossing the binding boundary.
//!
//! A [`TypeKey`] is an opaque 64-bit key that distinguishes native types. It is
//! derived either from a Rust type (`TypeKey::of::<T>()`) or from a declared
//! type name (`TypeKey::from_name`). A [`TypeIdentity`] pairs the key with a
//! structural category and a lazily rendered display string.
//!
//! # Examples
//!
//! ```
//! use tether_core::{TypeIdentity, TypeKey};
//!
//! let a = TypeIdentity::new(TypeKey(0xbeef));
//! let b = TypeIdentity::new(TypeKey(0xbeef));
//! assert_eq!(a, b);
//! assert_eq!(a.as_hex(), "000000000000beef");
//! ```

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use xxhash_rust::xxh64::{Xxh64, xxh64};

/// Domain mixing constants so Rust-derived and name-derived keys never collide
/// by construction.
pub mod key_constants {
    /// Domain marker for keys derived from a Rust `TypeId`.
    pub const RUST_TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for keys derived from a declared type name.
    pub const NAMED: u64 = 0x1a095090689d4647;
}

/// Number of hexadecimal digits needed to render a full key.
pub const KEY_HEX_WIDTH: usize = std::mem::size_of::<u64>() * 2;

/// Opaque key identifying one native type.
///
/// Keys are plain values: two keys built from the same type are equal no
/// matter where or when they were built.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TypeKey(pub u64);

impl TypeKey {
    /// Empty/invalid key.
    pub const EMPTY: TypeKey = TypeKey(0);

    /// Derive the key of a Rust type.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::of_type_id(TypeId::of::<T>())
    }

    /// Derive a key from an existing `TypeId`.
    #[inline]
    pub fn of_type_id(type_id: TypeId) -> Self {
        let mut hasher = Xxh64::new(0);
        type_id.hash(&mut hasher);
        TypeKey(key_constants::RUST_TYPE ^ hasher.finish())
    }

    /// Derive a key from a declared type name.
    ///
    /// The same name always produces the same key.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeKey(key_constants::NAMED ^ xxh64(name.as_bytes(), 0))
    }

    /// Parse a key previously rendered by [`TypeIdentity::as_hex`].
    pub fn from_hex(text: &str) -> Option<Self> {
        if text.is_empty() || text.len() > KEY_HEX_WIDTH {
            return None;
        }
        u64::from_str_radix(text, 16).ok().map(TypeKey)
    }

    /// Check if this is the empty key.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw bit pattern of the key.
    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({:#018x})", self.0)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$x}", self.0, width = KEY_HEX_WIDTH)
    }
}

/// Structural category of a type.
///
/// `Raw` means the key carries no structural description; every other
/// category says how the payload behind the key must be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeCategory {
    /// Plain key, nothing further known.
    #[default]
    Raw,
    /// Built-in numeric or boolean type.
    Primitive,
    /// Pointer to a native object.
    Pointer,
    /// Reference to a native object.
    Reference,
    /// Enumeration.
    Enum,
    /// Registered class.
    Class,
    /// Growable sequence.
    Vector,
    /// Fixed-size sequence.
    Array,
    /// Caller-supplied callable.
    Callback,
    /// Object converted by value rather than wrapped.
    ValueObject,
}

impl TypeCategory {
    /// Lowercase display name.
    pub const fn name(self) -> &'static str {
        match self {
            TypeCategory::Raw => "raw",
            TypeCategory::Primitive => "primitive",
            TypeCategory::Pointer => "pointer",
            TypeCategory::Reference => "reference",
            TypeCategory::Enum => "enum",
            TypeCategory::Class => "class",
            TypeCategory::Vector => "vector",
            TypeCategory::Array => "array",
            TypeCategory::Callback => "callback",
            TypeCategory::ValueObject => "value-object",
        }
    }

    /// Whether this category carries a structural description.
    #[inline]
    pub const fn is_structured(self) -> bool {
        !matches!(self, TypeCategory::Raw)
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a native type: key, category and cached display string.
///
/// Equality and hashing look only at the key. The display string is
/// rendered on first use and then cached for the lifetime of this value;
/// clones carry an independent copy of the cache.
#[derive(Clone, Default)]
pub struct TypeIdentity {
    key: TypeKey,
    category: TypeCategory,
    name: OnceLock<String>,
}

impl TypeIdentity {
    /// Identity for a raw key.
    pub fn new(key: TypeKey) -> Self {
        Self::structured(key, TypeCategory::Raw)
    }

    /// Identity with an explicit structural category.
    pub fn structured(key: TypeKey, category: TypeCategory) -> Self {
        Self {
            key,
            category,
            name: OnceLock::new(),
        }
    }

    /// Identity of a Rust type.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>())
    }

    /// The underlying key.
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// The structural category tag.
    #[inline]
    pub fn category(&self) -> TypeCategory {
        self.category
    }

    /// The structural category, only if the identity carries one.
    ///
    /// Callers must go through this before treating the key as a structure.
    pub fn structure(&self) -> Option<TypeCategory> {
        self.category.is_structured().then_some(self.category)
    }

    /// Lowercase, zero-padded hexadecimal rendering of the key.
    ///
    /// Rendered once and cached; every call returns the same string.
    pub fn as_hex(&self) -> &str {
        self.name.get_or_init(|| self.key.to_string())
    }

    /// Whether the display string has already been rendered.
    pub fn has_cached_name(&self) -> bool {
        self.name.get().is_some()
    }
}

impl PartialEq for TypeIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TypeIdentity {}

impl Hash for TypeIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl From<TypeKey> for TypeIdentity {
    fn from(key: TypeKey) -> Self {
        Self::new(key)
    }
}

impl fmt::Debug for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeIdentity")
            .field("key", &self.key)
            .field("category", &self.category)
            .finish()
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_hex())
    }
}
