//! Primitive type descriptions reported through introspection.

use std::fmt;

use bitflags::bitflags;

use crate::{TypeCategory, TypeIdentity, TypeKey};

bitflags! {
    /// Shape flags of a primitive type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PrimitiveFlags: u32 {
        /// Signed integer or float.
        const SIGNED = 1 << 0;
        /// IEEE floating point.
        const FLOAT = 1 << 1;
        /// Boolean.
        const BOOL = 1 << 2;
    }
}

/// A Rust type that crosses the boundary as a primitive value.
pub trait Primitive: 'static {
    /// Default display name.
    const NAME: &'static str;
    /// Shape flags.
    const FLAGS: PrimitiveFlags;
}

macro_rules! impl_primitive {
    ($($ty:ty => $name:literal, $flags:expr;)*) => {
        $(
            impl Primitive for $ty {
                const NAME: &'static str = $name;
                const FLAGS: PrimitiveFlags = $flags;
            }
        )*
    };
}

impl_primitive! {
    bool => "bool", PrimitiveFlags::BOOL;
    i8 => "int8", PrimitiveFlags::SIGNED;
    i16 => "int16", PrimitiveFlags::SIGNED;
    i32 => "int32", PrimitiveFlags::SIGNED;
    i64 => "int64", PrimitiveFlags::SIGNED;
    u8 => "uint8", PrimitiveFlags::empty();
    u16 => "uint16", PrimitiveFlags::empty();
    u32 => "uint32", PrimitiveFlags::empty();
    u64 => "uint64", PrimitiveFlags::empty();
    f32 => "float32", PrimitiveFlags::SIGNED.union(PrimitiveFlags::FLOAT);
    f64 => "float64", PrimitiveFlags::SIGNED.union(PrimitiveFlags::FLOAT);
}

/// Description of one registered primitive type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveInfo {
    /// Identity of the Rust type.
    pub identity: TypeIdentity,
    /// Display name.
    pub name: String,
    /// Size in bytes.
    pub size: usize,
    /// Shape flags.
    pub flags: PrimitiveFlags,
}

impl PrimitiveInfo {
    /// Describe a primitive under its default name.
    pub fn of<T: Primitive>() -> Self {
        Self::named::<T>(T::NAME)
    }

    /// Describe a primitive under a custom name.
    pub fn named<T: Primitive>(name: impl Into<String>) -> Self {
        Self {
            identity: TypeIdentity::structured(TypeKey::of::<T>(), TypeCategory::Primitive),
            name: name.into(),
            size: std::mem::size_of::<T>(),
            flags: T::FLAGS,
        }
    }

    /// The primitive's key.
    pub fn key(&self) -> TypeKey {
        self.identity.key()
    }

    /// All primitives the registry knows about out of the box.
    pub fn standard() -> Vec<PrimitiveInfo> {
        vec![
            Self::of::<bool>(),
            Self::of::<i8>(),
            Self::of::<i16>(),
            Self::of::<i32>(),
            Self::of::<i64>(),
            Self::of::<u8>(),
            Self::of::<u16>(),
            Self::of::<u32>(),
            Self::of::<u64>(),
            Self::of::<f32>(),
            Self::of::<f64>(),
        ]
    }
}

impl fmt::Display for PrimitiveInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.name, self.size)
    }
}
