//! Identifier types for registered classes.
//!
//! A [`ClassId`] is the numeric wrapper-constructor id handed out when a
//! class entry is first registered. The host adapter uses it to find the
//! constructor dispatcher and pointer wrapper of a class.

use std::fmt;

/// Identifies a registered class.
///
/// # Example
///
/// ```
/// use tether_core::ClassId;
///
/// let class = ClassId::new(3);
/// assert_eq!(class.index(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClassId(u32);

impl ClassId {
    /// Create a class ID with the given index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the underlying index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class_{}", self.0)
    }
}

impl From<u32> for ClassId {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}

impl From<ClassId> for u32 {
    fn from(id: ClassId) -> Self {
        id.0
    }
}
