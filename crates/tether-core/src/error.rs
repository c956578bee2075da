//! Error types for the binding core.
//!
//! Errors are split by layer:
//!
//! - [`ConversionError`]: a dynamic value could not be marshaled to or from a
//!   native type.
//! - [`NativeError`]: a native implementation failed while handling a call.
//! - [`BindError`]: the dispatch surface reported to the host adapter.
//! - [`RegistrationError`]: declaration code tried to register something
//!   invalid.

use thiserror::Error;

// ============================================================================
// Conversion Errors
// ============================================================================

/// Errors that occur when converting between dynamic and native values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Type mismatch during conversion.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: &'static str,
        /// The actual type.
        actual: &'static str,
    },

    /// Attempted to convert a null handle to a non-nullable type.
    #[error("null handle cannot be converted to {target_type}")]
    NullHandle {
        /// The type that was expected.
        target_type: &'static str,
    },

    /// Integer overflow during conversion.
    #[error("integer overflow: value {value} does not fit in {target_type}")]
    IntegerOverflow {
        /// The value that overflowed.
        value: i64,
        /// The target type.
        target_type: &'static str,
    },

    /// Float value out of range for the target type.
    #[error("float conversion error: value {value} cannot be represented as {target_type}")]
    FloatConversion {
        /// The value that did not fit.
        value: f64,
        /// The target type.
        target_type: &'static str,
    },
}

// ============================================================================
// Native Errors
// ============================================================================

/// Errors raised while a native implementation handles a call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// Error converting arguments or return values.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Invalid `this` reference for a method call.
    #[error("invalid 'this' reference: {message}")]
    InvalidThis {
        /// What was wrong with the receiver.
        message: String,
    },

    /// Argument index out of bounds.
    #[error("argument index {index} out of bounds (call has {count} arguments)")]
    ArgumentIndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of arguments supplied.
        count: usize,
    },

    /// A wrapped object referenced by an argument is gone or busy.
    #[error("object at index {index} is not available")]
    ObjectUnavailable {
        /// Heap index of the object.
        index: u32,
    },

    /// Generic native error.
    #[error("native error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

impl NativeError {
    /// Create an "invalid this" error with a message.
    pub fn invalid_this(message: impl Into<String>) -> Self {
        NativeError::InvalidThis {
            message: message.into(),
        }
    }

    /// Create a generic native error.
    pub fn other(message: impl Into<String>) -> Self {
        NativeError::Other {
            message: message.into(),
        }
    }

    /// Whether this error stems from argument marshaling.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            NativeError::Conversion(_) | NativeError::ArgumentIndexOutOfBounds { .. }
        )
    }
}

// ============================================================================
// Dispatch Errors
// ============================================================================

/// Errors reported by the dispatch router.
///
/// None of these are fatal; the host adapter decides how a failure becomes a
/// caller-visible exception.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    /// The dispatch id or name resolves to nothing, or to a cleared slot.
    #[error("unbound member: {member}")]
    UnboundMember {
        /// The member that failed to resolve.
        member: String,
    },

    /// Argument count or types do not fit the target signature.
    #[error("argument mismatch calling '{member}': {reason}")]
    ArgumentMismatch {
        /// The member being called.
        member: String,
        /// What did not fit.
        reason: String,
    },

    /// The wrapper handle was released or never existed.
    #[error("stale handle: object at index {index} has been released")]
    StaleHandle {
        /// The heap index of the handle.
        index: u32,
    },

    /// The class has no constructor bound.
    #[error("class '{class}' has no constructor")]
    NotConstructible {
        /// The class name.
        class: String,
    },

    /// The native implementation failed.
    #[error("native error in '{member}': {source}")]
    Native {
        /// The member being called.
        member: String,
        /// The underlying failure.
        #[source]
        source: NativeError,
    },
}

impl BindError {
    /// Create an unbound-member error.
    pub fn unbound(member: impl Into<String>) -> Self {
        BindError::UnboundMember {
            member: member.into(),
        }
    }

    /// Create an argument-mismatch error.
    pub fn argument_mismatch(member: impl Into<String>, reason: impl Into<String>) -> Self {
        BindError::ArgumentMismatch {
            member: member.into(),
            reason: reason.into(),
        }
    }

    /// Attribute a native failure to a member.
    ///
    /// Marshaling failures surface as [`BindError::ArgumentMismatch`].
    pub fn from_native(member: &str, source: NativeError) -> Self {
        if source.is_argument_error() {
            BindError::argument_mismatch(member, source.to_string())
        } else {
            BindError::Native {
                member: member.to_string(),
                source,
            }
        }
    }

    /// Check if this is an unbound-member error.
    pub fn is_unbound(&self) -> bool {
        matches!(self, BindError::UnboundMember { .. })
    }

    /// Check if this is an argument-mismatch error.
    pub fn is_argument_mismatch(&self) -> bool {
        matches!(self, BindError::ArgumentMismatch { .. })
    }
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors that occur while populating a registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// A different class with this name is already registered.
    #[error("duplicate class: {0}")]
    DuplicateClass(String),

    /// The registry has already been initialized.
    #[error("registry already initialized; '{0}' was registered too late")]
    Sealed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_error_type_mismatch() {
        let err = ConversionError::TypeMismatch {
            expected: "int",
            actual: "string",
        };
        assert!(err.to_string().contains("type mismatch"));
        assert!(err.to_string().contains("int"));
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn native_error_from_conversion() {
        let err: NativeError = ConversionError::NullHandle { target_type: "Point" }.into();
        assert!(err.is_argument_error());
        assert!(err.to_string().contains("Point"));
    }

    #[test]
    fn conversion_failures_become_argument_mismatch() {
        let err = BindError::from_native(
            "setX",
            NativeError::ArgumentIndexOutOfBounds { index: 0, count: 0 },
        );
        assert!(err.is_argument_mismatch());
        assert!(err.to_string().contains("setX"));
    }

    #[test]
    fn other_failures_stay_native() {
        let err = BindError::from_native("move", NativeError::other("boom"));
        assert!(matches!(err, BindError::Native { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn unbound_member_display() {
        let err = BindError::unbound("Point.z");
        assert!(err.is_unbound());
        assert_eq!(err.to_string(), "unbound member: Point.z");
    }
}
