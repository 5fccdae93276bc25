//! Runtime error taxonomy.
//!
//! Every failure the object model can surface is one of these variants.
//! Each maps onto the Python exception class the evaluator raises for it
//! (see [`RuntimeError::exception_name`]). None of them is transient: they
//! are contract violations reported to the caller, never retried.

use thiserror::Error;

/// Result alias for object-model operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors produced by attribute resolution, instantiation, iteration and
/// the built-in sequence type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Attribute missing on an instance (set/delete, or a failed get turned
    /// into an error by the caller).
    #[error("'{type_name}' object has no attribute '{attr}'")]
    AttributeMissing {
        /// Name of the receiver's type.
        type_name: String,
        /// The attribute name.
        attr: String,
    },

    /// Attribute missing on a type object itself.
    #[error("type object '{type_name}' has no attribute '{attr}'")]
    TypeAttributeMissing {
        /// Name of the receiving type.
        type_name: String,
        /// The attribute name.
        attr: String,
    },

    /// Any other attribute failure (read-only properties and similar).
    #[error("{0}")]
    Attribute(String),

    /// `__new__` misuse: missing target, non-type target, unrelated or
    /// layout-incompatible subtype.
    #[error("{0}")]
    ConstructionUnsafe(String),

    /// Wrong operand kind for an operation.
    #[error("{0}")]
    TypeMismatch(String),

    /// Subscript out of range.
    #[error("{0}")]
    IndexOutOfRange(String),

    /// Searched value absent, or an otherwise invalid value.
    #[error("{0}")]
    ValueNotFound(String),

    /// A count or size that cannot be represented.
    #[error("{0}")]
    Overflow(String),

    /// A container changed size while a size-checked iterator walked it.
    #[error("{container} changed size during iteration")]
    ConcurrentModification {
        /// Name of the container kind (`dict`, `set`, ...).
        container: String,
    },

    /// Raised by `__next__` once an iterator is exhausted.
    #[error("iteration exhausted")]
    StopIteration,

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Attribute missing on an instance of `type_name`.
    pub fn attribute_error(type_name: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::AttributeMissing {
            type_name: type_name.into(),
            attr: attr.into(),
        }
    }

    /// Attribute missing on the type object `type_name`.
    pub fn type_attribute_error(type_name: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::TypeAttributeMissing {
            type_name: type_name.into(),
            attr: attr.into(),
        }
    }

    /// Free-form attribute error.
    pub fn attribute(message: impl Into<String>) -> Self {
        Self::Attribute(message.into())
    }

    /// Construction error from the instantiation protocol.
    pub fn construction(message: impl Into<String>) -> Self {
        Self::ConstructionUnsafe(message.into())
    }

    /// Type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }

    /// Index error.
    pub fn index_error(message: impl Into<String>) -> Self {
        Self::IndexOutOfRange(message.into())
    }

    /// Value error.
    pub fn value_error(message: impl Into<String>) -> Self {
        Self::ValueNotFound(message.into())
    }

    /// Overflow error.
    pub fn overflow(message: impl Into<String>) -> Self {
        Self::Overflow(message.into())
    }

    /// Size change observed by a size-checked iterator.
    pub fn changed_size(container: impl Into<String>) -> Self {
        Self::ConcurrentModification {
            container: container.into(),
        }
    }

    /// Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The Python exception class this error surfaces as.
    pub fn exception_name(&self) -> &'static str {
        match self {
            Self::AttributeMissing { .. } | Self::TypeAttributeMissing { .. } | Self::Attribute(_) => {
                "AttributeError"
            }
            Self::ConstructionUnsafe(_) | Self::TypeMismatch(_) => "TypeError",
            Self::IndexOutOfRange(_) => "IndexError",
            Self::ValueNotFound(_) => "ValueError",
            Self::Overflow(_) => "OverflowError",
            Self::ConcurrentModification { .. } => "RuntimeError",
            Self::StopIteration => "StopIteration",
            Self::Internal(_) => "SystemError",
        }
    }

    /// Check if this signals iterator exhaustion.
    #[inline]
    pub fn is_stop_iteration(&self) -> bool {
        matches!(self, Self::StopIteration)
    }

    /// Check if this is an attribute-missing condition (instance or type).
    pub fn is_attribute_missing(&self) -> bool {
        matches!(
            self,
            Self::AttributeMissing { .. } | Self::TypeAttributeMissing { .. }
        )
    }

    /// Render as `ExceptionName: message`, the way a traceback prints it.
    pub fn traceback_line(&self) -> String {
        format!("{}: {}", self.exception_name(), self)
    }
}
