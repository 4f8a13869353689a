//! Error types for the component runtime

use thiserror::Error;

/// The core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// Lookup of an absent name/type pair
    #[error("'{name}' ({kind}) does not exist")]
    NotFound { name: String, kind: &'static str },

    /// An entry already occupies the slot
    #[error("'{name}' ({kind}) already exists")]
    AlreadyExists { name: String, kind: &'static str },

    /// Downcast of a box to the wrong concrete type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A reference that unexpectedly holds no value
    #[error("Null reference: {0}")]
    NullReference(String),

    /// Invoking a callable with no target
    #[error("Bad function call: callable is empty")]
    EmptyCallable,

    /// A process-wide callback slot is already taken
    #[error("Callback slot already occupied: {0}")]
    CallbackSlotOccupied(&'static str),
}

impl ComponentError {
    /// Shorthand for [`ComponentError::NotFound`]
    pub fn not_found(name: impl Into<String>, kind: &'static str) -> Self {
        Self::NotFound {
            name: name.into(),
            kind,
        }
    }

    /// Shorthand for [`ComponentError::AlreadyExists`]
    pub fn already_exists(name: impl Into<String>, kind: &'static str) -> Self {
        Self::AlreadyExists {
            name: name.into(),
            kind,
        }
    }

    /// Type mismatch against the expected type `T`
    pub fn type_mismatch<T: ?Sized + 'static>(found: &'static str) -> Self {
        Self::TypeMismatch {
            expected: core::any::type_name::<T>(),
            found,
        }
    }

    /// Check whether this is a lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias
pub type Result<T> = core::result::Result<T, ComponentError>;
