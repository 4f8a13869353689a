//! # void_core - Component Runtime Core
//!
//! Leaf primitives shared by the component runtime:
//! - **Identity keys**: `(label, type)` pairs hashed into one stable value
//! - **Erased boxes**: single-value holders with checked downcasts
//! - **Errors**: the taxonomy every layer above reports through
//!
//! Nothing here knows about nodes or callables; those live in
//! `void_component` and only consume this crate's read/write contract.

pub mod any_box;
pub mod error;
pub mod id;

pub use any_box::*;
pub use error::*;
pub use id::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::any_box::{ErasedBox, ErasedValue, TypeInfo};
    pub use crate::error::{ComponentError, Result};
    pub use crate::id::IdentityKey;
}
