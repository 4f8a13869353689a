//! # void_component - Dynamic Components
//!
//! Lets statically typed code treat an object as if it were dynamically
//! typed: named values, callables and child nodes are attached, looked up,
//! replaced and removed at run time.
//!
//! ## Building blocks
//!
//! - [`SlotRegistry`]: owning map from identity keys to erased boxes
//! - [`Callable`] / [`Method`]: copyable type-erased functions
//! - [`Node`]: three registries plus identity, parent link and lifecycle
//!
//! ## Usage
//!
//! ```ignore
//! let mut player = Node::with_preset("player", true);
//! player.add("score", 10i32)?;
//! player.add_child("weapon")?;
//! player.add_method("greet", Method::new(|node: &mut Node, ()| {
//!     format!("hi from {}", node.name())
//! }))?;
//!
//! player.create()?;
//! assert_eq!(player.call_self::<(), String>("greet", ())?, "hi from player");
//! ```

pub mod callable;
pub mod config;
pub mod foreign;
pub mod hooks;
pub mod node;
pub mod registry;
pub mod statics;
mod target;

pub use callable::{Callable, Method};
pub use config::NodeConfig;
pub use foreign::{is_foreign_registered, release_foreign};
pub use hooks::Hook;
pub use node::{Category, Node, NodeState, ParentLink};
pub use registry::{Disposer, SlotRegistry};
pub use target::{fits_inline, Identity, INLINE_CAPACITY};

pub use void_core::{ComponentError, ErasedBox, IdentityKey, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::callable::{Callable, Method};
    pub use crate::config::NodeConfig;
    pub use crate::hooks::{self, Hook};
    pub use crate::node::{Category, Node, NodeState};
    pub use crate::registry::SlotRegistry;
    pub use void_core::prelude::*;
}
