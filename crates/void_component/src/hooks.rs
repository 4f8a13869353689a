//! Lifecycle hook names
//!
//! Hooks are [`Method`]s stored in a node's callable registry under the names
//! below. They run with the node injected and may fail; the error reaches the
//! caller of the lifecycle operation that fired them.

use void_core::Result;

use crate::callable::Method;
use crate::node::Node;

/// Fired once when a node moves to `Created`
pub const CREATE: &str = "@create";
/// Fired when a created node is destroyed or dropped
pub const DELETE: &str = "@delete";
/// Fired after `copy_from`
pub const COPY: &str = "@copy";
/// Fired after `steal_from`
pub const STEAL: &str = "@steal";
/// Fired after `swap_with`
pub const SWAP: &str = "@swap";

/// Every hook name
pub const ALL: [&str; 5] = [CREATE, DELETE, COPY, STEAL, SWAP];

/// Signature shared by all lifecycle hooks
pub type Hook = Method<(), Result<()>>;

fn noop(_node: &mut Node, _args: ()) -> Result<()> {
    Ok(())
}

/// Hook that does nothing
pub fn noop_hook() -> Hook {
    Method::from_fn(noop)
}
