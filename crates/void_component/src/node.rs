//! Node - the dynamic component
//!
//! A node carries three slot registries: plain values, callables (including
//! node-injected methods and lifecycle hooks) and child nodes. Every entry is
//! addressed by a name scoped to its stored type, so `"speed"` can hold an
//! `f32` and a `Callable<(), f32>` side by side.
//!
//! Children keep a weak link to their parent. The link is validated on use
//! and never dangles; a child outliving its parent simply reports that the
//! parent is gone.

use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use void_core::{ComponentError, ErasedBox, IdentityKey, Result};

use crate::callable::{Callable, Method};
use crate::config::NodeConfig;
use crate::hooks::{self, Hook};
use crate::registry::SlotRegistry;
use crate::statics;

/// Lifecycle state of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// Constructed, `@create` not fired yet
    #[default]
    Uninitialized,
    /// `@create` fired; `@delete` fires when destroyed or dropped
    Created,
}

/// The three registries of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Value,
    Callable,
    Child,
}

/// Shared, address-stable part of a node that children link to
struct NodeAnchor {
    key: RwLock<IdentityKey>,
}

/// Validated back-reference from a child to its parent
#[derive(Clone)]
pub struct ParentLink {
    anchor: Weak<NodeAnchor>,
}

impl ParentLink {
    /// Check whether the parent still exists
    pub fn is_alive(&self) -> bool {
        self.anchor.strong_count() > 0
    }

    /// Current key of the parent
    pub fn key(&self) -> Result<IdentityKey> {
        self.anchor
            .upgrade()
            .map(|anchor| anchor.key.read().clone())
            .ok_or_else(|| ComponentError::NullReference("parent node no longer exists".into()))
    }

    pub fn name(&self) -> Result<String> {
        self.key().map(|key| key.label().to_string())
    }

    pub fn id(&self) -> Result<u64> {
        self.key().map(|key| key.hash_value())
    }

    /// Check whether this link refers to `node`
    pub fn points_to(&self, node: &Node) -> bool {
        std::ptr::eq(self.anchor.as_ptr(), Arc::as_ptr(&node.anchor))
    }
}

impl fmt::Debug for ParentLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Ok(key) => f.debug_tuple("ParentLink").field(&key).finish(),
            Err(_) => f.write_str("ParentLink(<dropped>)"),
        }
    }
}

/// Strip module path and generic arguments from a type name
fn short_type_name<T: ?Sized + 'static>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn insert_new<'a, T: Clone + Send + Sync + 'static>(
    registry: &'a mut SlotRegistry,
    name: &str,
    value: T,
) -> Result<&'a mut T> {
    let key = IdentityKey::of::<T>(name);
    if registry.has(&key) {
        return Err(ComponentError::already_exists(name, type_name::<T>()));
    }
    registry.add(key.clone(), ErasedBox::new(value))?;
    registry.get_as_mut(&key)
}

fn take_out<T: 'static>(registry: &mut SlotRegistry, name: &str) -> Result<T> {
    let boxed = registry
        .take(&IdentityKey::of::<T>(name))
        .map_err(|_| ComponentError::not_found(name, type_name::<T>()))?;
    boxed
        .into_inner::<T>()
        .map_err(|boxed| ComponentError::type_mismatch::<T>(boxed.type_name()))
}

/// Overwrite `name`, first archiving the entry it holds under `old_name`
fn overwrite_archiving<'a, T: Clone + Send + Sync + 'static>(
    registry: &'a mut SlotRegistry,
    name: &str,
    old_name: &str,
    value: T,
) -> Result<&'a mut T> {
    let key = IdentityKey::of::<T>(name);
    if old_name != name {
        if let Ok(previous) = registry.take(&key) {
            registry.overwrite(IdentityKey::of::<T>(old_name), previous);
        }
    }
    registry.overwrite(key.clone(), ErasedBox::new(value));
    registry.get_as_mut(&key)
}

/// Nodes belong in the child registry, never among plain values
fn reject_node<T: 'static>() -> Result<()> {
    if TypeId::of::<T>() == TypeId::of::<Node>() {
        return Err(ComponentError::TypeMismatch {
            expected: "a non-node value (use the child methods)",
            found: type_name::<T>(),
        });
    }
    Ok(())
}

/// Dynamic component: named values, callables and child nodes
pub struct Node {
    key: IdentityKey,
    state: NodeState,
    parent: Option<ParentLink>,
    values: SlotRegistry,
    callables: SlotRegistry,
    children: SlotRegistry,
    anchor: Arc<NodeAnchor>,
    config: NodeConfig,
}

impl Node {
    /// Create an uninitialized node
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, NodeConfig::default())
    }

    /// Create a node, optionally with no-op lifecycle hooks installed
    pub fn with_preset(name: impl Into<String>, use_preset: bool) -> Self {
        Self::with_config(name, NodeConfig::default().with_preset_hooks(use_preset))
    }

    pub fn with_config(name: impl Into<String>, config: NodeConfig) -> Self {
        let name: String = name.into();
        let key = IdentityKey::new(&name);
        let mut node = Self {
            anchor: Arc::new(NodeAnchor {
                key: RwLock::new(key.clone()),
            }),
            key,
            state: NodeState::Uninitialized,
            parent: None,
            values: SlotRegistry::new(),
            callables: SlotRegistry::new(),
            children: SlotRegistry::new(),
            config,
        };
        if config.preset_hooks {
            node.preset();
        }
        node
    }

    /// Create a node named after the type `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(short_type_name::<T>())
    }

    // ----- Identity -----

    #[inline]
    pub fn id(&self) -> u64 {
        self.key.hash_value()
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.key.label()
    }

    #[inline]
    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    #[inline]
    pub fn state(&self) -> NodeState {
        self.state
    }

    #[inline]
    pub fn is_created(&self) -> bool {
        self.state == NodeState::Created
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Link to the node this one is a child of
    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// Forget the parent link
    pub fn detach(&mut self) {
        self.parent = None;
    }

    fn rename(&mut self, name: &str) {
        self.key = IdentityKey::new(name);
        *self.anchor.key.write() = self.key.clone();
    }

    fn link(&self) -> ParentLink {
        ParentLink {
            anchor: Arc::downgrade(&self.anchor),
        }
    }

    fn adopt(&self, name: &str, child: &mut Node) {
        child.rename(name);
        child.parent = Some(self.link());
    }

    fn reparent_children(&mut self) {
        let link = self.link();
        for (_, child) in self.children.iter_as_mut::<Node>() {
            child.parent = Some(link.clone());
        }
    }

    // ----- Values -----

    /// Add a value, failing if `name` already holds a `T`
    pub fn add<T: Clone + Send + Sync + 'static>(&mut self, name: &str, value: T) -> Result<&mut T> {
        reject_node::<T>()?;
        insert_new(&mut self.values, name, value)
    }

    pub fn get<T: 'static>(&self, name: &str) -> Result<&T> {
        self.values.get_as(&IdentityKey::of::<T>(name))
    }

    pub fn get_mut<T: 'static>(&mut self, name: &str) -> Result<&mut T> {
        self.values.get_as_mut(&IdentityKey::of::<T>(name))
    }

    pub fn has<T: 'static>(&self, name: &str) -> bool {
        self.values.has(&IdentityKey::of::<T>(name))
    }

    /// Remove a value and hand it back
    pub fn remove<T: 'static>(&mut self, name: &str) -> Result<T> {
        take_out(&mut self.values, name)
    }

    /// Insert or overwrite a value
    pub fn replace<T: Clone + Send + Sync + 'static>(&mut self, name: &str, value: T) -> Result<&mut T> {
        self.replace_as(name, name, value)
    }

    /// Overwrite `name`, keeping its previous value under `old_name`
    pub fn replace_as<T: Clone + Send + Sync + 'static>(
        &mut self,
        name: &str,
        old_name: &str,
        value: T,
    ) -> Result<&mut T> {
        reject_node::<T>()?;
        overwrite_archiving(&mut self.values, name, old_name, value)
    }

    /// Attach a description to the value slot `name`
    pub fn describe<T: 'static>(&mut self, name: &str, text: impl Into<String>) -> Result<()> {
        self.values
            .get_mut(&IdentityKey::of::<T>(name))
            .map_err(|_| ComponentError::not_found(name, type_name::<T>()))?
            .set_description(text);
        Ok(())
    }

    pub fn description<T: 'static>(&self, name: &str) -> Result<&str> {
        self.values
            .get(&IdentityKey::of::<T>(name))
            .map(|boxed| boxed.description())
            .map_err(|_| ComponentError::not_found(name, type_name::<T>()))
    }

    // ----- Callables -----

    pub fn add_fn<A: 'static, R: 'static>(
        &mut self,
        name: &str,
        function: Callable<A, R>,
    ) -> Result<&mut Callable<A, R>> {
        insert_new(&mut self.callables, name, function)
    }

    pub fn get_fn<A: 'static, R: 'static>(&self, name: &str) -> Result<&Callable<A, R>> {
        self.callables.get_as(&IdentityKey::of::<Callable<A, R>>(name))
    }

    pub fn has_fn<A: 'static, R: 'static>(&self, name: &str) -> bool {
        self.callables.has(&IdentityKey::of::<Callable<A, R>>(name))
    }

    pub fn remove_fn<A: 'static, R: 'static>(&mut self, name: &str) -> Result<Callable<A, R>> {
        take_out(&mut self.callables, name)
    }

    pub fn replace_fn<A: 'static, R: 'static>(
        &mut self,
        name: &str,
        function: Callable<A, R>,
    ) -> Result<&mut Callable<A, R>> {
        self.replace_fn_as(name, name, function)
    }

    pub fn replace_fn_as<A: 'static, R: 'static>(
        &mut self,
        name: &str,
        old_name: &str,
        function: Callable<A, R>,
    ) -> Result<&mut Callable<A, R>> {
        overwrite_archiving(&mut self.callables, name, old_name, function)
    }

    /// Call the callable `name`
    pub fn call<A: 'static, R: 'static>(&self, name: &str, args: A) -> Result<R> {
        self.get_fn::<A, R>(name)?.invoke(args)
    }

    // ----- Methods -----

    pub fn add_method<A: 'static, R: 'static>(
        &mut self,
        name: &str,
        method: Method<A, R>,
    ) -> Result<&mut Method<A, R>> {
        insert_new(&mut self.callables, name, method)
    }

    pub fn get_method<A: 'static, R: 'static>(&self, name: &str) -> Result<&Method<A, R>> {
        self.callables.get_as(&IdentityKey::of::<Method<A, R>>(name))
    }

    pub fn has_method<A: 'static, R: 'static>(&self, name: &str) -> bool {
        self.callables.has(&IdentityKey::of::<Method<A, R>>(name))
    }

    pub fn remove_method<A: 'static, R: 'static>(&mut self, name: &str) -> Result<Method<A, R>> {
        take_out(&mut self.callables, name)
    }

    pub fn replace_method<A: 'static, R: 'static>(
        &mut self,
        name: &str,
        method: Method<A, R>,
    ) -> Result<&mut Method<A, R>> {
        self.replace_method_as(name, name, method)
    }

    pub fn replace_method_as<A: 'static, R: 'static>(
        &mut self,
        name: &str,
        old_name: &str,
        method: Method<A, R>,
    ) -> Result<&mut Method<A, R>> {
        overwrite_archiving(&mut self.callables, name, old_name, method)
    }

    /// Call the method `name` with this node as its owner
    pub fn call_self<A: 'static, R: 'static>(&mut self, name: &str, args: A) -> Result<R> {
        let method = self.get_method::<A, R>(name)?.clone();
        method.invoke(self, args)
    }

    /// Call the process-wide method registered under `(C, I)` with this node
    /// as its owner
    pub fn call_static<C: 'static, I: 'static, A: 'static, R: 'static>(
        &mut self,
        args: A,
    ) -> Result<R> {
        let method = statics::get::<C, I, A, R>()?;
        method.invoke(self, args)
    }

    // ----- Children -----

    /// Add an empty child sharing this node's config
    pub fn add_child(&mut self, name: &str) -> Result<&mut Node> {
        let child = Node::with_config(name, self.config);
        self.attach_child(name, child)
    }

    /// Add `child` under `name`; it is renamed and linked to this node
    pub fn attach_child(&mut self, name: &str, mut child: Node) -> Result<&mut Node> {
        if self.has_child(name) {
            return Err(ComponentError::already_exists(name, type_name::<Node>()));
        }
        self.adopt(name, &mut child);
        insert_new(&mut self.children, name, child)
    }

    pub fn child(&self, name: &str) -> Result<&Node> {
        self.children.get_as(&IdentityKey::of::<Node>(name))
    }

    pub fn child_mut(&mut self, name: &str) -> Result<&mut Node> {
        self.children.get_as_mut(&IdentityKey::of::<Node>(name))
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.has(&IdentityKey::of::<Node>(name))
    }

    /// Remove a child and hand it back detached
    pub fn remove_child(&mut self, name: &str) -> Result<Node> {
        let mut child: Node = take_out(&mut self.children, name)?;
        child.detach();
        Ok(child)
    }

    pub fn replace_child(&mut self, name: &str, child: Node) -> Result<&mut Node> {
        self.replace_child_as(name, name, child)
    }

    /// Overwrite the child `name`, keeping the previous one under `old_name`
    pub fn replace_child_as(
        &mut self,
        name: &str,
        old_name: &str,
        mut child: Node,
    ) -> Result<&mut Node> {
        let key = IdentityKey::of::<Node>(name);
        if old_name != name {
            if let Ok(mut previous) = self.children.take(&key) {
                if let Some(archived) = previous.downcast_mut::<Node>() {
                    archived.rename(old_name);
                }
                self.children
                    .overwrite(IdentityKey::of::<Node>(old_name), previous);
            }
        }
        self.adopt(name, &mut child);
        self.children.overwrite(key.clone(), ErasedBox::new(child));
        self.children.get_as_mut(&key)
    }

    /// Call `func` on the child `child`
    pub fn invoke<A: 'static, R: 'static>(&self, child: &str, func: &str, args: A) -> Result<R> {
        self.child(child)?.call(func, args)
    }

    /// Call the method `func` on the child `child`
    pub fn invoke_self<A: 'static, R: 'static>(
        &mut self,
        child: &str,
        func: &str,
        args: A,
    ) -> Result<R> {
        self.child_mut(child)?.call_self(func, args)
    }

    /// Call `func` on every child that has it, in child-name order
    pub fn invoke_all<A: Clone + 'static, R: 'static>(&self, func: &str, args: A) -> Result<Vec<R>> {
        let mut children: Vec<(&str, &Node)> = self
            .children
            .iter_as::<Node>()
            .map(|(key, child)| (key.label(), child))
            .collect();
        children.sort_by(|a, b| a.0.cmp(b.0));

        children
            .into_iter()
            .filter(|(_, child)| child.has_fn::<A, R>(func))
            .map(|(_, child)| child.call(func, args.clone()))
            .collect()
    }

    /// Call the method `func` on every child that has it, in child-name order
    pub fn invoke_all_self<A: Clone + 'static, R: 'static>(
        &mut self,
        func: &str,
        args: A,
    ) -> Result<Vec<R>> {
        let mut keys: Vec<IdentityKey> = self.children.keys().cloned().collect();
        keys.sort_by(|a, b| a.label().cmp(b.label()));

        let mut results = Vec::new();
        for key in keys {
            let child = self.children.get_as_mut::<Node>(&key)?;
            if child.has_method::<A, R>(func) {
                results.push(child.call_self(func, args.clone())?);
            }
        }
        Ok(results)
    }

    // ----- Lifecycle -----

    fn fire(&mut self, hook: &str) -> Result<()> {
        let method = match self.callables.get_as::<Hook>(&IdentityKey::of::<Hook>(hook)) {
            Ok(method) => method.clone(),
            Err(_) => return Ok(()),
        };
        log::trace!("{}: firing {}", self, hook);
        method.invoke(self, ())?
    }

    /// Install a no-op for every lifecycle hook not already present
    pub fn preset(&mut self) {
        for hook in hooks::ALL {
            if !self.has_method::<(), Result<()>>(hook) {
                self.callables
                    .overwrite(IdentityKey::of::<Hook>(hook), ErasedBox::new(hooks::noop_hook()));
            }
        }
    }

    /// Move to `Created`, firing `@create` on the transition.
    ///
    /// Children not yet created follow when `cascade_create` is set. A failing
    /// `@create` leaves the node uninitialized.
    pub fn create(&mut self) -> Result<()> {
        if self.state == NodeState::Uninitialized {
            self.state = NodeState::Created;
            log::trace!("{}: created", self);
            if let Err(err) = self.fire(hooks::CREATE) {
                self.state = NodeState::Uninitialized;
                return Err(err);
            }
        }

        if self.config.cascade_create {
            for (_, child) in self.children.iter_as_mut::<Node>() {
                if !child.is_created() {
                    child.create()?;
                }
            }
        }
        Ok(())
    }

    /// Move back to `Uninitialized`, firing `@delete` if the node was created
    pub fn destroy(&mut self) -> Result<()> {
        if self.state != NodeState::Created {
            return Ok(());
        }
        self.state = NodeState::Uninitialized;
        log::trace!("{}: destroyed", self);
        self.fire(hooks::DELETE)
    }

    /// Force `Uninitialized` without `@delete`, then create again
    pub fn restart(&mut self) -> Result<()> {
        self.state = NodeState::Uninitialized;
        self.create()
    }

    /// Become a deep copy of `other`, then fire `@copy`.
    ///
    /// Takes over `other`'s name, its state unless this node is already
    /// created, and its parent link if this node has none.
    pub fn copy_from(&mut self, other: &Node) -> Result<()> {
        self.rename(other.name());
        if self.state == NodeState::Uninitialized {
            self.state = other.state;
        }
        if self.parent.is_none() {
            self.parent = other.parent.clone();
        }

        other.values.duplicate_into(&mut self.values);
        other.callables.duplicate_into(&mut self.callables);
        other.children.duplicate_into(&mut self.children);
        self.reparent_children();

        if self.is_created() {
            self.fire(hooks::COPY)?;
        }
        Ok(())
    }

    /// Take every entry of `other`, leaving it empty, then fire `@steal`
    pub fn steal_from(&mut self, other: &mut Node) -> Result<()> {
        self.values.steal_from(&mut other.values);
        self.callables.steal_from(&mut other.callables);
        self.children.steal_from(&mut other.children);
        self.reparent_children();

        if self.is_created() {
            self.fire(hooks::STEAL)?;
        }
        Ok(())
    }

    /// Exchange every entry with `other`, then fire `@swap`
    pub fn swap_with(&mut self, other: &mut Node) -> Result<()> {
        self.values.swap_with(&mut other.values);
        self.callables.swap_with(&mut other.callables);
        self.children.swap_with(&mut other.children);
        self.reparent_children();
        other.reparent_children();

        if self.is_created() {
            self.fire(hooks::SWAP)?;
        }
        Ok(())
    }

    pub fn reset_values(&mut self) {
        self.values.clear();
    }

    /// Drop every callable and method, hooks included
    pub fn reset_functions(&mut self) {
        self.callables.clear();
    }

    pub fn reset_children(&mut self) {
        self.children.clear();
    }

    pub fn reset(&mut self) {
        self.reset_values();
        self.reset_functions();
        self.reset_children();
    }

    // ----- Introspection -----

    fn registry(&self, category: Category) -> &SlotRegistry {
        match category {
            Category::Value => &self.values,
            Category::Callable => &self.callables,
            Category::Child => &self.children,
        }
    }

    /// Sorted names held in a registry
    pub fn list_names(&self, category: Category) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry(category)
            .labels()
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    pub fn len(&self, category: Category) -> usize {
        self.registry(category).len()
    }

    /// Check whether all three registries are empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.callables.is_empty() && self.children.is_empty()
    }
}

impl Clone for Node {
    /// Deep copy with a fresh anchor; children link to the copy. Hooks are not
    /// fired.
    fn clone(&self) -> Self {
        let key = self.key.clone();
        let mut copy = Self {
            anchor: Arc::new(NodeAnchor {
                key: RwLock::new(key.clone()),
            }),
            key,
            state: self.state,
            parent: self.parent.clone(),
            values: self.values.duplicate(),
            callables: self.callables.duplicate(),
            children: self.children.duplicate(),
            config: self.config,
        };
        copy.reparent_children();
        copy
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if self.state != NodeState::Created {
            return;
        }
        self.state = NodeState::Uninitialized;
        if let Err(err) = self.fire(hooks::DELETE) {
            log::warn!("{}: {} failed during drop: {}", self, hooks::DELETE, err);
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component [{}]", self.name())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("parent", &self.parent)
            .field("values", &self.list_names(Category::Value))
            .field("callables", &self.list_names(Category::Callable))
            .field("children", &self.list_names(Category::Child))
            .finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Node {}

impl PartialEq<str> for Node {
    fn eq(&self, other: &str) -> bool {
        self.name() == other
    }
}

impl PartialEq<&str> for Node {
    fn eq(&self, other: &&str) -> bool {
        self.name() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_hook(counter: &Arc<AtomicUsize>) -> Hook {
        let counter = Arc::clone(counter);
        Method::new(move |_node: &mut Node, ()| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn failing_hook(_node: &mut Node, _args: ()) -> Result<()> {
        Err(ComponentError::NullReference("hook failed".into()))
    }

    #[test]
    fn test_value_roundtrip() {
        let mut node = Node::new("a");
        *node.add("score", 10i32).unwrap() += 1;

        assert!(node.has::<i32>("score"));
        assert!(!node.has::<u32>("score"));
        assert_eq!(*node.get::<i32>("score").unwrap(), 11);
        assert!(node.get::<i32>("missing").unwrap_err().is_not_found());

        assert_eq!(node.remove::<i32>("score").unwrap(), 11);
        assert!(!node.has::<i32>("score"));
        assert!(node.remove::<i32>("score").unwrap_err().is_not_found());
    }

    #[test]
    fn test_same_name_different_types() {
        let mut node = Node::new("a");
        node.add("speed", 1.5f32).unwrap();
        node.add("speed", String::from("fast")).unwrap();

        assert_eq!(*node.get::<f32>("speed").unwrap(), 1.5);
        assert_eq!(node.get::<String>("speed").unwrap(), "fast");
        assert_eq!(node.len(Category::Value), 2);
    }

    #[test]
    fn test_replace_archives_previous() {
        let mut node = Node::new("a");
        node.replace("hp", 10i32).unwrap();
        node.replace_as("hp", "hp_old", 20i32).unwrap();

        assert_eq!(*node.get::<i32>("hp").unwrap(), 20);
        assert_eq!(*node.get::<i32>("hp_old").unwrap(), 10);

        node.replace("hp", 30i32).unwrap();
        assert_eq!(*node.get::<i32>("hp").unwrap(), 30);
        assert_eq!(*node.get::<i32>("hp_old").unwrap(), 10);
    }

    #[test]
    fn test_description() {
        let mut node = Node::new("a");
        node.add("hp", 1i32).unwrap();
        node.describe::<i32>("hp", "hit points").unwrap();
        assert_eq!(node.description::<i32>("hp").unwrap(), "hit points");
        assert!(node.describe::<u8>("hp", "x").is_err());
    }

    #[test]
    fn test_child_naming_and_parent() {
        let mut parent = Node::new("root");
        parent.attach_child("sub", Node::new("ignored")).unwrap();

        let child = parent.child("sub").unwrap();
        assert_eq!(child.name(), "sub");
        let link = child.parent().unwrap();
        assert!(link.points_to(&parent));
        assert_eq!(link.name().unwrap(), "root");

        let removed = parent.remove_child("sub").unwrap();
        assert!(removed.parent().is_none());
    }

    #[test]
    fn test_parent_link_after_parent_dropped() {
        let mut parent = Node::new("root");
        parent.add_child("sub").unwrap();
        let link = parent.child("sub").unwrap().parent().unwrap().clone();

        drop(parent);
        assert!(!link.is_alive());
        assert!(matches!(link.key(), Err(ComponentError::NullReference(_))));
    }

    #[test]
    fn test_replace_child_as_renames_archived() {
        let mut parent = Node::new("root");
        parent.add_child("slot").unwrap().add("v", 1i32).unwrap();
        parent
            .replace_child_as("slot", "slot_old", Node::new("fresh"))
            .unwrap();

        assert_eq!(parent.child("slot").unwrap().name(), "slot");
        let archived = parent.child("slot_old").unwrap();
        assert_eq!(archived.name(), "slot_old");
        assert_eq!(*archived.get::<i32>("v").unwrap(), 1);
    }

    #[test]
    fn test_call_and_call_self() {
        let mut node = Node::new("greeter");
        node.add_fn("double", Callable::from_fn(|x: i32| x * 2))
            .unwrap();
        node.add_method(
            "greet",
            Method::new(|node: &mut Node, ()| format!("hi from {}", node.name())),
        )
        .unwrap();

        assert_eq!(node.call::<i32, i32>("double", 4).unwrap(), 8);
        assert_eq!(
            node.call_self::<(), String>("greet", ()).unwrap(),
            "hi from greeter"
        );
        assert!(node.call::<i32, i64>("double", 4).unwrap_err().is_not_found());
    }

    #[test]
    fn test_method_mutates_owner() {
        let mut node = Node::new("counter");
        node.add("count", 0u32).unwrap();
        node.add_method(
            "bump",
            Method::new(|node: &mut Node, by: u32| -> Result<u32> {
                let count = node.get_mut::<u32>("count")?;
                *count += by;
                Ok(*count)
            }),
        )
        .unwrap();

        node.call_self::<u32, Result<u32>>("bump", 2).unwrap().unwrap();
        let total = node.call_self::<u32, Result<u32>>("bump", 3).unwrap().unwrap();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_create_fires_once_and_cascades() {
        let created = Arc::new(AtomicUsize::new(0));
        let mut parent = Node::with_preset("root", true);
        parent.add_child("sub").unwrap();
        parent
            .child_mut("sub")
            .unwrap()
            .replace_method(hooks::CREATE, counting_hook(&created))
            .unwrap();
        parent
            .replace_method(hooks::CREATE, counting_hook(&created))
            .unwrap();

        parent.create().unwrap();
        parent.create().unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert!(parent.child("sub").unwrap().is_created());
    }

    #[test]
    fn test_failed_create_stays_uninitialized() {
        let mut node = Node::new("a");
        node.add_method(hooks::CREATE, Method::from_fn(failing_hook))
            .unwrap();
        assert!(node.create().is_err());
        assert_eq!(node.state(), NodeState::Uninitialized);
    }

    #[test]
    fn test_drop_fires_delete() {
        let deleted = Arc::new(AtomicUsize::new(0));
        let mut node = Node::new("a");
        node.add_method(hooks::DELETE, counting_hook(&deleted))
            .unwrap();

        node.create().unwrap();
        drop(node);
        assert_eq!(deleted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_restart_skips_delete() {
        let created = Arc::new(AtomicUsize::new(0));
        let deleted = Arc::new(AtomicUsize::new(0));
        let mut node = Node::new("a");
        node.add_method(hooks::CREATE, counting_hook(&created))
            .unwrap();
        node.add_method(hooks::DELETE, counting_hook(&deleted))
            .unwrap();

        node.create().unwrap();
        node.restart().unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(deleted.load(Ordering::SeqCst), 0);

        node.destroy().unwrap();
        node.destroy().unwrap();
        assert_eq!(deleted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_copy_from_is_deep() {
        let mut source = Node::new("source");
        source.add("list", vec![1, 2]).unwrap();
        source.add_child("sub").unwrap().add("v", 1i32).unwrap();

        let mut target = Node::new("target");
        target.add("stale", true).unwrap();
        target.copy_from(&source).unwrap();

        assert_eq!(target.name(), "source");
        assert!(!target.has::<bool>("stale"));
        target.get_mut::<Vec<i32>>("list").unwrap().push(3);
        assert_eq!(source.get::<Vec<i32>>("list").unwrap(), &vec![1, 2]);

        let sub = target.child("sub").unwrap();
        assert!(sub.parent().unwrap().points_to(&target));
    }

    #[test]
    fn test_steal_and_swap_reparent() {
        let mut a = Node::new("a");
        let mut b = Node::new("b");
        b.add_child("kid").unwrap();

        a.steal_from(&mut b).unwrap();
        assert!(b.is_empty());
        assert!(a.child("kid").unwrap().parent().unwrap().points_to(&a));

        a.swap_with(&mut b).unwrap();
        assert!(a.is_empty());
        assert!(b.child("kid").unwrap().parent().unwrap().points_to(&b));
    }

    #[test]
    fn test_copy_hook_fires_when_created() {
        let copies = Arc::new(AtomicUsize::new(0));
        let source = Node::new("source");
        let mut target = Node::new("target");
        target.copy_from(&source).unwrap();
        assert_eq!(copies.load(Ordering::SeqCst), 0);

        let mut created = Node::new("created");
        created.create().unwrap();
        let mut with_hook = Node::new("with_hook");
        with_hook
            .add_method(hooks::COPY, counting_hook(&copies))
            .unwrap();
        created.copy_from(&with_hook).unwrap();
        assert_eq!(copies.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invoke_all_in_name_order() {
        let mut root = Node::new("root");
        for (name, value) in [("b", 2), ("a", 1), ("c", 3)] {
            let child = root.add_child(name).unwrap();
            child
                .add_fn("value", Callable::new(move |()| value))
                .unwrap();
        }
        root.add_child("silent").unwrap();

        let values = root.invoke_all::<(), i32>("value", ()).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(root.invoke::<(), i32>("c", "value", ()).unwrap(), 3);
        assert!(root.invoke::<(), i32>("silent", "value", ()).is_err());
    }

    #[test]
    fn test_invoke_all_self_names() {
        let mut root = Node::new("root");
        for name in ["y", "x"] {
            root.add_child(name)
                .unwrap()
                .add_method("name", Method::new(|node: &mut Node, ()| node.name().to_string()))
                .unwrap();
        }
        let names = root.invoke_all_self::<(), String>("name", ()).unwrap();
        assert_eq!(names, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(root.invoke_self::<(), String>("x", "name", ()).unwrap(), "x");
    }

    #[test]
    fn test_preset_and_resets() {
        let mut node = Node::with_preset("a", true);
        assert_eq!(node.len(Category::Callable), hooks::ALL.len());
        node.add("v", 1i32).unwrap();
        node.add_child("c").unwrap();

        node.reset_functions();
        assert_eq!(node.len(Category::Callable), 0);
        node.reset();
        assert!(node.is_empty());
    }

    #[test]
    fn test_display_and_equality() {
        struct Player;
        let node = Node::of::<Player>();
        assert_eq!(node.name(), "Player");
        assert_eq!(node.to_string(), "Component [Player]");
        assert!(node == "Player");
        assert_eq!(node, Node::new("Player"));
        assert_ne!(node, Node::new("Enemy"));
    }

    #[test]
    fn test_value_family_rejects_node() {
        let mut root = Node::new("root");
        assert!(matches!(
            root.add("sub", Node::new("x")),
            Err(ComponentError::TypeMismatch { .. })
        ));
        assert!(matches!(
            root.replace("sub", Node::new("x")),
            Err(ComponentError::TypeMismatch { .. })
        ));
        assert!(!root.has::<Node>("sub"));
        assert_eq!(root.len(Category::Value), 0);

        root.add_child("sub").unwrap();
        assert!(root.child("sub").unwrap().parent().unwrap().points_to(&root));
    }

    #[test]
    fn test_same_named_closure_types_stay_apart() {
        fn wrap<F: Fn() -> i32 + Clone + Send + Sync + 'static>(f: F) -> F {
            f
        }
        fn read<F: Fn() -> i32 + 'static>(node: &Node, _like: &F) -> i32 {
            (node.get::<F>("cb").unwrap())()
        }

        let first = wrap(|| 1);
        let second = wrap(|| 2);
        let mut node = Node::new("n");
        node.add("cb", first).unwrap();
        node.add("cb", second).unwrap();

        assert_eq!(node.len(Category::Value), 2);
        assert_eq!(read(&node, &first), 1);
        assert_eq!(read(&node, &second), 2);
    }

    #[test]
    fn test_preset_keeps_existing_hooks() {
        let created = Arc::new(AtomicUsize::new(0));
        let mut node = Node::new("a");
        node.add_method(hooks::CREATE, counting_hook(&created))
            .unwrap();
        node.preset();

        assert_eq!(node.len(Category::Callable), hooks::ALL.len());
        node.create().unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Vec<Option<i32>>>(), "Vec");
        assert_eq!(short_type_name::<Node>(), "Node");
    }
}
