//! Slot registry
//!
//! Owning map from [`IdentityKey`] to [`ErasedBox`]. Every box removed by
//! `remove`/`clear`/drop is handed to the registry's disposer; bulk moves
//! (`steal_from`, `swap_with`) relocate the backing map and never dispose.

use std::collections::HashMap;
use std::fmt;
use std::mem;

use void_core::{ComponentError, ErasedBox, IdentityKey, Result};

/// Receives every box the registry disposes of
pub type Disposer = Box<dyn FnMut(&IdentityKey, ErasedBox) + Send + Sync>;

/// Owning keyed collection of type-erased boxes
#[derive(Default)]
pub struct SlotRegistry {
    slots: HashMap<IdentityKey, ErasedBox>,
    /// `None` drops boxes in place
    disposer: Option<Disposer>,
}

impl SlotRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with a custom disposer
    pub fn with_disposer(disposer: Disposer) -> Self {
        Self {
            slots: HashMap::new(),
            disposer: Some(disposer),
        }
    }

    /// Install a disposer observing every disposed box
    pub fn set_disposer(&mut self, disposer: Disposer) {
        self.disposer = Some(disposer);
    }

    /// Go back to dropping disposed boxes
    pub fn reset_disposer(&mut self) {
        self.disposer = None;
    }

    fn dispose(&mut self, key: &IdentityKey, boxed: ErasedBox) {
        match self.disposer.as_mut() {
            Some(disposer) => disposer(key, boxed),
            None => drop(boxed),
        }
    }

    /// Check if a key is present
    pub fn has(&self, key: &IdentityKey) -> bool {
        self.slots.contains_key(key)
    }

    /// Take ownership of a box under a fresh key
    pub fn add(&mut self, key: IdentityKey, boxed: ErasedBox) -> Result<()> {
        if let Some(existing) = self.slots.get(&key) {
            return Err(ComponentError::already_exists(
                key.label(),
                existing.type_name(),
            ));
        }
        self.slots.insert(key, boxed);
        Ok(())
    }

    /// Put a box under a key, returning whatever it displaced (undisposed)
    pub fn insert(&mut self, key: IdentityKey, boxed: ErasedBox) -> Option<ErasedBox> {
        self.slots.insert(key, boxed)
    }

    /// Put a box under a key, disposing whatever it displaced
    pub fn overwrite(&mut self, key: IdentityKey, boxed: ErasedBox) {
        let disposed = key.clone();
        if let Some(previous) = self.slots.insert(key, boxed) {
            self.dispose(&disposed, previous);
        }
    }

    pub fn get(&self, key: &IdentityKey) -> Result<&ErasedBox> {
        self.slots
            .get(key)
            .ok_or_else(|| ComponentError::not_found(key.label(), "slot"))
    }

    pub fn get_mut(&mut self, key: &IdentityKey) -> Result<&mut ErasedBox> {
        self.slots
            .get_mut(key)
            .ok_or_else(|| ComponentError::not_found(key.label(), "slot"))
    }

    /// Get a typed reference to a boxed value
    pub fn get_as<T: 'static>(&self, key: &IdentityKey) -> Result<&T> {
        self.slots
            .get(key)
            .ok_or_else(|| ComponentError::not_found(key.label(), std::any::type_name::<T>()))?
            .expect_ref()
    }

    /// Get a typed mutable reference to a boxed value
    pub fn get_as_mut<T: 'static>(&mut self, key: &IdentityKey) -> Result<&mut T> {
        self.slots
            .get_mut(key)
            .ok_or_else(|| ComponentError::not_found(key.label(), std::any::type_name::<T>()))?
            .expect_mut()
    }

    /// Dispose the box under `key`, returning whether one was there
    pub fn remove(&mut self, key: &IdentityKey) -> bool {
        match self.slots.remove_entry(key) {
            Some((key, boxed)) => {
                self.dispose(&key, boxed);
                true
            }
            None => false,
        }
    }

    /// Remove the box under `key` and hand ownership to the caller
    pub fn take(&mut self, key: &IdentityKey) -> Result<ErasedBox> {
        self.slots
            .remove(key)
            .ok_or_else(|| ComponentError::not_found(key.label(), "slot"))
    }

    /// Dispose every box
    pub fn clear(&mut self) {
        let slots = mem::take(&mut self.slots);
        if self.disposer.is_none() {
            return;
        }
        for (key, boxed) in slots {
            self.dispose(&key, boxed);
        }
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.slots.keys()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(|key| key.label())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IdentityKey, &ErasedBox)> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&IdentityKey, &mut ErasedBox)> {
        self.slots.iter_mut()
    }

    /// Iterate over the entries holding a `T`
    pub fn iter_as<T: 'static>(&self) -> impl Iterator<Item = (&IdentityKey, &T)> {
        self.slots
            .iter()
            .filter_map(|(key, boxed)| boxed.downcast_ref::<T>().map(|value| (key, value)))
    }

    /// Iterate mutably over the entries holding a `T`
    pub fn iter_as_mut<T: 'static>(&mut self) -> impl Iterator<Item = (&IdentityKey, &mut T)> {
        self.slots
            .iter_mut()
            .filter_map(|(key, boxed)| boxed.downcast_mut::<T>().map(|value| (key, value)))
    }

    /// Deep-clone every entry into a fresh registry with the default disposer
    pub fn duplicate(&self) -> Self {
        let mut copy = Self::new();
        self.duplicate_into(&mut copy);
        copy
    }

    /// Clear `other`, then deep-clone every entry into it
    pub fn duplicate_into(&self, other: &mut SlotRegistry) {
        other.clear();
        other.slots.reserve(self.slots.len());
        for (key, boxed) in &self.slots {
            other.slots.insert(key.clone(), boxed.duplicate());
        }
    }

    /// Replace this registry's entries with all of `other`'s.
    ///
    /// Entries previously held here are disposed. `other` is left empty and
    /// nothing that moved passes through either disposer.
    pub fn steal_from(&mut self, other: &mut SlotRegistry) {
        self.clear();
        self.slots = mem::take(&mut other.slots);
    }

    /// Exchange entries with `other` in constant time
    pub fn swap_with(&mut self, other: &mut SlotRegistry) {
        mem::swap(&mut self.slots, &mut other.slots);
    }
}

impl Drop for SlotRegistry {
    fn drop(&mut self) {
        if self.disposer.is_some() {
            self.clear();
        }
    }
}

impl fmt::Debug for SlotRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<&str> = self.labels().collect();
        labels.sort_unstable();
        f.debug_struct("SlotRegistry")
            .field("len", &self.slots.len())
            .field("labels", &labels)
            .field("custom_disposer", &self.disposer.is_some())
            .finish()
    }
}
