//! Process-wide method table
//!
//! Methods shared by every node of one kind, addressed by a class tag `C` and
//! an id tag `I` instead of a string name. Entries are cloned out of the table
//! before they run, so a method may freely touch the table itself.

use std::any::{type_name, Any, TypeId};
use std::collections::BTreeMap;
use std::marker::PhantomData;

use parking_lot::{const_mutex, Mutex};
use void_core::{ComponentError, Result};

use crate::callable::Method;

struct StaticSlot<C, I, A, R>(PhantomData<fn() -> (C, I, A, R)>);

static STATIC_METHODS: Mutex<BTreeMap<TypeId, Box<dyn Any + Send + Sync>>> =
    const_mutex(BTreeMap::new());

fn slot_id<C: 'static, I: 'static, A: 'static, R: 'static>() -> TypeId {
    TypeId::of::<StaticSlot<C, I, A, R>>()
}

const KIND: &str = "static method";

/// Register a method under `(C, I)`
pub fn add<C: 'static, I: 'static, A: 'static, R: 'static>(method: Method<A, R>) -> Result<()> {
    let mut table = STATIC_METHODS.lock();
    let id = slot_id::<C, I, A, R>();
    if table.contains_key(&id) {
        return Err(ComponentError::already_exists(type_name::<I>(), KIND));
    }
    table.insert(id, Box::new(method));
    log::debug!(
        "Registered static method {} on {}",
        type_name::<I>(),
        type_name::<C>()
    );
    Ok(())
}

/// Get a copy of the method under `(C, I)`
pub fn get<C: 'static, I: 'static, A: 'static, R: 'static>() -> Result<Method<A, R>> {
    STATIC_METHODS
        .lock()
        .get(&slot_id::<C, I, A, R>())
        .and_then(|slot| slot.downcast_ref::<Method<A, R>>())
        .cloned()
        .ok_or_else(|| ComponentError::not_found(type_name::<I>(), KIND))
}

pub fn has<C: 'static, I: 'static, A: 'static, R: 'static>() -> bool {
    STATIC_METHODS
        .lock()
        .contains_key(&slot_id::<C, I, A, R>())
}

/// Replace the method under `(C, I)`, keeping the previous one under `(C, J)`.
///
/// With `J == I` the previous method is simply dropped.
pub fn replace<C: 'static, I: 'static, J: 'static, A: 'static, R: 'static>(
    method: Method<A, R>,
) -> Result<()> {
    let mut table = STATIC_METHODS.lock();
    let id = slot_id::<C, I, A, R>();
    let previous = table
        .remove(&id)
        .ok_or_else(|| ComponentError::not_found(type_name::<I>(), KIND))?;
    table.insert(id, Box::new(method));

    let archive = slot_id::<C, J, A, R>();
    if archive != id {
        table.insert(archive, previous);
    }
    log::debug!(
        "Replaced static method {} on {}",
        type_name::<I>(),
        type_name::<C>()
    );
    Ok(())
}

/// Remove the method under `(C, I)`, returning whether one was there
pub fn remove<C: 'static, I: 'static, A: 'static, R: 'static>() -> bool {
    STATIC_METHODS
        .lock()
        .remove(&slot_id::<C, I, A, R>())
        .is_some()
}
