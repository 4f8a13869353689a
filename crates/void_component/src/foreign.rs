//! Plain function pointers for foreign callback APIs
//!
//! An API that only accepts `fn(A) -> R` cannot carry captured state. A
//! [`Callable`] is parked in a process-wide slot keyed by a caller-chosen tag
//! type, and a non-capturing trampoline monomorphized for that tag forwards
//! every call to it.

use std::any::{type_name, Any, TypeId};
use std::collections::BTreeMap;
use std::marker::PhantomData;

use parking_lot::{const_mutex, Mutex};
use void_core::{ComponentError, Result};

use crate::callable::Callable;

/// One slot per `(Tag, A, R)`
struct ForeignSlot<Tag, A, R>(PhantomData<fn() -> (Tag, A, R)>);

static FOREIGN_SLOTS: Mutex<BTreeMap<TypeId, Box<dyn Any + Send + Sync>>> =
    const_mutex(BTreeMap::new());

fn slot_id<Tag: 'static, A: 'static, R: 'static>() -> TypeId {
    TypeId::of::<ForeignSlot<Tag, A, R>>()
}

fn trampoline<Tag: 'static, A: 'static, R: 'static>(args: A) -> R {
    let callable = FOREIGN_SLOTS
        .lock()
        .get(&slot_id::<Tag, A, R>())
        .and_then(|slot| slot.downcast_ref::<Callable<A, R>>())
        .cloned();
    // The lock is released before user code runs.
    match callable.map(|callable| callable.invoke(args)) {
        Some(Ok(result)) => result,
        Some(Err(err)) => panic!("{} (foreign callback {})", err, type_name::<Tag>()),
        None => panic!(
            "{} (foreign callback {} was released)",
            ComponentError::EmptyCallable,
            type_name::<Tag>()
        ),
    }
}

fn install<Tag: 'static, A: 'static, R: 'static>(
    callable: &Callable<A, R>,
    overwrite: bool,
) -> Result<fn(A) -> R> {
    if !callable.is_set() {
        return Err(ComponentError::EmptyCallable);
    }

    let mut slots = FOREIGN_SLOTS.lock();
    let id = slot_id::<Tag, A, R>();
    if !overwrite && slots.contains_key(&id) {
        return Err(ComponentError::CallbackSlotOccupied(type_name::<Tag>()));
    }
    slots.insert(id, Box::new(callable.clone()));
    log::debug!("Registered foreign callback: {}", type_name::<Tag>());

    Ok(trampoline::<Tag, A, R>)
}

impl<A: 'static, R: 'static> Callable<A, R> {
    /// Park a copy of this callable under `Tag` and get a plain function
    /// pointer that calls it.
    ///
    /// Fails with [`ComponentError::CallbackSlotOccupied`] while another
    /// callable of the same signature is registered for `Tag`.
    pub fn into_foreign<Tag: 'static>(&self) -> Result<fn(A) -> R> {
        install::<Tag, A, R>(self, false)
    }

    /// Like [`into_foreign`](Self::into_foreign), replacing any callable
    /// already registered for `Tag`
    pub fn replace_foreign<Tag: 'static>(&self) -> Result<fn(A) -> R> {
        install::<Tag, A, R>(self, true)
    }
}

/// Free the slot for `Tag`, returning whether one was registered.
///
/// Function pointers handed out for the slot panic when called afterwards.
pub fn release_foreign<Tag: 'static, A: 'static, R: 'static>() -> bool {
    let released = FOREIGN_SLOTS
        .lock()
        .remove(&slot_id::<Tag, A, R>())
        .is_some();
    if released {
        log::debug!("Released foreign callback: {}", type_name::<Tag>());
    }
    released
}

/// Check whether a callable is registered for `Tag`
pub fn is_foreign_registered<Tag: 'static, A: 'static, R: 'static>() -> bool {
    FOREIGN_SLOTS.lock().contains_key(&slot_id::<Tag, A, R>())
}
