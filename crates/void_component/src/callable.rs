//! Type-erased callables
//!
//! [`Callable`] is a value-semantics replacement for `Box<dyn Fn>`: it can
//! wrap a free function, a method bound to a shared object, or a capturing
//! closure, and it is cheap to copy. Arguments are passed as one value; use a
//! tuple for several.
//!
//! [`Method`] is the same machinery for callables that receive the owning
//! [`Node`] as their first argument, which is how lifecycle hooks and
//! owner-mutating functions are stored.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use void_core::{ComponentError, Result};

use crate::node::Node;
use crate::target::{Identity, Target};

type Stub<A, R> = unsafe fn(*const u8, A) -> R;
type MethodStub<A, R> = unsafe fn(*const u8, &mut Node, A) -> R;

unsafe fn closure_stub<F, A, R>(data: *const u8, args: A) -> R
where
    F: Fn(A) -> R,
{
    (*(data as *const F))(args)
}

unsafe fn method_stub<F, A, R>(data: *const u8, node: &mut Node, args: A) -> R
where
    F: Fn(&mut Node, A) -> R,
{
    (*(data as *const F))(node, args)
}

/// Type-erased `Fn(A) -> R` with value semantics
pub struct Callable<A, R = ()> {
    target: Target,
    stub: Option<Stub<A, R>>,
}

impl<A: 'static, R: 'static> Callable<A, R> {
    /// Create an empty callable
    pub const fn empty() -> Self {
        Self {
            target: Target::empty(),
            stub: None,
        }
    }

    /// Wrap a free function. Two callables over the same function compare equal.
    pub fn from_fn(function: fn(A) -> R) -> Self {
        let stub: Stub<A, R> = closure_stub::<fn(A) -> R, A, R>;
        Self {
            target: Target::new(function).with_identity(Identity {
                target: 0,
                code: function as usize,
            }),
            stub: Some(stub),
        }
    }

    /// Bind a method to a shared object
    pub fn bind<C: Send + Sync + 'static>(object: Arc<C>, method: fn(&C, A) -> R) -> Self {
        let identity = Identity {
            target: Arc::as_ptr(&object) as usize,
            code: method as usize,
        };
        let mut callable = Self::new(move |args| method(&object, args));
        callable.target = callable.target.with_identity(identity);
        callable
    }

    /// Wrap a capturing closure, inline when it is small enough
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(A) -> R + Clone + Send + Sync + 'static,
    {
        let stub: Stub<A, R> = closure_stub::<F, A, R>;
        Self {
            target: Target::new(function).with_code(stub as usize),
            stub: Some(stub),
        }
    }

    /// Wrap a closure that is not `Clone`; always heap-allocated and shared
    /// between copies
    pub fn shared<F>(function: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let stub: Stub<A, R> = closure_stub::<F, A, R>;
        Self {
            target: Target::shared(function).with_code(stub as usize),
            stub: Some(stub),
        }
    }

    /// Call the target
    pub fn invoke(&self, args: A) -> Result<R> {
        match (self.stub, self.target.data_ptr()) {
            // SAFETY: `stub` was instantiated for the concrete type stored in
            // `target`, and both are only ever set together.
            (Some(stub), Some(data)) => Ok(unsafe { stub(data, args) }),
            _ => Err(ComponentError::EmptyCallable),
        }
    }
}

impl<A, R> Callable<A, R> {
    /// Check whether a target is set
    #[inline]
    pub fn is_set(&self) -> bool {
        self.stub.is_some() && !self.target.is_empty()
    }

    /// Check whether the captured state lives inline
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.target.is_inline()
    }

    pub fn identity(&self) -> Identity {
        self.target.identity()
    }

    /// Drop the target, disposing captured state
    pub fn reset(&mut self) {
        self.stub = None;
        self.target.reset();
    }

    /// Overwrite with another callable, disposing the current target
    pub fn set(&mut self, other: Self) {
        *self = other;
    }

    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

impl<A, R> Clone for Callable<A, R> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            stub: self.stub,
        }
    }
}

impl<A: 'static, R: 'static> Default for Callable<A, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<A, R> From<fn(A) -> R> for Callable<A, R>
where
    A: 'static,
    R: 'static,
{
    fn from(function: fn(A) -> R) -> Self {
        Self::from_fn(function)
    }
}

/// Type-erased `Fn(&mut Node, A) -> R` with value semantics
pub struct Method<A, R = ()> {
    target: Target,
    stub: Option<MethodStub<A, R>>,
}

impl<A: 'static, R: 'static> Method<A, R> {
    /// Create an empty method
    pub const fn empty() -> Self {
        Self {
            target: Target::empty(),
            stub: None,
        }
    }

    /// Wrap a free function
    pub fn from_fn(function: fn(&mut Node, A) -> R) -> Self {
        let stub: MethodStub<A, R> = method_stub::<fn(&mut Node, A) -> R, A, R>;
        Self {
            target: Target::new(function).with_identity(Identity {
                target: 0,
                code: function as usize,
            }),
            stub: Some(stub),
        }
    }

    /// Wrap a capturing closure, inline when it is small enough
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&mut Node, A) -> R + Clone + Send + Sync + 'static,
    {
        let stub: MethodStub<A, R> = method_stub::<F, A, R>;
        Self {
            target: Target::new(function).with_code(stub as usize),
            stub: Some(stub),
        }
    }

    /// Wrap a closure that is not `Clone`
    pub fn shared<F>(function: F) -> Self
    where
        F: Fn(&mut Node, A) -> R + Send + Sync + 'static,
    {
        let stub: MethodStub<A, R> = method_stub::<F, A, R>;
        Self {
            target: Target::shared(function).with_code(stub as usize),
            stub: Some(stub),
        }
    }

    /// Call the target with `node` as its owner
    pub fn invoke(&self, node: &mut Node, args: A) -> Result<R> {
        match (self.stub, self.target.data_ptr()) {
            // SAFETY: see `Callable::invoke`.
            (Some(stub), Some(data)) => Ok(unsafe { stub(data, node, args) }),
            _ => Err(ComponentError::EmptyCallable),
        }
    }
}

impl<A, R> Method<A, R> {
    #[inline]
    pub fn is_set(&self) -> bool {
        self.stub.is_some() && !self.target.is_empty()
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        self.target.is_inline()
    }

    pub fn identity(&self) -> Identity {
        self.target.identity()
    }

    pub fn reset(&mut self) {
        self.stub = None;
        self.target.reset();
    }

    pub fn set(&mut self, other: Self) {
        *self = other;
    }

    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

impl<A, R> Clone for Method<A, R> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            stub: self.stub,
        }
    }
}

impl<A: 'static, R: 'static> Default for Method<A, R> {
    fn default() -> Self {
        Self::empty()
    }
}

macro_rules! impl_identity_traits {
    ($ty:ident) => {
        impl<A, R> PartialEq for $ty<A, R> {
            fn eq(&self, other: &Self) -> bool {
                self.identity() == other.identity()
            }
        }

        impl<A, R> Eq for $ty<A, R> {}

        impl<A, R> PartialOrd for $ty<A, R> {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl<A, R> Ord for $ty<A, R> {
            fn cmp(&self, other: &Self) -> Ordering {
                self.identity().cmp(&other.identity())
            }
        }

        impl<A, R> Hash for $ty<A, R> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.identity().hash(state);
            }
        }

        impl<A, R> fmt::Debug for $ty<A, R> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("signature", &std::any::type_name::<fn(A) -> R>())
                    .field("set", &self.is_set())
                    .field("inline", &self.is_inline())
                    .field("identity", &self.identity())
                    .finish()
            }
        }
    };
}

impl_identity_traits!(Callable);
impl_identity_traits!(Method);
