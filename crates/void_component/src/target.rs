//! Erased storage for callable targets
//!
//! Small captures live inline in a word-aligned buffer and are cloned and
//! dropped through monomorphized function pointers. Larger or over-aligned
//! captures move into a shared heap allocation, so copies of a callable share
//! one instance of the captured state and it is dropped once, with the last
//! copy.

use std::any::Any;
use std::mem::{self, MaybeUninit};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Words of inline storage
const INLINE_WORDS: usize = 3;

/// Captures up to this many bytes (and word alignment) are stored inline
pub const INLINE_CAPACITY: usize = INLINE_WORDS * mem::size_of::<usize>();

/// Identity of a callable target, used for equality, ordering and hashing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity {
    /// Object address, free-function marker, or construction serial
    pub target: usize,
    /// Code address invoked for the target
    pub code: usize,
}

impl Identity {
    /// Identity of an empty target
    pub const EMPTY: Self = Self { target: 0, code: 0 };

    /// Fresh identity for a newly captured closure
    fn fresh() -> Self {
        static NEXT_SERIAL: AtomicUsize = AtomicUsize::new(1);
        Self {
            target: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            code: 0,
        }
    }
}

struct InlineBuf([MaybeUninit<usize>; INLINE_WORDS]);

impl InlineBuf {
    fn uninit() -> Self {
        Self([MaybeUninit::uninit(); INLINE_WORDS])
    }

    fn as_ptr(&self) -> *const u8 {
        self.0.as_ptr() as *const u8
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.0.as_mut_ptr() as *mut u8
    }
}

enum Storage {
    Empty,
    Inline {
        buf: InlineBuf,
        drop_fn: unsafe fn(*mut u8),
        clone_fn: unsafe fn(*const u8, *mut u8),
    },
    Shared(Arc<dyn Any + Send + Sync>),
}

unsafe fn drop_inline<F>(data: *mut u8) {
    ptr::drop_in_place(data as *mut F);
}

unsafe fn clone_inline<F: Clone>(src: *const u8, dst: *mut u8) {
    let value = (*(src as *const F)).clone();
    ptr::write(dst as *mut F, value);
}

/// Check whether `F` fits the inline buffer
#[inline]
pub const fn fits_inline<F>() -> bool {
    mem::size_of::<F>() <= INLINE_CAPACITY && mem::align_of::<F>() <= mem::align_of::<usize>()
}

/// Owned, type-erased callable state
pub(crate) struct Target {
    storage: Storage,
    identity: Identity,
}

impl Target {
    pub(crate) const fn empty() -> Self {
        Self {
            storage: Storage::Empty,
            identity: Identity::EMPTY,
        }
    }

    /// Store `value` inline when it fits, otherwise on the heap
    pub(crate) fn new<F: Clone + Send + Sync + 'static>(value: F) -> Self {
        if !fits_inline::<F>() {
            return Self::shared(value);
        }
        let mut buf = InlineBuf::uninit();
        // SAFETY: `fits_inline` guarantees size and alignment, and the buffer
        // is freshly uninitialized.
        unsafe { ptr::write(buf.as_mut_ptr() as *mut F, value) };
        Self {
            storage: Storage::Inline {
                buf,
                drop_fn: drop_inline::<F>,
                clone_fn: clone_inline::<F>,
            },
            identity: Identity::fresh(),
        }
    }

    /// Store `value` on the heap regardless of its size
    pub(crate) fn shared<F: Send + Sync + 'static>(value: F) -> Self {
        Self {
            storage: Storage::Shared(Arc::new(value)),
            identity: Identity::fresh(),
        }
    }

    pub(crate) fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub(crate) fn with_code(mut self, code: usize) -> Self {
        self.identity.code = code;
        self
    }

    #[inline]
    pub(crate) fn identity(&self) -> Identity {
        self.identity
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self.storage, Storage::Empty)
    }

    #[inline]
    pub(crate) fn is_inline(&self) -> bool {
        matches!(self.storage, Storage::Inline { .. })
    }

    /// Pointer to the stored value, `None` when empty
    pub(crate) fn data_ptr(&self) -> Option<*const u8> {
        match &self.storage {
            Storage::Empty => None,
            Storage::Inline { buf, .. } => Some(buf.as_ptr()),
            Storage::Shared(value) => Some(Arc::as_ptr(value) as *const u8),
        }
    }

    /// Drop the captured state (once) and become empty
    pub(crate) fn reset(&mut self) {
        if let Storage::Inline {
            mut buf, drop_fn, ..
        } = mem::replace(&mut self.storage, Storage::Empty)
        {
            // SAFETY: the buffer holds the value `drop_fn` was built for and
            // it was just detached from `self`, so it is dropped exactly once.
            unsafe { drop_fn(buf.as_mut_ptr()) };
        }
        self.identity = Identity::EMPTY;
    }
}

impl Clone for Target {
    fn clone(&self) -> Self {
        let storage = match &self.storage {
            Storage::Empty => Storage::Empty,
            Storage::Inline {
                buf,
                drop_fn,
                clone_fn,
            } => {
                let mut copy = InlineBuf::uninit();
                // SAFETY: `clone_fn` was built for the value stored in `buf`
                // and writes a clone of it into the fresh buffer.
                unsafe { clone_fn(buf.as_ptr(), copy.as_mut_ptr()) };
                Storage::Inline {
                    buf: copy,
                    drop_fn: *drop_fn,
                    clone_fn: *clone_fn,
                }
            }
            Storage::Shared(value) => Storage::Shared(Arc::clone(value)),
        };
        Self {
            storage,
            identity: self.identity,
        }
    }
}

impl Drop for Target {
    fn drop(&mut self) {
        self.reset();
    }
}
