//! Identity keys for named slots
//!
//! A key pairs a human-chosen label with a 64-bit hash. Typed keys fold the
//! stored type's `TypeId` into the hash, so one label can address several
//! differently-typed slots without the entries colliding. Untyped keys depend
//! on the label alone and are stable across builds.

use core::any::TypeId;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Separates the label from the type discriminator. Never valid UTF-8, so no
/// label can forge a typed key.
const TYPE_SEPARATOR: u8 = 0xff;

/// Feeds whatever a `Hash` impl writes into the running FNV-1a state
struct FnvHasher(u64);

impl Hasher for FnvHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.0 = fnv1a(self.0, bytes);
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[inline]
fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hashable `(label, type)` pair used as the lookup key everywhere.
///
/// Equality, ordering and hashing look at the stable hash only; the label is
/// carried for diagnostics.
#[derive(Clone)]
pub struct IdentityKey {
    hash: u64,
    label: Box<str>,
}

impl IdentityKey {
    /// Create an untyped key from a label
    pub fn new(label: &str) -> Self {
        Self {
            hash: fnv1a(FNV_OFFSET, label.as_bytes()),
            label: label.into(),
        }
    }

    /// Create a key scoped to the logical category `T`
    pub fn of<T: ?Sized + 'static>(label: &str) -> Self {
        let hash = fnv1a(FNV_OFFSET, label.as_bytes());
        let mut hasher = FnvHasher(fnv1a(hash, &[TYPE_SEPARATOR]));
        TypeId::of::<T>().hash(&mut hasher);
        Self {
            hash: hasher.finish(),
            label: label.into(),
        }
    }

    /// Get the precomputed hash
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Get the label
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl PartialEq for IdentityKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for IdentityKey {}

impl PartialOrd for IdentityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdentityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

impl Hash for IdentityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKey({:?}, {:#018x})", self.label, self.hash)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl From<&str> for IdentityKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for IdentityKey {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_label_same_key() {
        assert_eq!(IdentityKey::new("score"), IdentityKey::new("score"));
        assert_eq!(IdentityKey::of::<i32>("score"), IdentityKey::of::<i32>("score"));
        assert_ne!(IdentityKey::new("score"), IdentityKey::new("health"));
    }

    #[test]
    fn test_type_scoping() {
        let as_int = IdentityKey::of::<i32>("score");
        let as_text = IdentityKey::of::<String>("score");
        let untyped = IdentityKey::new("score");

        assert_ne!(as_int, as_text);
        assert_ne!(as_int, untyped);
        assert_eq!(as_int.label(), as_text.label());
    }

    #[test]
    fn test_ordering_follows_hash() {
        let a = IdentityKey::new("a");
        let b = IdentityKey::new("b");
        assert_eq!(a.cmp(&b), a.hash_value().cmp(&b.hash_value()));
    }

    #[test]
    fn test_display_is_label() {
        let key = IdentityKey::of::<u8>("speed");
        assert_eq!(key.to_string(), "speed");
        assert!(format!("{:?}", key).contains("speed"));
    }

    #[test]
    fn test_same_type_name_different_types() {
        fn key_like<T: 'static>(_value: &T) -> IdentityKey {
            IdentityKey::of::<T>("cb")
        }
        fn name_of<T>(_value: &T) -> &'static str {
            core::any::type_name::<T>()
        }

        let first = || 1;
        let second = || 2;
        assert_eq!(name_of(&first), name_of(&second));
        assert_ne!(key_like(&first), key_like(&second));
        assert_eq!(key_like(&first), key_like(&first));
    }

    #[test]
    fn test_fnv_reference_value() {
        // FNV-1a 64 of the empty string is the offset basis
        assert_eq!(IdentityKey::new("").hash_value(), FNV_OFFSET);
        assert_eq!(IdentityKey::new("a").hash_value(), 0xaf63dc4c8601ec8c);
    }
}
