//! Process-wide, type-keyed storage for values that live forever.
//!
//! Rust has no generic `static`s, so the implementation cache and the table
//! cache cannot be a `static` per `(capability, type)` pair. Instead each is a
//! single [`Registry`] that maps a key made of [`TypeId`]s to a leaked,
//! immutable value.
//!
//! A value is created at most once per key. The first lookup of a key takes
//! the write lock and builds the value while holding it, so concurrent first
//! lookups all observe the same instance and none can observe a partially
//! built one. Later lookups only take the read lock.

mod lock;

use alloc::boxed::Box;
use core::{any::TypeId, ptr::NonNull};

use hashbrown::{HashMap, hash_map};
use rustc_hash::FxBuildHasher;

use self::lock::CacheLock;

/// Identifies one value in a [`Registry`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct Key {
    /// Type of the stored value
    value: TypeId,
    /// Caller-defined identity, e.g. the capability
    first: TypeId,
    /// Caller-defined identity, e.g. the object type
    second: TypeId,
}

/// A leaked value of the type recorded in its [`Key`].
#[derive(Clone, Copy)]
struct Slot {
    /// Pointer created by `Box::leak`
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer was created from a `&'static T` returned by
    ///    [`Box::leak`], where `T` is the type whose [`TypeId`] is stored in
    ///    the [`Key`] this slot is stored under.
    /// 2. The pointee is never mutated or freed.
    ptr: NonNull<()>,
}

// SAFETY: A slot is a shared reference to a `T: Send + Sync` (enforced by
// `Registry::get_or_insert_with`), and `&T` is `Send` for such `T`.
unsafe impl Send for Slot {}

// SAFETY: A slot is a shared reference to a `T: Send + Sync` (enforced by
// `Registry::get_or_insert_with`), and `&T` is `Sync` for such `T`.
unsafe impl Sync for Slot {}

impl Slot {
    #[inline]
    fn leak<T: Send + Sync + 'static>(value: T) -> Self {
        let value: &'static T = Box::leak(Box::new(value));
        Self {
            ptr: NonNull::from(value).cast::<()>(),
        }
    }

    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `T` is the type recorded in the [`Key`] this slot was stored under.
    #[inline]
    unsafe fn get<T: 'static>(self) -> &'static T {
        let ptr = self.ptr.cast::<T>();

        // SAFETY:
        // 1. Guaranteed by the caller, the pointer was leaked from a `Box<T>`.
        // 2. Guaranteed by the invariants of `Slot`, the pointee is never mutated
        //    or freed.
        unsafe { ptr.as_ref() }
    }
}

type SlotMap = HashMap<Key, Slot, FxBuildHasher>;

/// A write-once map from type identities to `&'static` values.
pub(crate) struct Registry {
    entries: CacheLock<SlotMap>,
}

impl Registry {
    pub(crate) const fn new() -> Self {
        Self {
            entries: CacheLock::new(),
        }
    }

    /// Returns the value stored under `(first, second)` for type `T`, if any.
    ///
    /// Only takes the read lock.
    pub(crate) fn get<T: 'static>(
        &'static self,
        first: TypeId,
        second: TypeId,
    ) -> Option<&'static T> {
        let key = Key {
            value: TypeId::of::<T>(),
            first,
            second,
        };
        let slot = self
            .entries
            .inspect(|entries| entries.and_then(|entries| entries.get(&key).copied()))?;

        // SAFETY:
        // 1. Every slot is stored under a key whose `value` is the `TypeId` of the
        //    leaked value, and `key.value` is `TypeId::of::<T>()`.
        Some(unsafe { slot.get::<T>() })
    }

    /// Returns the value stored under `(first, second)` for type `T`, creating
    /// it with `init` if this is the first lookup of that key.
    ///
    /// The flag is `true` for the one call that created the value. It is
    /// returned after the lock has been released, so the caller may report the
    /// creation from code that uses this registry again.
    ///
    /// `init` runs while the write lock is held and must not access this
    /// registry.
    pub(crate) fn get_or_insert_with<T, F>(
        &'static self,
        first: TypeId,
        second: TypeId,
        init: F,
    ) -> (&'static T, bool)
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let key = Key {
            value: TypeId::of::<T>(),
            first,
            second,
        };

        if let Some(value) = self.get::<T>(first, second) {
            return (value, false);
        }

        let (slot, created) = self.entries.update(
            || HashMap::with_hasher(FxBuildHasher),
            |entries| match entries.entry(key) {
                hash_map::Entry::Occupied(entry) => (*entry.get(), false),
                hash_map::Entry::Vacant(entry) => (*entry.insert(Slot::leak(init())), true),
            },
        );

        // SAFETY:
        // 1. Every slot is stored under a key whose `value` is the `TypeId` of the
        //    leaked value, and `key.value` is `TypeId::of::<T>()`.
        let value = unsafe { slot.get::<T>() };

        (value, created)
    }

    #[cfg(test)]
    pub(crate) fn len(&'static self) -> usize {
        self.entries.inspect(|entries| entries.map_or(0, HashMap::len))
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec::Vec};
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_registry_creates_once() {
        static REGISTRY: Registry = Registry::new();
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let init = || {
            CALLS.fetch_add(1, Ordering::Relaxed);
            String::from("value")
        };

        let (first, first_created): (&'static String, _) =
            REGISTRY.get_or_insert_with(TypeId::of::<u8>(), TypeId::of::<u16>(), init);
        let (second, second_created): (&'static String, _) =
            REGISTRY.get_or_insert_with(TypeId::of::<u8>(), TypeId::of::<u16>(), init);

        assert!(core::ptr::eq(first, second));
        assert!(first_created);
        assert!(!second_created);
        assert_eq!(first, "value");
        assert_eq!(CALLS.load(Ordering::Relaxed), 1);
        assert_eq!(REGISTRY.len(), 1);
    }

    #[test]
    fn test_registry_keys_are_distinct() {
        static REGISTRY: Registry = Registry::new();

        let (u8_id, u16_id) = (TypeId::of::<u8>(), TypeId::of::<u16>());
        let (a, _): (&'static u32, _) = REGISTRY.get_or_insert_with(u8_id, u16_id, || 1);
        let (b, _): (&'static u32, _) = REGISTRY.get_or_insert_with(u16_id, u8_id, || 2);
        let (c, _): (&'static u64, _) = REGISTRY.get_or_insert_with(u8_id, u16_id, || 3);

        assert_eq!((*a, *b, *c), (1, 2, 3));
        assert_eq!(REGISTRY.len(), 3);
    }

    #[test]
    fn test_registry_empty() {
        static REGISTRY: Registry = Registry::new();
        assert_eq!(REGISTRY.len(), 0);

        let values: Vec<(&'static usize, bool)> = (0..4)
            .map(|i| REGISTRY.get_or_insert_with(TypeId::of::<()>(), TypeId::of::<()>(), || i))
            .collect();
        assert!(values.iter().all(|(value, _)| **value == 0));
        assert_eq!(values.iter().filter(|(_, created)| *created).count(), 1);
        assert_eq!(REGISTRY.len(), 1);
    }

    #[test]
    fn test_registry_usable_after_creation() {
        static REGISTRY: Registry = Registry::new();

        let (u8_id, u16_id) = (TypeId::of::<u8>(), TypeId::of::<u16>());
        let (outer, created): (&'static u8, _) = REGISTRY.get_or_insert_with(u8_id, u16_id, || 1);
        assert!(created);

        // A caller reacting to the creation can use the registry again.
        let (inner, _): (&'static u8, _) = REGISTRY.get_or_insert_with(u16_id, u8_id, || *outer + 1);
        assert_eq!(*inner, 2);
        assert_eq!(REGISTRY.len(), 2);
    }
}
