//! The lock guarding a [`Registry`](super::Registry).
//!
//! With the `std` feature this is [`std::sync::RwLock`], otherwise a spin
//! lock from [`spin`], so the caches also work in `no_std` builds.

#[cfg(feature = "std")]
use std::sync as impl_;

#[cfg(not(feature = "std"))]
use spin as impl_;

/// A lazily initialized value behind a reader-writer lock, usable in a
/// `static`.
#[repr(transparent)]
pub(crate) struct CacheLock<T: 'static + Send + Sync>(impl_::RwLock<Option<T>>);

impl<T: 'static + Send + Sync> CacheLock<T> {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self(impl_::RwLock::new(None))
    }

    /// Runs `f` with shared access. `f` receives `None` until the first
    /// [`CacheLock::update`] has initialized the value.
    #[inline]
    pub(crate) fn inspect<R>(&'static self, f: impl FnOnce(Option<&T>) -> R) -> R {
        #[cfg(not(feature = "std"))]
        let guard = self.0.read();

        // Entries are inserted fully constructed, so a poisoned lock still
        // guards a consistent map.
        #[cfg(feature = "std")]
        let guard = self.0.read().unwrap_or_else(impl_::PoisonError::into_inner);

        f(guard.as_ref())
    }

    /// Runs `f` with exclusive access, initializing the value with `init`
    /// first if needed.
    #[inline]
    pub(crate) fn update<R>(
        &'static self,
        init: impl FnOnce() -> T,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        #[cfg(not(feature = "std"))]
        let mut guard = self.0.write();

        #[cfg(feature = "std")]
        let mut guard = self
            .0
            .write()
            .unwrap_or_else(impl_::PoisonError::into_inner);

        f(guard.get_or_insert_with(init))
    }
}
