//! The type-erased object address.
//!
//! This module encapsulates the `ptr` field of [`ErasedPtr`], ensuring it is
//! only visible within this module. The constructors are the only way to set
//! it, and each of them derives the pointer from a live `&O`, `&mut O` or
//! `Box<O>`, so the pointer always carries the provenance of a real object.
//!
//! # Type Erasure
//!
//! The concrete type `O` is erased by casting to `NonNull<Erased>`. Nothing in
//! an [`ErasedPtr`] remembers `O` in release builds; the dispatch tables that
//! travel next to it are responsible for that. In debug builds the pointer
//! additionally keeps the [`TypeId`] of `O` so that a mismatched re-typing is
//! caught by an assertion instead of silently reading the wrong type.

use alloc::boxed::Box;
use core::{any::TypeId, ptr::NonNull};

use crate::{
    erased::receiver::{SelfMut, SelfRef},
    util::Erased,
};

/// The address of an object of some type `O`, with `O` forgotten.
///
/// An [`ErasedPtr`] does not own or borrow anything by itself. Whoever stores
/// one is responsible for keeping the object alive and for remembering which
/// kind of access (shared, exclusive or owning) the address was created with.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ErasedPtr {
    /// Address of the object
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer was derived from a `&O`, `&mut O` or `Box<O>` for the
    ///    `O` recorded by the constructor.
    /// 2. The pointer is never changed after construction.
    ptr: NonNull<Erased>,

    /// Type of the object the address was created from
    #[cfg(debug_assertions)]
    type_id: TypeId,
}

impl ErasedPtr {
    /// Erases a shared reference.
    ///
    /// Receivers made from the result must only ever be [`SelfRef`]s.
    #[inline]
    pub fn from_ref<O: 'static>(object: &O) -> Self {
        Self {
            ptr: NonNull::from(object).cast::<Erased>(),
            #[cfg(debug_assertions)]
            type_id: TypeId::of::<O>(),
        }
    }

    /// Erases an exclusive reference.
    #[inline]
    pub fn from_mut<O: 'static>(object: &mut O) -> Self {
        Self {
            ptr: NonNull::from(object).cast::<Erased>(),
            #[cfg(debug_assertions)]
            type_id: TypeId::of::<O>(),
        }
    }

    /// Takes ownership of a boxed object and erases its address.
    ///
    /// The allocation is leaked until someone reconstructs the box with
    /// [`Box::from_raw`], which is what the owning handle's deleter does.
    #[inline]
    pub fn from_box<O: 'static>(object: Box<O>) -> Self {
        let ptr: *mut O = Box::into_raw(object);

        // SAFETY: `Box::into_raw` returns a non-null pointer
        let ptr: NonNull<O> = unsafe {
            // @add-unsafe-context: Erased
            NonNull::new_unchecked(ptr)
        };

        Self {
            ptr: ptr.cast::<Erased>(),
            #[cfg(debug_assertions)]
            type_id: TypeId::of::<O>(),
        }
    }

    /// Panics in debug builds when the address was not created from an `O`.
    ///
    /// This is a no-op in release builds.
    #[inline]
    #[track_caller]
    pub fn debug_assert_is<O: 'static>(self) {
        #[cfg(debug_assertions)]
        assert_eq!(
            self.type_id,
            TypeId::of::<O>(),
            "erased address re-typed as `{}`, which is not its original type",
            core::any::type_name::<O>(),
        );
    }

    /// Returns the address cast back to `O`.
    ///
    /// The cast itself is safe; dereferencing the result is only valid when
    /// `O` is the original type.
    #[inline]
    pub(crate) fn cast<O: 'static>(self) -> NonNull<O> {
        self.debug_assert_is::<O>();
        self.ptr.cast::<O>()
    }

    /// Creates a read-only receiver for a single capability call.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The object is alive and not mutated for the entire lifetime `'a`.
    /// 2. The receiver will only be passed to an [`Impl<O>`] whose `O` is the
    ///    type this address was created from.
    ///
    /// [`Impl<O>`]: crate::adaptor::Impl
    #[inline]
    pub unsafe fn as_self_ref<'a>(self) -> SelfRef<'a> {
        SelfRef::new(self)
    }

    /// Creates a mutable receiver for a single capability call.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The address was created with [`ErasedPtr::from_mut`] or
    ///    [`ErasedPtr::from_box`].
    /// 2. The object is alive and not accessed through any other path for the
    ///    entire lifetime `'a`.
    /// 3. The receiver will only be passed to an [`Impl<O>`] whose `O` is the
    ///    type this address was created from.
    ///
    /// [`Impl<O>`]: crate::adaptor::Impl
    #[inline]
    pub unsafe fn as_self_mut<'a>(self) -> SelfMut<'a> {
        SelfMut::new(self)
    }
}

impl core::fmt::Debug for ErasedPtr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Pointer::fmt(&self.ptr, f)
    }
}
