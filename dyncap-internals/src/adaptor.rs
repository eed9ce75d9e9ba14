//! The implementation adaptor.
//!
//! [`Impl<O>`] is a zero-sized value that stands for "the implementation of
//! every capability for objects of type `O`". Capability traits are
//! implemented for `Impl<O>` instead of `O` itself, and the methods receive
//! the object as an erased receiver. Inside such a method,
//! [`Impl::instance`] and [`Impl::instance_mut`] recover the typed object.
//!
//! # Safety Invariant
//!
//! Creating an `Impl<O>` is `unsafe`: whoever creates one promises that every
//! receiver that reaches it was created from an `O`. The dispatch tables in
//! `dyncap` are the only intended creator, and they uphold the promise by
//! building every table entry from the same `O` that the handle's address was
//! erased from.

use core::{marker::PhantomData, ptr::NonNull};

use crate::erased::{SelfMut, SelfRef};

/// Implementation of capabilities for objects of type `O`.
///
/// This type is zero-sized and carries no data. It exists so that a
/// capability method has a `self` that identifies `O` statically while the
/// receiver only carries an erased address.
///
/// `Impl<O>` is neither `Clone` nor `Copy`. Inside a capability method the
/// only adaptor reachable is the `&'this self` handed out with the receiver,
/// so no adaptor for another type can be paired with that receiver.
///
/// ```
/// use dyncap_internals::{ErasedPtr, Impl, SelfRef};
///
/// trait Describe {
///     fn describe<'this>(&'this self, this: SelfRef<'this>) -> usize;
/// }
///
/// impl Describe for Impl<String> {
///     fn describe<'this>(&'this self, this: SelfRef<'this>) -> usize {
///         self.instance(this).len()
///     }
/// }
///
/// let text = String::from("hello");
/// // SAFETY: every receiver passed to this adaptor comes from a `String`
/// let implementation = unsafe { Impl::<String>::new() };
/// // SAFETY: `text` outlives the call and is only read
/// let receiver = unsafe { ErasedPtr::from_ref(&text).as_self_ref() };
/// assert_eq!(implementation.describe(receiver), 5);
/// ```
pub struct Impl<O> {
    /// Marker for the object type. `fn() -> O` keeps `Impl<O>` `Send`, `Sync`
    /// and zero-sized regardless of `O`.
    _object: PhantomData<fn() -> O>,
}

impl<O: 'static> Impl<O> {
    /// Creates the adaptor for `O`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Every [`SelfRef`] or [`SelfMut`] passed to a method of the returned
    ///    value (or to any copy of it) was created from an address of an `O`.
    #[inline]
    pub const unsafe fn new() -> Self {
        Self {
            _object: PhantomData,
        }
    }

    /// Returns the object behind a read-only receiver.
    ///
    /// The receiver must carry the same brand as the borrow of `self`, which
    /// ties the returned reference to the current call.
    #[inline]
    #[track_caller]
    pub fn instance<'a>(&'a self, this: SelfRef<'a>) -> &'a O {
        let ptr = this.erased().cast::<O>();

        // SAFETY:
        // 1. Guaranteed by the safety requirements of `Impl::new`, the address was
        //    created from an `O`.
        // 2. Guaranteed by the invariants of `SelfRef`, the object is alive and not
        //    mutated for `'a`.
        unsafe {
            // @add-unsafe-context: ErasedPtr
            ptr.as_ref()
        }
    }

    /// Returns the object behind a mutable receiver.
    ///
    /// The receiver is consumed, so at most one `&mut O` exists per receiver.
    #[inline]
    #[track_caller]
    pub fn instance_mut<'a>(&'a self, this: SelfMut<'a>) -> &'a mut O {
        let mut ptr = self.instance_ptr(this);

        // SAFETY:
        // 1. Guaranteed by the safety requirements of `Impl::new`, the address was
        //    created from an `O`.
        // 2. Guaranteed by the invariants of `SelfMut`, the object is alive and not
        //    accessed through any other path for `'a`.
        // 3. The receiver was consumed, so no other `&mut O` can be made from it.
        unsafe {
            // @add-unsafe-context: ErasedPtr
            ptr.as_mut()
        }
    }

    /// Returns the raw address of the object behind a mutable receiver.
    ///
    /// This is used by the owning handle to rebuild the `Box<O>` it was
    /// created from.
    #[inline]
    #[track_caller]
    pub fn instance_ptr<'a>(&'a self, this: SelfMut<'a>) -> NonNull<O> {
        this.erased().cast::<O>()
    }
}

impl<O> core::fmt::Debug for Impl<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Impl<{}>", core::any::type_name::<O>())
    }
}

#[cfg(test)]
mod tests {
    use alloc::{boxed::Box, string::String};

    use super::*;
    use crate::erased::ErasedPtr;

    static_assertions::assert_impl_all!(Impl<*const u8>: Send, Sync);
    static_assertions::assert_impl_all!(Impl<core::cell::Cell<u8>>: Send, Sync);
    static_assertions::assert_not_impl_any!(Impl<u8>: Copy, Clone, Default);

    #[test]
    fn test_impl_is_zero_sized() {
        assert_eq!(core::mem::size_of::<Impl<String>>(), 0);
        assert_eq!(core::mem::size_of::<Impl<[u64; 32]>>(), 0);
    }

    #[test]
    fn test_impl_instance() {
        let value = String::from("abc");
        // SAFETY: only receivers created from `String`s reach the adaptor
        let implementation = unsafe { Impl::<String>::new() };
        // SAFETY: `value` outlives the receiver and is only read
        let receiver = unsafe { ErasedPtr::from_ref(&value).as_self_ref() };
        assert_eq!(implementation.instance(receiver), "abc");
    }

    #[test]
    fn test_impl_instance_mut() {
        let mut value = String::from("abc");
        // SAFETY: only receivers created from `String`s reach the adaptor
        let implementation = unsafe { Impl::<String>::new() };
        // SAFETY: `value` outlives the receiver and is not otherwise accessed
        let receiver = unsafe { ErasedPtr::from_mut(&mut value).as_self_mut() };
        implementation.instance_mut(receiver).push('d');
        assert_eq!(value, "abcd");
    }

    #[test]
    fn test_impl_instance_ptr_rebuilds_box() {
        let erased = ErasedPtr::from_box(Box::new(String::from("owned")));
        // SAFETY: only receivers created from `String`s reach the adaptor
        let implementation = unsafe { Impl::<String>::new() };
        // SAFETY: the box is exclusively owned by `erased`
        let receiver = unsafe { erased.as_self_mut() };
        let ptr = implementation.instance_ptr(receiver);
        // SAFETY: `ptr` came from `Box::into_raw` and is reconstructed once
        let boxed = unsafe { Box::from_raw(ptr.as_ptr()) };
        assert_eq!(*boxed, "owned");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not its original type")]
    fn test_impl_detects_wrong_type_in_debug() {
        let value = 1u32;
        // SAFETY: intentionally violated; the debug tag catches it before the
        // address is read
        let implementation = unsafe { Impl::<String>::new() };
        // SAFETY: `value` outlives the receiver and is only read
        let receiver = unsafe { ErasedPtr::from_ref(&value).as_self_ref() };
        let _ = implementation.instance(receiver);
    }
}
