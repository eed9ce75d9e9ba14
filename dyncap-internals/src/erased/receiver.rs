//! Receivers handed to capability implementations.
//!
//! A receiver is an [`ErasedPtr`] plus a lifetime brand. Both receiver types
//! are invariant in their lifetime, which means the compiler will neither
//! shorten nor lengthen it. The adaptor ([`Impl<O>`]) requires the receiver's
//! lifetime to equal the lifetime of its own borrow, so a receiver that was
//! created for one call cannot be smuggled into a different call.
//!
//! [`Impl<O>`]: crate::adaptor::Impl

use core::marker::PhantomData;

use crate::erased::raw::ErasedPtr;

/// The read-only receiver of a capability operation.
///
/// This is the `self` of an operation that only needs `&O`. It can be copied
/// freely within the call it was created for.
///
/// # Safety
///
/// The following safety invariants are guaranteed to be upheld as long as this
/// struct exists:
///
/// 1. The address points to a live object that is not mutated for the entire
///    lifetime `'a`.
/// 2. The receiver is only ever re-typed through the [`Impl<O>`] whose `O` is
///    the type of that object.
///
/// [`Impl<O>`]: crate::adaptor::Impl
#[derive(Clone, Copy)]
pub struct SelfRef<'a> {
    /// Address of the object
    ptr: ErasedPtr,

    /// Invariant lifetime brand
    _brand: PhantomData<fn(&'a ()) -> &'a ()>,
}

impl<'a> SelfRef<'a> {
    /// Wraps an address. See [`ErasedPtr::as_self_ref`] for the requirements.
    #[inline]
    pub(crate) fn new(ptr: ErasedPtr) -> Self {
        Self {
            ptr,
            _brand: PhantomData,
        }
    }

    /// Returns the erased address behind this receiver.
    #[inline]
    pub fn erased(self) -> ErasedPtr {
        self.ptr
    }
}

impl core::fmt::Debug for SelfRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("SelfRef").field(&self.ptr).finish()
    }
}

/// The mutable receiver of a capability operation.
///
/// This is the `self` of an operation that needs `&mut O`. Unlike [`SelfRef`]
/// it cannot be copied, so a single call can hold at most one `&mut O` derived
/// from it. It can be downgraded with [`SelfMut::into_ref`].
///
/// # Safety
///
/// The following safety invariants are guaranteed to be upheld as long as this
/// struct exists:
///
/// 1. The address points to a live object that is not accessed through any
///    other path for the entire lifetime `'a`.
/// 2. The receiver is only ever re-typed through the [`Impl<O>`] whose `O` is
///    the type of that object.
///
/// [`Impl<O>`]: crate::adaptor::Impl
pub struct SelfMut<'a> {
    /// Address of the object
    ptr: ErasedPtr,

    /// Invariant lifetime brand, and the same non-`Copy` behavior as
    /// `&'a mut ()`
    _brand: PhantomData<(fn(&'a ()) -> &'a (), &'a mut ())>,
}

impl<'a> SelfMut<'a> {
    /// Wraps an address. See [`ErasedPtr::as_self_mut`] for the requirements.
    #[inline]
    pub(crate) fn new(ptr: ErasedPtr) -> Self {
        Self {
            ptr,
            _brand: PhantomData,
        }
    }

    /// Gives up mutable access and returns a read-only receiver with the same
    /// brand.
    #[inline]
    pub fn into_ref(self) -> SelfRef<'a> {
        SelfRef::new(self.ptr)
    }

    /// Returns the erased address behind this receiver.
    #[inline]
    pub fn erased(&self) -> ErasedPtr {
        self.ptr
    }
}

impl<'a> From<SelfMut<'a>> for SelfRef<'a> {
    #[inline]
    fn from(value: SelfMut<'a>) -> Self {
        value.into_ref()
    }
}

impl core::fmt::Debug for SelfMut<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("SelfMut").field(&self.ptr).finish()
    }
}
