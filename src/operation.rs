//! Operation selectors and direct invocation.
//!
//! A call through a handle names the operation with a *selector*, which is
//! normally the path of a capability method on the trait object type:
//!
//! ```
//! # use dyncap::{Caps, DynRef, Impl, SelfRef, capability};
//! capability! {
//!     pub trait Scale {
//!         fn scaled(&self, this: SelfRef, factor: u32) -> u32;
//!     }
//! }
//!
//! impl Scale for Impl<u32> {
//!     fn scaled<'this>(&'this self, this: SelfRef<'this>, factor: u32) -> u32 {
//!         self.instance(this) * factor
//!     }
//! }
//!
//! let handle: DynRef<'_, Caps![Scale]> = DynRef::new(&21u32);
//! assert_eq!(handle.call(<dyn Scale>::scaled, (2,)), 42);
//! ```
//!
//! The arguments after the receiver are passed as a tuple. Selectors whose
//! receiver is [`SelfRef`] have [`Shared`] access and can be called through
//! every handle; selectors whose receiver is [`SelfMut`] have [`Exclusive`]
//! access and are rejected by read-only handles:
//!
//! ```compile_fail
//! # use dyncap::{Caps, DynRef, Impl, SelfMut, capability};
//! capability! {
//!     pub trait Reset {
//!         fn reset(&self, this: SelfMut);
//!     }
//! }
//!
//! impl Reset for Impl<u32> {
//!     fn reset<'this>(&'this self, this: SelfMut<'this>) {
//!         *self.instance_mut(this) = 0;
//!     }
//! }
//!
//! let value = 5u32;
//! let handle: DynRef<'_, Caps![Reset]> = DynRef::new(&value);
//! handle.call(<dyn Reset>::reset, ());
//! ```
//!
//! The functions [`invoke`] and [`invoke_mut`] call an operation on a typed
//! value directly, using the same cached implementation that a handle would
//! use.

use dyncap_internals::{ErasedPtr, SelfMut, SelfRef};

use crate::{ImplementedFor, cache};

mod sealed {
    pub trait Sealed: 'static {}

    impl Sealed for super::Shared {}
    impl Sealed for super::Exclusive {}
}

/// Marker for operations that only read the object.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Shared;

/// Marker for operations that may modify the object.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Exclusive;

/// The access an operation needs to its object.
///
/// This trait is sealed and implemented for [`Shared`] and [`Exclusive`].
pub trait Access: sealed::Sealed {
    /// The receiver the operation is called with.
    type Receiver<'c>;

    /// Creates the receiver for one call.
    ///
    /// # Safety
    ///
    /// The same requirements as [`ErasedPtr::as_self_ref`] (for [`Shared`])
    /// or [`ErasedPtr::as_self_mut`] (for [`Exclusive`]) apply.
    #[doc(hidden)]
    unsafe fn receiver<'c>(ptr: ErasedPtr) -> Self::Receiver<'c>;
}

impl Access for Shared {
    type Receiver<'c> = SelfRef<'c>;

    #[inline]
    unsafe fn receiver<'c>(ptr: ErasedPtr) -> SelfRef<'c> {
        // SAFETY: Guaranteed by the caller.
        unsafe { ptr.as_self_ref() }
    }
}

impl Access for Exclusive {
    type Receiver<'c> = SelfMut<'c>;

    #[inline]
    unsafe fn receiver<'c>(ptr: ErasedPtr) -> SelfMut<'c> {
        // SAFETY: Guaranteed by the caller.
        unsafe { ptr.as_self_mut() }
    }
}

/// An operation of capability `C` with access `M` and arguments `Args`.
///
/// This is implemented for every function or closure that takes `&C`, the
/// receiver of `M` and up to eight further arguments, and that works for
/// any lifetime of the receiver. Capability methods named through the trait
/// object type (`<dyn Print>::print`) are such functions.
pub trait Operation<C: ?Sized, M: Access, Args> {
    /// The result of the operation.
    type Output;

    /// Runs the operation.
    fn invoke<'c>(self, capability: &'c C, this: M::Receiver<'c>, args: Args) -> Self::Output;
}

macro_rules! impl_operation {
    ($($arg:ident: $ty:ident),*) => {
        impl<C, F, R, $($ty),*> Operation<C, Shared, ($($ty,)*)> for F
        where
            C: ?Sized,
            F: for<'c> FnOnce(&'c C, SelfRef<'c> $(, $ty)*) -> R,
        {
            type Output = R;

            #[inline]
            fn invoke<'c>(self, capability: &'c C, this: SelfRef<'c>, ($($arg,)*): ($($ty,)*)) -> R {
                self(capability, this $(, $arg)*)
            }
        }

        impl<C, F, R, $($ty),*> Operation<C, Exclusive, ($($ty,)*)> for F
        where
            C: ?Sized,
            F: for<'c> FnOnce(&'c C, SelfMut<'c> $(, $ty)*) -> R,
        {
            type Output = R;

            #[inline]
            fn invoke<'c>(self, capability: &'c C, this: SelfMut<'c>, ($($arg,)*): ($($ty,)*)) -> R {
                self(capability, this $(, $arg)*)
            }
        }
    };
}

impl_operation!();
impl_operation!(a1: A1);
impl_operation!(a1: A1, a2: A2);
impl_operation!(a1: A1, a2: A2, a3: A3);
impl_operation!(a1: A1, a2: A2, a3: A3, a4: A4);
impl_operation!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
impl_operation!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
impl_operation!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);
impl_operation!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7, a8: A8);

/// Calls a read-only operation on a typed value, without a handle.
///
/// This uses the same cached implementation of `C` for `O` that a handle over
/// `object` would dispatch to.
///
/// # Examples
///
/// ```
/// use dyncap::{Impl, SelfRef, capability, invoke};
///
/// capability! {
///     pub trait Print {
///         fn print(&self, this: SelfRef) -> String;
///     }
/// }
///
/// impl Print for Impl<bool> {
///     fn print<'this>(&'this self, this: SelfRef<'this>) -> String {
///         if *self.instance(this) { "yes" } else { "no" }.to_string()
///     }
/// }
///
/// assert_eq!(invoke(<dyn Print>::print, &true, ()), "yes");
/// ```
pub fn invoke<C, O, F, Args>(operation: F, object: &O, args: Args) -> F::Output
where
    C: ?Sized + ImplementedFor<O>,
    O: 'static,
    F: Operation<C, Shared, Args>,
{
    let capability = cache::implementation::<C, O>();

    // SAFETY:
    // 1. `object` is borrowed for the whole call and only read.
    // 2. The receiver is passed to the implementation of `C` for `O`.
    let this = unsafe { Shared::receiver(ErasedPtr::from_ref(object)) };

    operation.invoke(capability, this, args)
}

/// Calls any operation on a typed value, without a handle.
///
/// Like [`invoke`], but the value is borrowed mutably, so operations with
/// [`Exclusive`] access can be called as well.
///
/// # Examples
///
/// ```
/// use dyncap::{Impl, SelfMut, capability, invoke_mut};
///
/// capability! {
///     pub trait Reset {
///         fn reset(&self, this: SelfMut);
///     }
/// }
///
/// impl Reset for Impl<Vec<u8>> {
///     fn reset<'this>(&'this self, this: SelfMut<'this>) {
///         self.instance_mut(this).clear();
///     }
/// }
///
/// let mut bytes = vec![1, 2, 3];
/// invoke_mut(<dyn Reset>::reset, &mut bytes, ());
/// assert!(bytes.is_empty());
/// ```
pub fn invoke_mut<C, O, M, F, Args>(operation: F, object: &mut O, args: Args) -> F::Output
where
    C: ?Sized + ImplementedFor<O>,
    O: 'static,
    M: Access,
    F: Operation<C, M, Args>,
{
    let capability = cache::implementation::<C, O>();

    // SAFETY:
    // 1. `object` is borrowed exclusively for the whole call.
    // 2. The receiver is passed to the implementation of `C` for `O`.
    let this = unsafe { M::receiver(ErasedPtr::from_mut(object)) };

    operation.invoke(capability, this, args)
}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec::Vec};

    use dyncap_internals::Impl;

    use super::*;

    crate::capability! {
        trait Text {
            fn len(&self, this: SelfRef) -> usize;
            fn push(&self, this: SelfMut, ch: char);
            fn splice(&self, this: SelfMut, at: usize, text: &'static str, times: usize) -> usize;
        }
    }

    impl Text for Impl<String> {
        fn len<'this>(&'this self, this: SelfRef<'this>) -> usize {
            self.instance(this).len()
        }

        fn push<'this>(&'this self, this: SelfMut<'this>, ch: char) {
            self.instance_mut(this).push(ch);
        }

        fn splice<'this>(
            &'this self,
            this: SelfMut<'this>,
            at: usize,
            text: &'static str,
            times: usize,
        ) -> usize {
            let value = self.instance_mut(this);
            for _ in 0..times {
                value.insert_str(at, text);
            }
            value.len()
        }
    }

    #[test]
    fn test_invoke_shared() {
        let value = String::from("abc");
        assert_eq!(invoke(<dyn Text>::len, &value, ()), 3);
    }

    #[test]
    fn test_invoke_mut_with_arguments() {
        let mut value = String::from("ad");
        invoke_mut(<dyn Text>::push, &mut value, ('!',));
        assert_eq!(value, "ad!");

        let len = invoke_mut(<dyn Text>::splice, &mut value, (1, "bc", 2));
        assert_eq!(value, "abcbcd!");
        assert_eq!(len, 7);

        assert_eq!(invoke_mut(<dyn Text>::len, &mut value, ()), 7);
    }

    #[test]
    fn test_operation_from_function() {
        fn twice<'c>(capability: &'c (dyn Text + 'static), this: SelfMut<'c>, ch: char) -> usize {
            let this = this.into_ref();
            capability.len(this) * 2 + usize::from(ch == 'x')
        }

        let mut value = String::from("abcd");
        assert_eq!(invoke_mut(twice, &mut value, ('x',)), 9);
        let lengths: Vec<usize> = ['a', 'x']
            .into_iter()
            .map(|ch| invoke_mut(twice, &mut value, (ch,)))
            .collect();
        assert_eq!(lengths, [8, 9]);
    }
}
