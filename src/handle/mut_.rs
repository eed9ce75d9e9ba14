use core::fmt;

use dyncap_internals::ErasedPtr;

use crate::{
    Capability, DispatchTable, DynRef,
    operation::{Access, Operation},
    set::{Bind, CapabilitySet, Lookup, Subset},
};

/// Keeps the fields of [`DynMut`] private to the constructor and accessors.
///
/// FIXME: Turn `ptr` and `table` into unsafe fields once rust-lang/rust#132922
/// is stable, and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use dyncap_internals::ErasedPtr;

    use crate::{DispatchTable, set::CapabilitySet};

    /// A mutable reference to a value of some type that implements every
    /// capability of `S`.
    ///
    /// This is the capability counterpart of `&'a mut dyn Trait`. It allows
    /// operations with either access mode, and can be turned into a [`DynRef`]
    /// that sees the same value.
    ///
    /// [`DynRef`]: crate::DynRef
    ///
    /// # Examples
    ///
    /// ```
    /// use dyncap::{Caps, DynMut, DynRef, Impl, SelfMut, SelfRef, capability};
    ///
    /// capability! {
    ///     pub trait Print {
    ///         fn print(&self, this: SelfRef) -> String;
    ///     }
    /// }
    ///
    /// capability! {
    ///     pub trait Reset {
    ///         fn reset(&self, this: SelfMut);
    ///     }
    /// }
    ///
    /// impl<O: ToString + 'static> Print for Impl<O> {
    ///     fn print<'this>(&'this self, this: SelfRef<'this>) -> String {
    ///         self.instance(this).to_string()
    ///     }
    /// }
    ///
    /// impl<O: Default + 'static> Reset for Impl<O> {
    ///     fn reset<'this>(&'this self, this: SelfMut<'this>) {
    ///         *self.instance_mut(this) = O::default();
    ///     }
    /// }
    ///
    /// let mut number = 1;
    /// let mut handle: DynMut<'_, Caps![Print, Reset]> = DynMut::new(&mut number);
    /// assert_eq!(handle.call(<dyn Print>::print, ()), "1");
    ///
    /// handle.call(<dyn Reset>::reset, ());
    /// let view: DynRef<'_, Caps![Print, Reset]> = handle.into_ref();
    /// assert_eq!(view.call(<dyn Print>::print, ()), "0");
    /// assert_eq!(number, 0);
    /// ```
    // # Safety invariants
    //
    // This reference behaves like a `&'a mut O` for the unknown `O` the table
    // was built for, and upholds the usual safety invariants of mutable
    // references:
    //
    // 1. The pointee is properly initialized for the entire lifetime `'a`.
    // 2. The pointee is not aliased for the entire lifetime `'a`.
    // 3. Like a `&'a mut T`, it is possible to reborrow this reference to a
    //    shorter lifetime. The borrow checker will ensure that original longer
    //    lifetime is not used while the shorter lifetime exists.
    pub struct DynMut<'a, S: CapabilitySet> {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. The address was erased with [`ErasedPtr::from_mut`] or
        ///    [`ErasedPtr::from_box`] from an `O` that is alive and only
        ///    reachable through this handle for the entire lifetime `'a`.
        /// 2. `table` was built for the same `O`.
        ptr: ErasedPtr,
        table: &'static DispatchTable<S>,
        _marker: PhantomData<&'a mut ()>,
    }

    impl<'a, S: CapabilitySet> DynMut<'a, S> {
        /// Creates a new handle from its parts.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. `ptr` was erased with [`ErasedPtr::from_mut`] or
        ///    [`ErasedPtr::from_box`] from an object of the type `table` was
        ///    built for.
        /// 2. The object is alive and only reachable through the returned
        ///    handle for the entire lifetime `'a`.
        #[must_use]
        pub(crate) unsafe fn from_raw(ptr: ErasedPtr, table: &'static DispatchTable<S>) -> Self {
            // SAFETY: We must uphold the safety invariants of the fields:
            // 1. Guaranteed by our caller
            // 2. Guaranteed by our caller
            Self {
                ptr,
                table,
                _marker: PhantomData,
            }
        }

        /// Returns the erased address.
        pub(crate) fn ptr(&self) -> ErasedPtr {
            self.ptr
        }

        /// Returns the dispatch table of this handle.
        pub fn table(&self) -> &'static DispatchTable<S> {
            self.table
        }
    }
}

pub use limit_field_access::DynMut;

impl<'a, S: CapabilitySet> DynMut<'a, S> {
    /// Creates a handle for `object`.
    #[must_use]
    pub fn new<O: 'static>(object: &'a mut O) -> Self
    where
        S: Bind<O>,
    {
        let table = DispatchTable::<S>::of::<O>();

        // SAFETY:
        // 1. The address is erased with `from_mut` from an `O`, and the table was
        //    built for `O`.
        // 2. `object` is borrowed mutably for `'a`.
        unsafe { Self::from_raw(ErasedPtr::from_mut(object), table) }
    }

    /// Calls an operation of one of the capabilities of `S`.
    ///
    /// Both read-only and mutating operations are accepted. The result of the
    /// implementation is returned unchanged.
    pub fn call<C, I, M, F, Args>(&mut self, operation: F, args: Args) -> F::Output
    where
        C: ?Sized + Capability,
        S: Lookup<C, I>,
        M: Access,
        F: Operation<C, M, Args>,
    {
        // SAFETY:
        // 1. The address and the table were built for the same type.
        // 2. The address was erased with `from_mut` or `from_box`, and `&mut self`
        //    guarantees that nothing else reaches the object during the call.
        unsafe {
            self.table()
                .dispatch::<C, I, M, F, Args>(self.ptr(), operation, args)
        }
    }

    /// Reborrows the handle for a shorter lifetime.
    #[must_use]
    pub fn reborrow(&mut self) -> DynMut<'_, S> {
        // SAFETY:
        // 1. Guaranteed by the invariants of `self`.
        // 2. `self` is borrowed mutably for as long as the result lives.
        unsafe { DynMut::from_raw(self.ptr(), self.table()) }
    }

    /// Returns a read-only handle to the same value, borrowing this one.
    #[must_use]
    pub fn as_ref(&self) -> DynRef<'_, S> {
        // SAFETY:
        // 1. Guaranteed by the invariants of `self`.
        // 2. `self` is borrowed immutably for as long as the result lives, so
        //    the object is not mutated.
        unsafe { DynRef::from_raw(self.ptr(), self.table()) }
    }

    /// Converts into a read-only handle to the same value.
    #[must_use]
    pub fn into_ref(self) -> DynRef<'a, S> {
        // SAFETY:
        // 1. Guaranteed by the invariants of `self`.
        // 2. `self` is consumed, so the object is only reachable through the
        //    result for the rest of `'a`.
        unsafe { DynRef::from_raw(self.ptr(), self.table()) }
    }

    /// Restricts the handle to a subset of its capabilities.
    #[must_use]
    pub fn narrow<Sub, Idx>(self) -> DynMut<'a, Sub>
    where
        Sub: Subset<S, Idx>,
    {
        let table = self.table().subset::<Sub, Idx>();

        // SAFETY:
        // 1. The subset table was built for the same type as this handle's table.
        // 2. `self` is consumed.
        unsafe { DynMut::from_raw(self.ptr(), table) }
    }

    /// Returns the name of the type of the referenced value.
    pub fn object_type_name(&self) -> &'static str {
        self.table().object_type_name()
    }
}

impl<'a, O: 'static, S: Bind<O>> From<&'a mut O> for DynMut<'a, S> {
    fn from(object: &'a mut O) -> Self {
        DynMut::new(object)
    }
}

impl<'a, S: CapabilitySet> From<DynMut<'a, S>> for DynRef<'a, S> {
    fn from(handle: DynMut<'a, S>) -> Self {
        handle.into_ref()
    }
}

impl<S: CapabilitySet> fmt::Debug for DynMut<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynMut")
            .field("object", &self.object_type_name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::{
        format,
        string::{String, ToString},
        vec::Vec,
    };

    use dyncap_internals::{Impl, SelfMut, SelfRef};

    use super::*;
    use crate::Caps;

    crate::capability! {
        trait Print {
            fn print(&self, this: SelfRef) -> String;
        }
    }

    crate::capability! {
        trait Grow {
            fn grow(&self, this: SelfMut, by: usize);
        }
    }

    impl Print for Impl<Vec<u8>> {
        fn print<'this>(&'this self, this: SelfRef<'this>) -> String {
            format!("{:?}", self.instance(this))
        }
    }

    impl Grow for Impl<Vec<u8>> {
        fn grow<'this>(&'this self, this: SelfMut<'this>, by: usize) {
            let value = self.instance_mut(this);
            value.extend(core::iter::repeat_n(0, by));
        }
    }

    impl Print for Impl<String> {
        fn print<'this>(&'this self, this: SelfRef<'this>) -> String {
            self.instance(this).to_string()
        }
    }

    impl Grow for Impl<String> {
        fn grow<'this>(&'this self, this: SelfMut<'this>, by: usize) {
            let value = self.instance_mut(this);
            value.extend(core::iter::repeat_n('.', by));
        }
    }

    static_assertions::assert_not_impl_any!(DynMut<'static, Caps![Print]>: Copy, Clone, Send, Sync);

    #[test]
    fn test_dyn_mut_mutation_is_visible() {
        let mut bytes = Vec::<u8>::new();
        let mut handle: DynMut<'_, Caps![Print, Grow]> = DynMut::new(&mut bytes);

        handle.call(<dyn Grow>::grow, (2,));
        assert_eq!(handle.call(<dyn Print>::print, ()), "[0, 0]");
        assert_eq!(handle.as_ref().call(<dyn Print>::print, ()), "[0, 0]");

        handle.reborrow().call(<dyn Grow>::grow, (1,));
        assert_eq!(handle.into_ref().call(<dyn Print>::print, ()), "[0, 0, 0]");
        assert_eq!(bytes, [0, 0, 0]);
    }

    #[test]
    fn test_dyn_mut_independent_objects() {
        let mut first = String::from("a");
        let mut second = String::from("b");
        let mut handles: [DynMut<'_, Caps![Grow, Print]>; 2] =
            [(&mut first).into(), (&mut second).into()];

        handles[0].call(<dyn Grow>::grow, (3,));
        let printed: Vec<String> = handles
            .iter()
            .map(|handle| handle.as_ref().call(<dyn Print>::print, ()))
            .collect();
        assert_eq!(printed, ["a...", "b"]);
        assert!(core::ptr::eq(handles[0].table(), handles[1].table()));
    }

    #[test]
    fn test_dyn_mut_narrow_and_convert() {
        let mut text = String::from("x");
        let handle: DynMut<'_, Caps![Print, Grow]> = DynMut::new(&mut text);
        let mut narrowed: DynMut<'_, Caps![Grow]> = handle.narrow();
        narrowed.call(<dyn Grow>::grow, (1,));
        assert_eq!(format!("{narrowed:?}"), "DynMut { object: \"alloc::string::String\", .. }");

        let read_only: DynRef<'_, Caps![Grow]> = narrowed.into();
        assert_eq!(read_only.object_type_name(), "alloc::string::String");
        assert_eq!(text, "x.");
    }
}
