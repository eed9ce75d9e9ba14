use core::fmt;

use dyncap_internals::ErasedPtr;

use crate::{
    Capability, DispatchTable,
    operation::{Operation, Shared},
    set::{Bind, CapabilitySet, Lookup, Subset},
};

/// Keeps the fields of [`DynRef`] private to the constructor and accessors.
///
/// FIXME: Turn `ptr` and `table` into unsafe fields once rust-lang/rust#132922
/// is stable, and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use dyncap_internals::ErasedPtr;

    use crate::{DispatchTable, set::CapabilitySet};

    /// A read-only reference to a value of some type that implements every
    /// capability of `S`.
    ///
    /// This is the capability counterpart of `&'a dyn Trait`: it is `Copy`,
    /// borrows the value for `'a`, and only allows operations with
    /// [`Shared`](crate::operation::Shared) access.
    ///
    /// # Examples
    ///
    /// ```
    /// use dyncap::{Caps, DynRef, Impl, SelfRef, capability};
    ///
    /// capability! {
    ///     pub trait Print {
    ///         fn print(&self, this: SelfRef) -> String;
    ///     }
    /// }
    ///
    /// impl<O: ToString + 'static> Print for Impl<O> {
    ///     fn print<'this>(&'this self, this: SelfRef<'this>) -> String {
    ///         self.instance(this).to_string()
    ///     }
    /// }
    ///
    /// let number = 2;
    /// let handle: DynRef<'_, Caps![Print]> = DynRef::new(&number);
    /// let copy = handle;
    /// assert_eq!(handle.call(<dyn Print>::print, ()), "2");
    /// assert_eq!(copy.call(<dyn Print>::print, ()), "2");
    /// ```
    ///
    /// Only capabilities of `S` can be called:
    ///
    /// ```compile_fail
    /// use dyncap::{Caps, DynRef, Impl, SelfRef, capability};
    ///
    /// capability! {
    ///     pub trait Print {
    ///         fn print(&self, this: SelfRef) -> String;
    ///     }
    /// }
    ///
    /// capability! {
    ///     pub trait Size {
    ///         fn size(&self, this: SelfRef) -> usize;
    ///     }
    /// }
    ///
    /// impl Print for Impl<String> {
    ///     fn print<'this>(&'this self, this: SelfRef<'this>) -> String {
    ///         self.instance(this).clone()
    ///     }
    /// }
    ///
    /// impl Size for Impl<String> {
    ///     fn size<'this>(&'this self, this: SelfRef<'this>) -> usize {
    ///         self.instance(this).len()
    ///     }
    /// }
    ///
    /// let text = String::new();
    /// let handle: DynRef<'_, Caps![Print]> = DynRef::new(&text);
    /// handle.call(<dyn Size>::size, ());
    /// ```
    // # Safety invariants
    //
    // This reference behaves like a `&'a O` for the unknown `O` the table was
    // built for, and upholds the usual safety invariants of shared references:
    //
    // 1. The pointee is properly initialized for the entire lifetime `'a`.
    // 2. The pointee is not mutated for the entire lifetime `'a`.
    pub struct DynRef<'a, S: CapabilitySet> {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. The address was erased from an `O` that is alive and not
        ///    mutated for the entire lifetime `'a`.
        /// 2. `table` was built for the same `O`.
        ptr: ErasedPtr,
        table: &'static DispatchTable<S>,
        _marker: PhantomData<&'a ()>,
    }

    impl<'a, S: CapabilitySet> DynRef<'a, S> {
        /// Creates a new handle from its parts.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. `ptr` was erased from an object of the type `table` was built
        ///    for.
        /// 2. The object is alive and not mutated for the entire lifetime
        ///    `'a`.
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
        ///
        /// All handles with the same capability set over values of the same
        /// type return the same table.
        pub fn table(&self) -> &'static DispatchTable<S> {
            self.table
        }
    }

    impl<S: CapabilitySet> Clone for DynRef<'_, S> {
        fn clone(&self) -> Self {
            *self
        }
    }

    impl<S: CapabilitySet> Copy for DynRef<'_, S> {}
}

pub use limit_field_access::DynRef;

impl<'a, S: CapabilitySet> DynRef<'a, S> {
    /// Creates a handle for `object`.
    ///
    /// The first handle for a given `(S, O)` pair creates the dispatch table;
    /// every later one reuses it without allocating.
    #[must_use]
    pub fn new<O: 'static>(object: &'a O) -> Self
    where
        S: Bind<O>,
    {
        let table = DispatchTable::<S>::of::<O>();

        // SAFETY:
        // 1. The address is erased from an `O` and the table was built for `O`.
        // 2. `object` is borrowed immutably for `'a`.
        unsafe { Self::from_raw(ErasedPtr::from_ref(object), table) }
    }

    /// Calls a read-only operation of one of the capabilities of `S`.
    ///
    /// `operation` is a selector such as `<dyn Print>::print` and `args` holds
    /// the remaining arguments as a tuple. The result of the implementation is
    /// returned unchanged.
    pub fn call<C, I, F, Args>(&self, operation: F, args: Args) -> F::Output
    where
        C: ?Sized + Capability,
        S: Lookup<C, I>,
        F: Operation<C, Shared, Args>,
    {
        // SAFETY:
        // 1. The address and the table were built for the same type.
        // 2. The object is borrowed immutably for `'a`, which outlives `&self`.
        unsafe {
            self.table()
                .dispatch::<C, I, Shared, F, Args>(self.ptr(), operation, args)
        }
    }

    /// Restricts the handle to a subset of its capabilities.
    ///
    /// The narrower table is cached and shares the implementations of this
    /// one.
    #[must_use]
    pub fn narrow<Sub, Idx>(self) -> DynRef<'a, Sub>
    where
        Sub: Subset<S, Idx>,
    {
        let table = self.table().subset::<Sub, Idx>();

        // SAFETY:
        // 1. The subset table was built for the same type as this handle's table.
        // 2. Guaranteed by the invariants of `self`.
        unsafe { DynRef::from_raw(self.ptr(), table) }
    }

    /// Returns the name of the type of the referenced value.
    pub fn object_type_name(&self) -> &'static str {
        self.table().object_type_name()
    }
}

impl<'a, O: 'static, S: Bind<O>> From<&'a O> for DynRef<'a, S> {
    fn from(object: &'a O) -> Self {
        DynRef::new(object)
    }
}

impl<S: CapabilitySet> fmt::Debug for DynRef<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynRef")
            .field("object", &self.object_type_name())
            .finish_non_exhaustive()
    }
}
