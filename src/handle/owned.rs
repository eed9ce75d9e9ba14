use alloc::boxed::Box;
use core::{
    any::{TypeId, type_name},
    fmt,
};

use dyncap_internals::{Impl, SelfMut};

use crate::{
    Capability, DispatchTable, DynMut, DynRef, ImplementedFor, cache,
    cache::TABLES,
    operation::{Access, Operation},
    set::{Bind, CapabilitySet, Lookup},
};

/// Releases an object that was moved into a [`DynBox`].
///
/// This capability is never part of a capability set. Every [`OwnedTable`]
/// carries it next to the table of the visible capabilities.
pub(crate) trait Delete: Sync {
    /// Drops the object and frees its allocation.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The receiver was created from an address erased with
    ///    [`ErasedPtr::from_box`](dyncap_internals::ErasedPtr::from_box).
    /// 2. The object is not accessed through any path after this call.
    unsafe fn delete<'this>(&'this self, this: SelfMut<'this>);
}

impl Capability for dyn Delete {}

// SAFETY:
// 1. `Delete::delete` for `Impl<O>` only passes its receiver to
//    `Impl::instance_ptr` of the same borrow.
// 2. `coerce` only unsizes the reference.
unsafe impl<O: 'static> ImplementedFor<O> for dyn Delete {
    #[inline]
    fn coerce(implementation: &'static Impl<O>) -> &'static Self {
        implementation
    }
}

impl<O: 'static> Delete for Impl<O> {
    unsafe fn delete<'this>(&'this self, this: SelfMut<'this>) {
        let ptr = self.instance_ptr(this);

        // SAFETY:
        // 1. Guaranteed by the caller, the address came from `Box::into_raw` of a
        //    `Box<O>`, and `Impl<O>` only receives addresses of an `O`.
        // 2. Guaranteed by the caller, the box is rebuilt at most once.
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

/// The dispatch table of an owning handle.
pub(crate) struct OwnedTable<S: CapabilitySet> {
    deleter: &'static dyn Delete,
    table: &'static DispatchTable<S>,
}

impl<S: CapabilitySet> OwnedTable<S> {
    /// Returns the owning table of `S` for objects of type `O`, creating it on
    /// first use.
    ///
    /// The visible part is the same table that [`DispatchTable::of`] returns.
    pub(crate) fn of<O: 'static>() -> &'static Self
    where
        S: Bind<O>,
    {
        let (set, object) = (TypeId::of::<S>(), TypeId::of::<O>());
        if let Some(owned) = TABLES.get(set, object) {
            return owned;
        }

        // Both are looked up before taking the lock of `TABLES` below.
        let table = DispatchTable::<S>::of::<O>();
        let deleter = cache::implementation::<dyn Delete, O>();

        let (owned, created) = TABLES.get_or_insert_with(set, object, || Self { deleter, table });

        if created {
            trace_cache!(
                capabilities = type_name::<S>(),
                object = type_name::<O>(),
                "created owning dispatch table"
            );
        }

        owned
    }
}

/// Keeps the fields of [`DynBox`] private to the constructor, accessors and
/// destructor.
///
/// FIXME: Turn `ptr` and `table` into unsafe fields once rust-lang/rust#132922
/// is stable, and remove this module.
mod limit_field_access {
    use alloc::boxed::Box;

    use dyncap_internals::ErasedPtr;

    use super::OwnedTable;
    use crate::set::{Bind, CapabilitySet};

    /// The address and table of an occupied [`DynBox`].
    pub(super) struct RawBox<S: CapabilitySet> {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. The address was erased with [`ErasedPtr::from_box`] from a
        ///    `Box<O>`.
        /// 2. The object is only reachable through the [`DynBox`] that holds
        ///    this struct.
        /// 3. `table` was built for the same `O`.
        pub(super) ptr: ErasedPtr,
        pub(super) table: &'static OwnedTable<S>,
    }

    impl<S: CapabilitySet> Clone for RawBox<S> {
        fn clone(&self) -> Self {
            *self
        }
    }

    impl<S: CapabilitySet> Copy for RawBox<S> {}

    /// An owning handle to a heap-allocated value of some type that
    /// implements every capability of `S`.
    ///
    /// This is the capability counterpart of `Box<dyn Trait>`. The value is
    /// dropped exactly once, when the handle that owns it is dropped. A
    /// handle can also be *empty*: [`DynBox::default`] creates one, and
    /// [`DynBox::take`] leaves one behind.
    ///
    /// # Examples
    ///
    /// ```
    /// use dyncap::{Caps, DynBox, Impl, SelfRef, capability};
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
    /// let mut greeting: DynBox<Caps![Print]> = DynBox::new(String::from("Hello World!"));
    /// assert_eq!(greeting.call(<dyn Print>::print, ()), "Hello World!");
    ///
    /// let mut moved = greeting.take();
    /// assert!(greeting.is_empty());
    /// assert_eq!(moved.call(<dyn Print>::print, ()), "Hello World!");
    /// ```
    pub struct DynBox<S: CapabilitySet> {
        raw: Option<RawBox<S>>,
    }

    impl<S: CapabilitySet> DynBox<S> {
        /// Moves an existing allocation into a new handle.
        #[must_use]
        pub fn from_box<O: 'static>(object: Box<O>) -> Self
        where
            S: Bind<O>,
        {
            let table = OwnedTable::<S>::of::<O>();

            // SAFETY: We must uphold the safety invariants of the fields:
            // 1. The address is erased with `from_box` from a `Box<O>`.
            // 2. The box was moved into this call, so the object is only
            //    reachable through the new handle.
            // 3. The table was built for `O`.
            Self {
                raw: Some(RawBox {
                    ptr: ErasedPtr::from_box(object),
                    table,
                }),
            }
        }

        /// Creates a handle that owns nothing.
        #[must_use]
        pub const fn empty() -> Self {
            Self { raw: None }
        }

        /// Moves the value out into a new handle, leaving this one empty.
        #[must_use]
        pub fn take(&mut self) -> Self {
            // SAFETY: The object moves along with the raw parts, so it stays
            // reachable through exactly one handle.
            Self {
                raw: self.raw.take(),
            }
        }

        pub(super) fn raw(&self) -> Option<RawBox<S>> {
            self.raw
        }
    }

    impl<S: CapabilitySet> Drop for DynBox<S> {
        fn drop(&mut self) {
            let Some(raw) = self.raw.take() else {
                return;
            };

            // SAFETY:
            // 1. Guaranteed by the invariants of `RawBox`, the address was erased
            //    with `from_box`.
            // 2. The handle is being dropped, so nothing else accesses the object.
            // 3. The receiver is only passed to the deleter of the same table.
            let this = unsafe { raw.ptr.as_self_mut() };

            // SAFETY:
            // 1. Guaranteed by the invariants of `RawBox`, the address was erased
            //    with `from_box`.
            // 2. `raw` was taken out of the handle, so the object cannot be
            //    reached afterwards.
            unsafe { raw.table.deleter.delete(this) };
        }
    }
}

pub use limit_field_access::DynBox;

impl<S: CapabilitySet> DynBox<S> {
    /// Moves `object` to the heap and returns a handle that owns it.
    #[must_use]
    pub fn new<O: 'static>(object: O) -> Self
    where
        S: Bind<O>,
    {
        Self::from_box(Box::new(object))
    }

    /// Returns `true` if the handle owns nothing.
    pub fn is_empty(&self) -> bool {
        self.raw().is_none()
    }

    /// Calls an operation of one of the capabilities of `S`.
    ///
    /// Both read-only and mutating operations are accepted. The result of the
    /// implementation is returned unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the handle is empty.
    #[track_caller]
    pub fn call<C, I, M, F, Args>(&mut self, operation: F, args: Args) -> F::Output
    where
        C: ?Sized + Capability,
        S: Lookup<C, I>,
        M: Access,
        F: Operation<C, M, Args>,
    {
        match self.as_dyn_mut() {
            Some(mut handle) => handle.call(operation, args),
            None => panic!(
                "called `DynBox::call` on an empty `DynBox<{}>`",
                type_name::<S>()
            ),
        }
    }

    /// Borrows the value as a read-only handle, or `None` if empty.
    #[must_use]
    pub fn as_dyn_ref(&self) -> Option<DynRef<'_, S>> {
        let raw = self.raw()?;

        // SAFETY:
        // 1. The address and the table were built for the same type.
        // 2. The object is owned by `self`, which is borrowed immutably for as
        //    long as the result lives.
        Some(unsafe { DynRef::from_raw(raw.ptr, raw.table.table) })
    }

    /// Borrows the value as a mutable handle, or `None` if empty.
    #[must_use]
    pub fn as_dyn_mut(&mut self) -> Option<DynMut<'_, S>> {
        let raw = self.raw()?;

        // SAFETY:
        // 1. The address was erased with `from_box`, and the table was built for
        //    the same type.
        // 2. The object is owned by `self`, which is borrowed mutably for as long
        //    as the result lives.
        Some(unsafe { DynMut::from_raw(raw.ptr, raw.table.table) })
    }

    /// Returns the name of the type of the owned value, or `None` if empty.
    pub fn object_type_name(&self) -> Option<&'static str> {
        self.raw().map(|raw| raw.table.table.object_type_name())
    }
}

impl<S: CapabilitySet> Default for DynBox<S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<O: 'static, S: Bind<O>> From<Box<O>> for DynBox<S> {
    fn from(object: Box<O>) -> Self {
        Self::from_box(object)
    }
}

impl<S: CapabilitySet> fmt::Debug for DynBox<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object_type_name() {
            Some(name) => f
                .debug_struct("DynBox")
                .field("object", &name)
                .finish_non_exhaustive(),
            None => f.write_str("DynBox(<empty>)"),
        }
    }
}
