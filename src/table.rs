use core::{
    any::{TypeId, type_name},
    fmt,
};

use dyncap_internals::ErasedPtr;

use crate::{
    Capability,
    cache::TABLES,
    operation::{Access, Operation},
    set::{Bind, CapabilitySet, Lookup, Subset, Token},
};

/// The concrete type a [`DispatchTable`] was built for.
#[derive(Clone, Copy)]
struct ObjectType {
    id: TypeId,
    name: &'static str,
}

impl ObjectType {
    fn of<O: 'static>() -> Self {
        Self {
            id: TypeId::of::<O>(),
            name: type_name::<O>(),
        }
    }
}

/// The implementations of every capability of `S` for one concrete type.
///
/// Tables are created once per `(S, object type)` pair, on first use, and
/// live for the rest of the process. All handles with the same capability set
/// over objects of the same type share one table.
///
/// # Examples
///
/// ```
/// use dyncap::{Caps, DispatchTable, DynRef, Impl, SelfRef, capability};
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
/// let table = DispatchTable::<Caps![Print, Size]>::of::<String>();
/// assert!(std::ptr::eq(table, DispatchTable::<Caps![Print, Size]>::of::<String>()));
/// assert_eq!(table.object_type_name(), "alloc::string::String");
///
/// // Narrowing reuses the same implementations, and is cached like `of`.
/// let narrowed = table.subset::<Caps![Size], _>();
/// assert!(std::ptr::eq(narrowed, DispatchTable::<Caps![Size]>::of::<String>()));
///
/// let a = String::from("a");
/// let b = String::from("bb");
/// assert!(std::ptr::eq(
///     DynRef::<Caps![Print, Size]>::new(&a).table(),
///     DynRef::<Caps![Print, Size]>::new(&b).table(),
/// ));
/// ```
pub struct DispatchTable<S: CapabilitySet> {
    object: ObjectType,
    entries: S::Table,
}

impl<S: CapabilitySet> DispatchTable<S> {
    /// Returns the table of `S` for objects of type `O`, creating it on first
    /// use.
    ///
    /// The implementations are taken from the singleton implementation cache,
    /// so tables of different capability sets share them.
    pub fn of<O: 'static>() -> &'static Self
    where
        S: Bind<O>,
    {
        let (set, object) = (TypeId::of::<S>(), TypeId::of::<O>());
        if let Some(table) = TABLES.get(set, object) {
            return table;
        }

        // Filled from the implementation cache before taking the lock of
        // `TABLES` below.
        let entries = S::populate(Token::new());
        let (table, created) = TABLES.get_or_insert_with(set, object, || Self {
            object: ObjectType::of::<O>(),
            entries,
        });

        if created {
            trace_cache!(
                capabilities = type_name::<S>(),
                object = type_name::<O>(),
                "created dispatch table"
            );
        }

        table
    }

    /// Returns the table of a subset of `S` for the same object type.
    ///
    /// The entries are copied from this table; no implementation is created.
    /// The result is the same table that
    /// [`DispatchTable::<Sub>::of`](DispatchTable::of) returns for the same
    /// object type.
    pub fn subset<Sub, Idx>(&self) -> &'static DispatchTable<Sub>
    where
        Sub: Subset<S, Idx>,
    {
        let (table, created) =
            TABLES.get_or_insert_with(TypeId::of::<Sub>(), self.object.id, || DispatchTable {
                object: self.object,
                entries: Sub::select(&self.entries, Token::new()),
            });

        if created {
            trace_cache!(
                capabilities = type_name::<Sub>(),
                object = self.object.name,
                "created dispatch table from subset"
            );
        }

        table
    }

    /// Returns the [`TypeId`] of the type this table was built for.
    pub fn object_type_id(&self) -> TypeId {
        self.object.id
    }

    /// Returns the name of the type this table was built for, as given by
    /// [`core::any::type_name`].
    pub fn object_type_name(&self) -> &'static str {
        self.object.name
    }

    /// Calls `operation` on the implementation of `C` stored in this table.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `ptr` was erased from an object of the type this table was built
    ///    for.
    /// 2. The object stays alive for the whole call.
    /// 3. If `M` is [`Exclusive`](crate::operation::Exclusive), `ptr` was
    ///    created with [`ErasedPtr::from_mut`] or [`ErasedPtr::from_box`] and
    ///    the object is not accessed through any other path during the call.
    ///    Otherwise the object is not mutated during the call.
    #[inline]
    pub(crate) unsafe fn dispatch<C, I, M, F, Args>(
        &self,
        ptr: ErasedPtr,
        operation: F,
        args: Args,
    ) -> F::Output
    where
        C: ?Sized + Capability,
        S: Lookup<C, I>,
        M: Access,
        F: Operation<C, M, Args>,
    {
        let capability = S::lookup(&self.entries, Token::new());

        // SAFETY:
        // 1. Guaranteed by the caller, the receiver matches the requested access.
        // 2. The receiver is only passed to `capability`, which was populated for
        //    the same object type as `ptr`.
        let this = unsafe { M::receiver(ptr) };

        operation.invoke(capability, this, args)
    }
}

impl<S: CapabilitySet> fmt::Debug for DispatchTable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Capabilities<S>(core::marker::PhantomData<S>);

        impl<S: CapabilitySet> fmt::Debug for Capabilities<S> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut list = f.debug_list();
                S::capability_names(&mut list);
                list.finish()
            }
        }

        f.debug_struct("DispatchTable")
            .field("object", &self.object.name)
            .field("capabilities", &Capabilities::<S>(core::marker::PhantomData))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::{format, string::String};

    use dyncap_internals::{Impl, SelfRef};

    use super::*;
    use crate::Caps;

    crate::capability! {
        trait Label {
            fn label(&self, this: SelfRef) -> &'static str;
        }
    }

    crate::capability! {
        trait Double {
            fn double(&self, this: SelfRef) -> i64;
        }
    }

    impl Label for Impl<i64> {
        fn label<'this>(&'this self, _this: SelfRef<'this>) -> &'static str {
            "i64"
        }
    }

    impl Label for Impl<String> {
        fn label<'this>(&'this self, _this: SelfRef<'this>) -> &'static str {
            "String"
        }
    }

    impl Double for Impl<i64> {
        fn double<'this>(&'this self, this: SelfRef<'this>) -> i64 {
            self.instance(this) * 2
        }
    }

    static_assertions::assert_impl_all!(DispatchTable<Caps![Label, Double]>: Send, Sync);

    #[test]
    fn test_table_is_cached() {
        let first = DispatchTable::<Caps![Label, Double]>::of::<i64>();
        let second = DispatchTable::<Caps![Label, Double]>::of::<i64>();
        assert!(core::ptr::eq(first, second));
        assert_eq!(first.object_type_id(), TypeId::of::<i64>());
        assert_eq!(first.object_type_name(), "i64");
    }

    #[test]
    fn test_table_per_object_type() {
        let number = DispatchTable::<Caps![Label]>::of::<i64>();
        let text = DispatchTable::<Caps![Label]>::of::<String>();
        assert_ne!(number.object_type_id(), text.object_type_id());

        let value = String::new();
        // SAFETY: `value` is a `String`, alive and only read during the call
        let label = unsafe {
            text.dispatch::<dyn Label, _, crate::operation::Shared, _, _>(
                ErasedPtr::from_ref(&value),
                <dyn Label>::label,
                (),
            )
        };
        assert_eq!(label, "String");
    }

    #[test]
    fn test_subset_matches_of() {
        let full = DispatchTable::<Caps![Label, Double]>::of::<i64>();
        let narrowed = full.subset::<Caps![Double], _>();
        assert!(core::ptr::eq(
            narrowed,
            DispatchTable::<Caps![Double]>::of::<i64>()
        ));
        assert!(core::ptr::eq(narrowed, full.subset::<Caps![Double], _>()));
        assert_eq!(narrowed.object_type_name(), "i64");

        let reordered = full.subset::<Caps![Double, Label], _>();
        let value = 21i64;
        // SAFETY: `value` is an `i64`, alive and only read during the call
        let doubled = unsafe {
            reordered.dispatch::<dyn Double, _, crate::operation::Shared, _, _>(
                ErasedPtr::from_ref(&value),
                <dyn Double>::double,
                (),
            )
        };
        assert_eq!(doubled, 42);
    }

    #[test]
    fn test_table_debug() {
        let table = DispatchTable::<Caps![Label, Double]>::of::<i64>();
        let debug = format!("{table:?}");
        assert!(debug.starts_with("DispatchTable { object: \"i64\", capabilities: ["));
        assert!(debug.contains("Label"));
        assert!(debug.contains("Double"));
    }
}
