//! Type-level capability sets.
//!
//! A handle names the capabilities it carries as a single type, a list built
//! from [`Cons`] and [`Nil`]. The [`Caps!`] macro spells these lists the way
//! you would write them by hand:
//!
//! ```
//! use dyncap::{Caps, capability, SelfRef, set::{Cons, Nil}};
//!
//! capability! {
//!     pub trait Print {
//!         fn print(&self, this: SelfRef) -> String;
//!     }
//! }
//!
//! capability! {
//!     pub trait Name {
//!         fn name(&self, this: SelfRef) -> &'static str;
//!     }
//! }
//!
//! static_assertions::assert_type_eq_all!(Caps![Print, Name], Cons<dyn Print, Cons<dyn Name, Nil>>);
//! static_assertions::assert_type_eq_all!(Caps![], Nil);
//! ```
//!
//! # Lookup by identity
//!
//! Calls find their capability with [`Lookup`], which walks the list at
//! compile time using an index made of [`Here`] and [`There`]. The index is
//! always inferred. The position of a capability in the list therefore does
//! not matter, and a list that names the same capability twice cannot be
//! called through: the index for that capability is ambiguous.
//!
//! ```compile_fail
//! use dyncap::{Caps, DynRef, Impl, SelfRef, capability};
//!
//! capability! {
//!     pub trait Print {
//!         fn print(&self, this: SelfRef) -> String;
//!     }
//! }
//!
//! impl Print for Impl<i32> {
//!     fn print<'this>(&'this self, this: SelfRef<'this>) -> String {
//!         self.instance(this).to_string()
//!     }
//! }
//!
//! let handle: DynRef<'_, Caps![Print, Print]> = DynRef::new(&1);
//! handle.call(<dyn Print>::print, ());
//! ```

use core::{any::type_name, fmt, marker::PhantomData};

use crate::{Capability, ImplementedFor, cache};

/// The empty capability set.
#[derive(Clone, Copy, Debug)]
pub enum Nil {}

/// A capability set with `H` as its first capability and `T` as the rest.
///
/// `H` is the trait object type of a capability, e.g. `dyn Print`.
pub struct Cons<H: ?Sized, T>(PhantomData<fn() -> (*const H, T)>);

/// Index of the first capability of a [`Cons`] list.
#[derive(Clone, Copy, Debug)]
pub enum Here {}

/// Index of a capability somewhere in the rest of a [`Cons`] list.
pub struct There<I>(PhantomData<fn() -> I>);

mod sealed {
    use super::*;

    pub trait Sealed: 'static {}

    impl Sealed for Nil {}
    impl<H: ?Sized + Capability, T: CapabilitySet> Sealed for Cons<H, T> {}

    /// Proof that a method is called from inside this crate.
    ///
    /// The methods of [`Lookup`], [`Bind`] and [`Subset`] hand out
    /// implementations, which must never be paired with a receiver by
    /// anything other than a dispatch table.
    #[derive(Clone, Copy)]
    pub struct Token(());

    impl Token {
        pub(crate) const fn new() -> Self {
            Self(())
        }
    }
}

pub(crate) use sealed::Token;

/// A list of capabilities, built with [`Caps!`].
///
/// This trait is sealed and cannot be implemented outside of this crate.
pub trait CapabilitySet: sealed::Sealed {
    /// Storage for one implementation per capability.
    #[doc(hidden)]
    type Table: Send + Sync + 'static;

    /// Appends the name of every capability to `list`, in order.
    #[doc(hidden)]
    fn capability_names(list: &mut fmt::DebugList<'_, '_>);
}

/// Storage of one capability implementation followed by the rest of a table.
#[doc(hidden)]
pub struct Entry<H: ?Sized + 'static, T> {
    implementation: &'static H,
    rest: T,
}

impl CapabilitySet for Nil {
    type Table = ();

    fn capability_names(_list: &mut fmt::DebugList<'_, '_>) {}
}

impl<H: ?Sized + Capability, T: CapabilitySet> CapabilitySet for Cons<H, T> {
    type Table = Entry<H, T::Table>;

    fn capability_names(list: &mut fmt::DebugList<'_, '_>) {
        list.entry(&type_name::<H>());
        T::capability_names(list);
    }
}

/// A capability set that contains the capability `C` at index `I`.
///
/// `I` is inferred. When this bound is not satisfied, the capability is not
/// part of the set; when `I` cannot be inferred, the capability is listed
/// more than once.
pub trait Lookup<C: ?Sized + Capability, I>: CapabilitySet {
    /// Returns the implementation of `C` stored in `table`.
    #[doc(hidden)]
    fn lookup(table: &Self::Table, token: Token) -> &'static C;
}

impl<C: ?Sized + Capability, T: CapabilitySet> Lookup<C, Here> for Cons<C, T> {
    #[inline]
    fn lookup(table: &Self::Table, _token: Token) -> &'static C {
        table.implementation
    }
}

impl<C, H, T, I> Lookup<C, There<I>> for Cons<H, T>
where
    C: ?Sized + Capability,
    H: ?Sized + Capability,
    T: Lookup<C, I>,
{
    #[inline]
    fn lookup(table: &Self::Table, token: Token) -> &'static C {
        T::lookup(&table.rest, token)
    }
}

/// A capability set whose every capability is implemented for `O`.
///
/// A missing implementation shows up as an unsatisfied
/// [`ImplementedFor<O>`] bound on one of the capabilities.
pub trait Bind<O: 'static>: CapabilitySet {
    /// Builds a table from the singleton implementation cache.
    #[doc(hidden)]
    fn populate(token: Token) -> Self::Table;
}

impl<O: 'static> Bind<O> for Nil {
    #[inline]
    fn populate(_token: Token) -> Self::Table {}
}

impl<O, H, T> Bind<O> for Cons<H, T>
where
    O: 'static,
    H: ?Sized + ImplementedFor<O>,
    T: Bind<O>,
{
    fn populate(token: Token) -> Self::Table {
        Entry {
            implementation: cache::implementation::<H, O>(),
            rest: T::populate(token),
        }
    }
}

/// A capability set whose every capability is also part of `Super`.
///
/// `Idx` is inferred, and is a list of [`Lookup`] indices into `Super`.
pub trait Subset<Super: CapabilitySet, Idx>: CapabilitySet {
    /// Copies the implementations of this set out of a table of `Super`.
    #[doc(hidden)]
    fn select(table: &Super::Table, token: Token) -> Self::Table;
}

impl<Super: CapabilitySet> Subset<Super, ()> for Nil {
    #[inline]
    fn select(_table: &Super::Table, _token: Token) -> Self::Table {}
}

impl<Super, H, T, I, Rest> Subset<Super, (I, Rest)> for Cons<H, T>
where
    Super: Lookup<H, I>,
    H: ?Sized + Capability,
    T: Subset<Super, Rest>,
{
    fn select(table: &Super::Table, token: Token) -> Self::Table {
        Entry {
            implementation: Super::lookup(table, token),
            rest: T::select(table, token),
        }
    }
}
