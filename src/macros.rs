/// Declares a capability: a trait that can be implemented for any type from
/// the outside and called through [`DynRef`], [`DynMut`] and [`DynBox`].
///
/// Every method takes `&self` (the implementation) plus a receiver that stands
/// for the object: [`SelfRef`] for operations that only read the object and
/// [`SelfMut`] for operations that may modify it. Any number of further
/// arguments and any return type are allowed.
///
/// The macro gives every method a lifetime `'this` that is shared by `&self`
/// and the receiver, declares `Sync` as a supertrait, and implements
/// [`Capability`] and [`ImplementedFor`] for the trait object type.
///
/// [`DynRef`]: crate::DynRef
/// [`DynMut`]: crate::DynMut
/// [`DynBox`]: crate::DynBox
/// [`SelfRef`]: crate::SelfRef
/// [`SelfMut`]: crate::SelfMut
/// [`Capability`]: crate::Capability
/// [`ImplementedFor`]: crate::ImplementedFor
///
/// # Examples
///
/// ```
/// use dyncap::{Caps, DynMut, Impl, SelfMut, SelfRef, capability};
///
/// capability! {
///     /// Renders a value as text.
///     pub trait Print {
///         fn print(&self, this: SelfRef) -> String;
///     }
/// }
///
/// capability! {
///     /// Puts a value back into its initial state.
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
/// let mut text = String::from("mut");
/// let mut handle: DynMut<'_, Caps![Print, Reset]> = DynMut::new(&mut text);
/// assert_eq!(handle.call(<dyn Print>::print, ()), "mut");
/// handle.call(<dyn Reset>::reset, ());
/// assert_eq!(handle.call(<dyn Print>::print, ()), "");
/// ```
///
/// A handle can only be built for types that implement every capability of
/// its set:
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
/// impl Print for Impl<i32> {
///     fn print<'this>(&'this self, this: SelfRef<'this>) -> String {
///         self.instance(this).to_string()
///     }
/// }
///
/// struct NotPrintable;
/// let handle: DynRef<'_, Caps![Print]> = DynRef::new(&NotPrintable);
/// ```
///
/// Only receivers named `SelfRef` or `SelfMut` are accepted:
///
/// ```compile_fail
/// dyncap::capability! {
///     pub trait Broken {
///         fn broken(&self, this: &str) -> String;
///     }
/// }
/// ```
///
/// An implementation cannot be moved out of its method, so it cannot be kept
/// around and paired with the receiver of another type later:
///
/// ```compile_fail
/// use std::sync::OnceLock;
///
/// use dyncap::{Impl, SelfRef, capability};
///
/// capability! {
///     pub trait Peek {
///         fn peek(&self, this: SelfRef) -> u64;
///     }
/// }
///
/// static STASH: OnceLock<&'static Impl<u64>> = OnceLock::new();
///
/// impl Peek for Impl<u64> {
///     fn peek<'this>(&'this self, this: SelfRef<'this>) -> u64 {
///         let _ = STASH.set(Box::leak(Box::new(*self)));
///         *self.instance(this)
///     }
/// }
/// ```
///
/// ```compile_fail
/// use dyncap::{Impl, SelfRef, capability};
///
/// capability! {
///     pub trait Peek {
///         fn peek(&self, this: SelfRef) -> u64;
///     }
/// }
///
/// impl Peek for Impl<u64> {
///     fn peek<'this>(&'this self, this: SelfRef<'this>) -> u64 {
///         let copy: Impl<u64> = Clone::clone(self);
///         let _: &'static Impl<u64> = Box::leak(Box::new(copy));
///         *self.instance(this)
///     }
/// }
/// ```
#[macro_export]
macro_rules! capability {
    (
        $(#[$attr:meta])*
        $vis:vis trait $name:ident {
            $(
                $(#[$method_attr:meta])*
                fn $method:ident(
                    &self,
                    $this:ident: $receiver:ident
                    $(, $arg:ident: $arg_ty:ty)*
                    $(,)?
                ) $(-> $ret:ty)?;
            )*
        }
    ) => {
        $(#[$attr])*
        $vis trait $name: ::core::marker::Sync {
            $(
                $(#[$method_attr])*
                fn $method<'this>(
                    &'this self,
                    $this: $crate::__receiver!($receiver, 'this)
                    $(, $arg: $arg_ty)*
                ) $(-> $ret)?;
            )*
        }

        impl $crate::Capability for dyn $name {}

        // SAFETY:
        // 1. Every method of the trait ties its receiver to the borrow of the
        //    implementation through the shared `'this` lifetime.
        // 2. `coerce` only unsizes the reference.
        unsafe impl<O: 'static> $crate::ImplementedFor<O> for dyn $name
        where
            $crate::Impl<O>: $name,
        {
            #[inline]
            fn coerce(implementation: &'static $crate::Impl<O>) -> &'static Self {
                implementation
            }
        }
    };
}

/// Expands a receiver name to its branded type.
#[doc(hidden)]
#[macro_export]
macro_rules! __receiver {
    (SelfRef, $lifetime:lifetime) => {
        $crate::SelfRef<$lifetime>
    };
    (SelfMut, $lifetime:lifetime) => {
        $crate::SelfMut<$lifetime>
    };
    ($other:ident, $lifetime:lifetime) => {
        ::core::compile_error!(::core::concat!(
            "capability receivers must be `SelfRef` or `SelfMut`, found `",
            ::core::stringify!($other),
            "`"
        ))
    };
}

/// Names a capability set.
///
/// `Caps![A, B]` is the type `Cons<dyn A, Cons<dyn B, Nil>>` from
/// [`set`](crate::set). The order only matters for type equality: a
/// `DynRef<'_, Caps![A, B]>` and a `DynRef<'_, Caps![B, A]>` are different
/// types, but both can call `A` and `B`.
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
/// impl Print for Impl<u8> {
///     fn print<'this>(&'this self, this: SelfRef<'this>) -> String {
///         format!("{}u8", self.instance(this))
///     }
/// }
///
/// let handle: DynRef<'_, Caps![Print]> = DynRef::new(&7u8);
/// assert_eq!(handle.call(<dyn Print>::print, ()), "7u8");
/// ```
#[macro_export]
macro_rules! Caps {
    () => {
        $crate::set::Nil
    };
    ($head:path $(, $tail:path)* $(,)?) => {
        $crate::set::Cons<dyn $head, $crate::Caps![$($tail),*]>
    };
}

/// Emits a `tracing` event at trace level when the `tracing` feature is
/// enabled.
macro_rules! trace_cache {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)*);
    };
}
