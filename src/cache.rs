//! The process-wide caches.
//!
//! - [`implementation`]: one [`Impl<O>`] per `(capability, object type)`.
//! - [`TABLES`]: one dispatch table per `(capability set, object type)`, used
//!   by [`DispatchTable::of`](crate::DispatchTable::of) and the owning handle.

use core::any::TypeId;

use dyncap_internals::Impl;

use crate::{ImplementedFor, registry::Registry};

static IMPLEMENTATIONS: Registry = Registry::new();

pub(crate) static TABLES: Registry = Registry::new();

/// Returns the implementation of `C` for `O`, creating it on first use.
///
/// Every call for the same `(C, O)` returns the same instance.
pub(crate) fn implementation<C, O>() -> &'static C
where
    C: ?Sized + ImplementedFor<O>,
    O: 'static,
{
    let (implementation, created): (&'static Impl<O>, _) =
        IMPLEMENTATIONS.get_or_insert_with(TypeId::of::<C>(), TypeId::of::<O>(), || {
            // SAFETY:
            // 1. The returned implementation is only reachable through the
            //    dispatch tables, which pair it exclusively with addresses erased
            //    from an `O`.
            unsafe { Impl::<O>::new() }
        });

    if created {
        trace_cache!(
            capability = core::any::type_name::<C>(),
            object = core::any::type_name::<O>(),
            "created capability implementation"
        );
    }

    C::coerce(implementation)
}

#[cfg(test)]
mod tests {
    use alloc::string::{String, ToString};

    use super::*;

    crate::capability! {
        trait Describe {
            fn describe(&self, this: SelfRef) -> String;
        }
    }

    impl Describe for Impl<u16> {
        fn describe<'this>(&'this self, this: crate::SelfRef<'this>) -> String {
            self.instance(this).to_string()
        }
    }

    impl Describe for Impl<String> {
        fn describe<'this>(&'this self, this: crate::SelfRef<'this>) -> String {
            self.instance(this).clone()
        }
    }

    #[test]
    fn test_implementation_is_cached() {
        let first = implementation::<dyn Describe, u16>();
        let second = implementation::<dyn Describe, u16>();
        assert!(core::ptr::addr_eq(first, second));
        assert_ne!(IMPLEMENTATIONS.len(), 0);
    }

    #[test]
    fn test_implementation_dispatches_to_type() {
        let value = 9u16;
        let text = String::from("nine");
        let ptr_value = dyncap_internals::ErasedPtr::from_ref(&value);
        let ptr_text = dyncap_internals::ErasedPtr::from_ref(&text);

        // SAFETY: `value` is alive and only read, and the receiver is passed to
        // the implementation for `u16`
        let this = unsafe { ptr_value.as_self_ref() };
        assert_eq!(implementation::<dyn Describe, u16>().describe(this), "9");

        // SAFETY: `text` is alive and only read, and the receiver is passed to
        // the implementation for `String`
        let this = unsafe { ptr_text.as_self_ref() };
        assert_eq!(implementation::<dyn Describe, String>().describe(this), "nine");
    }
}
