//! Integration tests for the dyncap-internals crate.
//!
//! These tests drive the erased addresses and the adaptor the same way the
//! dispatch tables of `dyncap` do: a hand-written capability trait is
//! implemented for [`Impl<O>`], stored as a `&'static dyn Trait` next to an
//! [`ErasedPtr`], and invoked through an `unsafe` receiver.
//!
//! ## Dispatch Tests (4 tests)
//! - `test_dispatch_through_trait_object`: Shared calls for two unrelated
//!   types through the same trait object type
//! - `test_dispatch_mutation`: Mutable calls observed through the original
//!   object
//! - `test_dispatch_owned_delete`: Rebuilding and dropping a box through the
//!   adaptor exactly once
//! - `test_receiver_downgrade`: Passing a downgraded mutable receiver to a
//!   read-only method
//!
//! ## Consistency Tests (2 tests)
//! - `test_adaptor_is_stateless`: Separately created adaptors for the same
//!   type behave identically
//! - `test_erased_ptr_identity`: Erasing the same object twice yields equal
//!   addresses

use std::{cell::Cell, rc::Rc};

use dyncap_internals::{ErasedPtr, Impl, SelfMut, SelfRef};

trait Show: Sync {
    fn show<'this>(&'this self, this: SelfRef<'this>) -> String;
}

trait Bump: Sync {
    fn bump<'this>(&'this self, this: SelfMut<'this>);
}

trait Release: Sync {
    unsafe fn release<'this>(&'this self, this: SelfMut<'this>);
}

impl Show for Impl<i32> {
    fn show<'this>(&'this self, this: SelfRef<'this>) -> String {
        self.instance(this).to_string()
    }
}

impl Show for Impl<String> {
    fn show<'this>(&'this self, this: SelfRef<'this>) -> String {
        format!("{:?}", self.instance(this))
    }
}

impl Bump for Impl<i32> {
    fn bump<'this>(&'this self, this: SelfMut<'this>) {
        *self.instance_mut(this) += 1;
    }
}

impl<O: 'static> Release for Impl<O> {
    unsafe fn release<'this>(&'this self, this: SelfMut<'this>) {
        let ptr = self.instance_ptr(this);
        // SAFETY: the caller guarantees that the address came from
        // `Box::into_raw` and is not used afterwards
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

static IMPL_I32: Impl<i32> = {
    // SAFETY: only addresses of `i32`s are paired with this adaptor below
    unsafe { Impl::new() }
};

static IMPL_STRING: Impl<String> = {
    // SAFETY: only addresses of `String`s are paired with this adaptor below
    unsafe { Impl::new() }
};

fn show(table: &'static dyn Show, ptr: ErasedPtr) -> String {
    // SAFETY: every caller pairs `ptr` with the table of its own type and keeps
    // the object alive across the call
    let receiver = unsafe { ptr.as_self_ref() };
    table.show(receiver)
}

#[test]
fn test_dispatch_through_trait_object() {
    let number = 42i32;
    let text = String::from("hi");

    let entries: [(&'static dyn Show, ErasedPtr); 2] = [
        (&IMPL_I32, ErasedPtr::from_ref(&number)),
        (&IMPL_STRING, ErasedPtr::from_ref(&text)),
    ];

    let shown: Vec<String> = entries
        .iter()
        .map(|&(table, ptr)| show(table, ptr))
        .collect();
    assert_eq!(shown, ["42", "\"hi\""]);
}

#[test]
fn test_dispatch_mutation() {
    let mut number = 1i32;
    let table: &'static dyn Bump = &IMPL_I32;
    let ptr = ErasedPtr::from_mut(&mut number);

    for _ in 0..3 {
        // SAFETY: `number` is alive and only reachable through `ptr` here
        let receiver = unsafe { ptr.as_self_mut() };
        table.bump(receiver);
    }

    assert_eq!(number, 4);
}

struct DropCounter(Rc<Cell<usize>>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn test_dispatch_owned_delete() {
    let drops = Rc::new(Cell::new(0));
    let ptr = ErasedPtr::from_box(Box::new(DropCounter(drops.clone())));
    assert_eq!(drops.get(), 0);

    // SAFETY: only addresses of `DropCounter`s reach this adaptor
    let implementation = unsafe { Impl::<DropCounter>::new() };
    let table: &dyn Release = &implementation;
    // SAFETY: the box is exclusively owned by `ptr`
    let receiver = unsafe { ptr.as_self_mut() };
    // SAFETY: `ptr` came from `ErasedPtr::from_box` and is not used again
    unsafe { table.release(receiver) };

    assert_eq!(drops.get(), 1);
}

#[test]
fn test_receiver_downgrade() {
    let mut number = 7i32;
    let ptr = ErasedPtr::from_mut(&mut number);
    // SAFETY: `number` is alive and only reachable through `ptr` here
    let receiver = unsafe { ptr.as_self_mut() };
    assert_eq!(IMPL_I32.show(receiver.into_ref()), "7");
}

#[test]
fn test_adaptor_is_stateless() {
    // SAFETY: only addresses of `i32`s reach this adaptor
    let local = unsafe { Impl::<i32>::new() };
    let number = -3i32;
    let ptr = ErasedPtr::from_ref(&number);
    // SAFETY: `number` is alive and only read
    let first = unsafe { ptr.as_self_ref() };
    // SAFETY: as above
    let second = unsafe { ptr.as_self_ref() };
    assert_eq!(local.show(first), IMPL_I32.show(second));
    assert_eq!(format!("{local:?}"), "Impl<i32>");
}

#[test]
fn test_erased_ptr_identity() {
    let text = String::from("same");
    assert_eq!(ErasedPtr::from_ref(&text), ErasedPtr::from_ref(&text));

    let other = String::from("same");
    assert_ne!(ErasedPtr::from_ref(&text), ErasedPtr::from_ref(&other));
}
