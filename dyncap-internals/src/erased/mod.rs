//! Object addresses with their concrete type erased.
//!
//! An [`ErasedPtr`] is what every handle stores in place of `&O`, `&mut O` or
//! `Box<O>`. It can be created from any of those safely, but it can only be
//! turned into a receiver ([`SelfRef`] or [`SelfMut`]) through an `unsafe`
//! call. Receivers are what capability operations are invoked with, and the
//! only thing that can re-type them is [`Impl<O>`].
//!
//! [`Impl<O>`]: crate::adaptor::Impl

mod raw;
mod receiver;

pub use self::{
    raw::ErasedPtr,
    receiver::{SelfMut, SelfRef},
};
