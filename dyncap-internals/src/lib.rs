#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`dyncap`].
//!
//! # Overview
//!
//! This crate contains the low-level, type-erased building blocks and the
//! unsafe operations that power the [`dyncap`] capability dispatch library.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`dyncap`] crate, not
//! this one.
//!
//! # Architecture
//!
//! - **[`erased`]**: Addresses with their concrete type stripped away
//!   - [`ErasedPtr`]: The bare address stored inside every handle
//!   - [`SelfRef`]/[`SelfMut`]: The read-only and mutable receivers that a
//!     capability operation is called with
//!
//! - **[`adaptor`]**: The single place where an erased address is re-typed
//!   - [`Impl`]: The per-type implementation value that capability traits are
//!     implemented for. Its [`instance`] and [`instance_mut`] accessors turn a
//!     receiver back into `&O` / `&mut O`.
//!
//! # Safety Strategy
//!
//! Erasing `&mut String` to an [`ErasedPtr`] is always fine. The danger is the
//! opposite direction: reading that address back as anything other than a
//! `String`. This crate keeps that direction sound through:
//!
//! - **Unsafe construction**: Turning an [`ErasedPtr`] into a receiver and
//!   creating an [`Impl<O>`] are both `unsafe`. The caller (the dispatch
//!   tables in [`dyncap`]) promises to only ever pair a receiver with the
//!   [`Impl<O>`] of the type the address came from.
//! - **Branded lifetimes**: Receivers are invariant in their lifetime, and the
//!   adaptor only accepts a receiver whose lifetime matches the borrow of the
//!   [`Impl<O>`]. A receiver obtained for one call can therefore not be handed
//!   to the implementation of another call.
//! - **Debug type tags**: In debug builds every erased address remembers the
//!   [`TypeId`] it was created from, and the adaptor asserts it.
//!
//! [`dyncap`]: https://docs.rs/dyncap/latest/dyncap/
//! [`instance`]: Impl::instance
//! [`instance_mut`]: Impl::instance_mut
//! [`TypeId`]: core::any::TypeId

extern crate alloc;

pub mod adaptor;
pub mod erased;
mod util;

pub use adaptor::Impl;
pub use erased::{ErasedPtr, SelfMut, SelfRef};
