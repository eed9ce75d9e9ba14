#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Ad hoc polymorphism over unrelated types.
//!
//! ## Overview
//!
//! This crate lets you treat values of unrelated concrete types uniformly
//! through one or more independently declared *capabilities*, without the
//! types sharing a base trait object or storing any dispatch information
//! themselves. A capability is implemented for a type from the outside, and a
//! handle pairs the address of a value with a small, cached table of those
//! implementations.
//!
//! ## Quick Example
//!
//! ```
//! use dyncap::prelude::*;
//!
//! capability! {
//!     /// Renders a value as text.
//!     pub trait Print {
//!         fn print(&self, this: SelfRef) -> String;
//!     }
//! }
//!
//! impl<O: core::fmt::Display + 'static> Print for Impl<O> {
//!     fn print<'this>(&'this self, this: SelfRef<'this>) -> String {
//!         self.instance(this).to_string()
//!     }
//! }
//!
//! let number = 1;
//! let text = String::from("one");
//! let handles: [DynRef<'_, Caps![Print]>; 2] = [DynRef::new(&number), DynRef::new(&text)];
//!
//! let printed: Vec<String> = handles
//!     .iter()
//!     .map(|handle| handle.call(<dyn Print>::print, ()))
//!     .collect();
//! assert_eq!(printed, ["1", "one"]);
//! ```
//!
//! ## Core Concepts
//!
//! - A **capability** is a trait declared with [`capability!`]. Its methods
//!   take an erased receiver ([`SelfRef`] or [`SelfMut`]) instead of `self`.
//! - A capability is implemented for a type `O` by implementing the trait for
//!   [`Impl<O>`]. Inside the methods, [`Impl::instance`] and
//!   [`Impl::instance_mut`] turn the receiver back into `&O` / `&mut O`.
//! - A **capability set** is a type-level list written with [`Caps!`]. The
//!   order does not matter for calls; capabilities are found by identity.
//! - A **dispatch table** ([`DispatchTable`]) holds one implementation per
//!   capability of a set, all for the same concrete type. Tables and
//!   implementations are created once per process on first use and are
//!   shared by every handle afterwards.
//! - A **handle** pairs an erased address with a table:
//!   - [`DynRef`]: read-only and non-owning, like `&dyn Trait`
//!   - [`DynMut`]: mutable and non-owning, like `&mut dyn Trait`
//!   - [`DynBox`]: owning, like `Box<dyn Trait>`, and possibly empty
//!
//! ## Safety
//!
//! All of the public API is safe. The only `unsafe` step, re-typing an erased
//! address, happens inside [`Impl::instance`] and is tied by a lifetime brand
//! to the single call that produced the receiver. The mistakes that could
//! break this (a missing implementation, calling a capability the handle
//! does not carry, calling a mutating operation through a read-only handle)
//! are all compile errors.
//!
//! For implementation details, see the [`dyncap-internals`] crate.
//!
//! [`dyncap-internals`]: dyncap_internals
//!
//! ## Features
//!
//! - `std`: Use `std::sync::RwLock` for the process-wide caches instead of
//!   a spin lock.
//! - `tracing`: Emit a `tracing` event whenever a cache entry is created.

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod macros;

pub mod operation;
pub mod prelude;
pub mod set;

mod cache;
mod capability;
mod handle;
mod registry;
mod table;

pub use dyncap_internals::{Impl, SelfMut, SelfRef};

pub use self::{
    capability::{Capability, ImplementedFor},
    handle::{DynBox, DynMut, DynRef},
    operation::{invoke, invoke_mut},
    table::DispatchTable,
};
