//! Commonly used items for convenient importing.
//!
//! The prelude re-exports what you need to declare capabilities, implement
//! them, and call them through handles, with a single use statement.
//!
//! # Usage
//!
//! ```rust
//! use dyncap::prelude::*;
//!
//! capability! {
//!     pub trait Area {
//!         fn area(&self, this: SelfRef) -> f64;
//!     }
//! }
//!
//! capability! {
//!     pub trait Scale {
//!         fn scale(&self, this: SelfMut, factor: f64);
//!     }
//! }
//!
//! struct Square(f64);
//!
//! impl Area for Impl<Square> {
//!     fn area<'this>(&'this self, this: SelfRef<'this>) -> f64 {
//!         self.instance(this).0 * self.instance(this).0
//!     }
//! }
//!
//! impl Scale for Impl<Square> {
//!     fn scale<'this>(&'this self, this: SelfMut<'this>, factor: f64) {
//!         self.instance_mut(this).0 *= factor;
//!     }
//! }
//!
//! let mut square: DynBox<Caps![Area, Scale]> = DynBox::new(Square(2.0));
//! square.call(<dyn Scale>::scale, (1.5,));
//! assert_eq!(square.call(<dyn Area>::area, ()), 9.0);
//! ```
//!
//! # What's Included
//!
//! - **[`capability!`]** and **[`Caps!`]**: Declaring capabilities and naming
//!   capability sets
//! - **[`Impl`]**, **[`SelfRef`]** and **[`SelfMut`]**: Implementing
//!   capabilities for a type
//! - **[`DynRef`]**, **[`DynMut`]** and **[`DynBox`]**: The handles
//! - **[`invoke`]** and **[`invoke_mut`]**: Calling an operation without a
//!   handle
//! - **[`Capability`]**: The marker implemented for every capability

pub use crate::{
    Capability, Caps, DynBox, DynMut, DynRef, Impl, SelfMut, SelfRef, capability, invoke,
    invoke_mut,
};
