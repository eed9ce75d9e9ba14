//! Handles that pair an erased address with a [`DispatchTable`].
//!
//! - [`DynRef`]: read-only, non-owning
//! - [`DynMut`]: mutable, non-owning
//! - [`DynBox`]: owning, possibly empty
//!
//! Every handle is built from a typed value and looks up the table for that
//! value's type, so the address and the table always agree. None of them
//! expose the address.
//!
//! [`DispatchTable`]: crate::DispatchTable

mod mut_;
mod owned;
mod ref_;

pub use self::{mut_::DynMut, owned::DynBox, ref_::DynRef};
