use dyncap_internals::Impl;

/// Marker for the trait object type of a capability, e.g. `dyn Print`.
///
/// This is implemented by [`capability!`] and should not be implemented by
/// hand. Capabilities are `Sync` because a single implementation instance is
/// shared by every thread for the lifetime of the process.
pub trait Capability: Sync + 'static {}

/// Converts the implementation of a capability for `O` into the capability's
/// trait object.
///
/// This is implemented by [`capability!`] for every `O` where `Impl<O>`
/// implements the capability trait. A missing implementation therefore shows
/// up as an unsatisfied `ImplementedFor<O>` bound when a handle for `O` is
/// built.
///
/// # Safety
///
/// Implementors must ensure that:
///
/// 1. Every method of the capability trait passes its receiver only to
///    [`Impl::instance`], [`Impl::instance_mut`] or [`Impl::instance_ptr`] of
///    an `Impl` borrowed for the same lifetime as the receiver. The signatures
///    generated by [`capability!`] enforce this.
/// 2. [`ImplementedFor::coerce`] returns the given implementation, unsized to
///    `Self`.
pub unsafe trait ImplementedFor<O: 'static>: Capability {
    /// Unsizes the implementation to the capability's trait object.
    fn coerce(implementation: &'static Impl<O>) -> &'static Self;
}
