//! Internal utility types.

/// Marker type used when type-erasing an object address.
///
/// This zero-sized type serves as the pointee of every [`ErasedPtr`] once the
/// concrete object type has been forgotten. Using a distinct marker type
/// (rather than `()`) makes the intent clearer in type signatures.
///
/// [`ErasedPtr`]: crate::erased::ErasedPtr
pub(crate) struct Erased;
