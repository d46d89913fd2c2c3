/// Marks `Self` as viewable as `U` through the same address.
///
/// Handle conversion reinterprets the attachment pointer without touching
/// the reference counts, so the target type must be readable at offset zero
/// of the source.
///
/// # Safety
///
/// Implementations must guarantee that a valid `U` lives at the address of
/// every valid `Self`, for the whole lifetime of the value. In practice
/// that means `U` is the first field of a `#[repr(C)]` struct, or a type
/// with the same layout.
pub unsafe trait Upcast<U> {}

// Every type is viewable as itself.
unsafe impl<T> Upcast<T> for T {}
