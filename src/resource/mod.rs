use core::cell::Cell;
use core::ptr;
use alloc::boxed::Box;

/// Type-erased ownership of one raw heap allocation.
///
/// A descriptor is constructed from a concrete payload type and fixes the
/// correct destruction semantics (scalar drop versus element-wise array
/// drop) at construction time. All later access goes through this
/// type-neutral interface; `release` dispatches to the erased variant, so
/// no call site needs to retain the static payload type.
pub trait Resource {
    /// Destroys the managed payload with the deletion semantics fixed at
    /// construction, then clears the stored address. The address is cleared
    /// before the payload drops, so reentrant observers see a released
    /// descriptor. Releasing an already cleared descriptor is a no-op.
    fn release(&self);

    /// Clears the stored address without destroying the payload. Used when
    /// the payload is destroyed by the party that allocated it.
    fn abandon(&self);

    /// Returns the payload address, or null once released or abandoned.
    fn address(&self) -> *mut ();

    /// Returns the number of payload slots; 1 for a scalar payload.
    fn len(&self) -> usize;

    /// Returns `true` once the payload has been released or abandoned.
    #[inline]
    fn is_released(&self) -> bool {
        self.address().is_null()
    }
}

/// Descriptor of a single heap-allocated value; releases with scalar drop
/// semantics.
pub struct ScalarDesc<T> {
    /// Pointer to the managed value, or null once released.
    data: Cell<*mut T>,
}

impl<T> ScalarDesc<T> {
    /// Constructs a descriptor owning the allocation behind `data`.
    ///
    /// # Safety
    ///
    /// `data` must address a live `Box<T>` allocation, and no other party
    /// may free it while the descriptor holds it.
    #[inline]
    pub(crate) unsafe fn from_raw(data: *mut T) -> ScalarDesc<T> {
        ScalarDesc {
            data: Cell::new(data),
        }
    }
}

impl<T> Resource for ScalarDesc<T> {
    fn release(&self) {
        // Take the payload pointer, clearing the stored address.
        let data = self.data.replace(ptr::null_mut());
        // Check if the payload was already released.
        if data.is_null() {
            return;
        }
        unsafe {
            // Reconstitute and drop the boxed value.
            drop(Box::from_raw(data));
        }
    }

    #[inline]
    fn abandon(&self) {
        // Clear the stored address; the payload is destroyed elsewhere.
        self.data.set(ptr::null_mut());
    }

    #[inline]
    fn address(&self) -> *mut () {
        self.data.get() as *mut ()
    }

    #[inline]
    fn len(&self) -> usize {
        1
    }
}

/// Descriptor of a heap-allocated array; releases with element-wise drop
/// semantics.
pub struct ArrayDesc<T> {
    /// Fat pointer to the managed array, or the null sentinel once released.
    data: Cell<*mut [T]>,
    /// Number of elements, fixed at construction.
    len: usize,
}

impl<T> ArrayDesc<T> {
    /// Constructs a descriptor owning the array allocation behind `data`.
    ///
    /// # Safety
    ///
    /// `data` must address a live `Box<[T]>` allocation, and no other party
    /// may free it while the descriptor holds it.
    #[inline]
    pub(crate) unsafe fn from_raw(data: *mut [T]) -> ArrayDesc<T> {
        ArrayDesc {
            len: data.len(),
            data: Cell::new(data),
        }
    }

    /// The null sentinel for a released array descriptor.
    #[inline]
    fn null() -> *mut [T] {
        ptr::slice_from_raw_parts_mut(ptr::null_mut(), 0)
    }
}

impl<T> Resource for ArrayDesc<T> {
    fn release(&self) {
        // Take the payload pointer, clearing the stored address.
        let data = self.data.replace(ArrayDesc::null());
        // Check if the payload was already released.
        if data.is_null() {
            return;
        }
        unsafe {
            // Reconstitute and drop the boxed slice, destroying every element.
            drop(Box::from_raw(data));
        }
    }

    #[inline]
    fn abandon(&self) {
        // Clear the stored address; the payload is destroyed elsewhere.
        self.data.set(ArrayDesc::null());
    }

    #[inline]
    fn address(&self) -> *mut () {
        self.data.get() as *mut ()
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }
}
