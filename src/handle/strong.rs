use core::fmt::{self, Debug, Formatter, Pointer};
use core::marker::PhantomData;
use core::mem;
use core::ops::{Deref, Index};
use core::ptr::NonNull;
use alloc::boxed::Box;
use alloc::vec::Vec;
use crate::anchor::Intrusive;
use crate::block::{self, Block, HandleError};
use crate::handle::{Upcast, Weak};
use crate::resource::{ArrayDesc, ScalarDesc};

/// An owning, strongly counted handle to a shared resource.
///
/// The payload stays alive exactly as long as at least one strong handle
/// references it; the release of the last strong handle destroys the
/// payload with the deletion semantics fixed when it was attached, scalar
/// or element-wise array. A handle can also be empty, referencing nothing.
///
/// Handles are single-threaded; the reference counts are not synchronized.
pub struct Strong<T> {
    /// Shared control block, or `None` when empty.
    block: Option<NonNull<Block>>,
    /// Variant over the payload type.
    payload: PhantomData<*const T>,
}

impl<T> Strong<T> {
    /// Constructs an empty handle referencing no resource.
    #[inline]
    pub const fn empty() -> Strong<T> {
        Strong {
            block: None,
            payload: PhantomData,
        }
    }

    /// Moves `data` to the heap and returns the sole strong handle to it.
    #[inline]
    pub fn new(data: T) -> Strong<T> where T: 'static {
        Strong::from_box(Box::new(data))
    }

    /// Takes ownership of a boxed value, returning the sole strong handle
    /// to it. The value drops with scalar semantics when the last strong
    /// handle releases.
    pub fn from_box(data: Box<T>) -> Strong<T> where T: 'static {
        unsafe {
            // Unwrap the allocation; the descriptor owns it from here on.
            let desc = ScalarDesc::from_raw(Box::into_raw(data));
            // Allocate a control block seeded with a single strong reference.
            let block = block::alloc(desc, block::STRONG_STATUS_INIT);
            Strong::from_block(Some(block))
        }
    }

    /// Takes ownership of a boxed slice, returning the sole strong handle
    /// to it. Every element drops when the last strong handle releases.
    pub fn from_boxed_slice(data: Box<[T]>) -> Strong<T> where T: 'static {
        unsafe {
            // Unwrap the allocation; the descriptor owns it from here on.
            let desc = ArrayDesc::from_raw(Box::into_raw(data));
            // Allocate a control block seeded with a single strong reference.
            let block = block::alloc(desc, block::STRONG_STATUS_INIT);
            Strong::from_block(Some(block))
        }
    }

    /// Takes ownership of a vector, returning the sole strong handle to
    /// its elements.
    #[inline]
    pub fn from_vec(data: Vec<T>) -> Strong<T> where T: 'static {
        Strong::from_boxed_slice(data.into_boxed_slice())
    }

    /// Takes ownership of a boxed intrusive payload, bootstrapping its
    /// embedded control block and returning the first strong handle to it.
    /// Returns an error if the incremented strong count overflows
    /// `STRONG_COUNT_MAX`.
    pub fn try_adopt(data: Box<T>) -> Result<Strong<T>, HandleError>
        where T: Intrusive + 'static
    {
        unsafe {
            // Unwrap the allocation; the payload's block owns it from here on.
            let data = Box::into_raw(data);
            // Get the payload's embedded control block, bootstrapping it on
            // first adoption.
            let block = (*data).anchor().block_for(data);
            // Acquire the strong reference.
            match block.as_ref().try_retain_strong() {
                Ok(_) => Ok(Strong::from_block(Some(block))),
                Err(error) => {
                    // Rebox and drop the payload; its anchor reconciles the
                    // block with any outstanding handles.
                    drop(Box::from_raw(data));
                    Err(error)
                },
            }
        }
    }

    /// Takes ownership of a boxed intrusive payload, bootstrapping its
    /// embedded control block and returning the first strong handle to it.
    ///
    /// # Panics
    ///
    /// Panics if the incremented strong count overflows `STRONG_COUNT_MAX`.
    #[inline]
    pub fn adopt(data: Box<T>) -> Strong<T> where T: Intrusive + 'static {
        Strong::try_adopt(data).unwrap()
    }

    /// Returns a new strong handle to an adopted intrusive payload, sharing
    /// the payload's embedded control block. Returns an error if the payload
    /// has been released, or if the incremented strong count overflows
    /// `STRONG_COUNT_MAX`.
    ///
    /// # Panics
    ///
    /// Panics if the payload has not been adopted.
    pub fn try_from_payload(data: &T) -> Result<Strong<T>, HandleError>
        where T: Intrusive
    {
        unsafe {
            // Get the payload's embedded control block.
            let block = data.anchor().block();
            // Check if the payload has already been released.
            if block.as_ref().desc.is_released() {
                return Err(HandleError::Cleared);
            }
            // Acquire the strong reference.
            block.as_ref().try_retain_strong()?;
            Ok(Strong::from_block(Some(block)))
        }
    }

    /// Returns a new strong handle to an adopted intrusive payload, sharing
    /// the payload's embedded control block.
    ///
    /// # Panics
    ///
    /// Panics if the payload has not been adopted, has been released, or if
    /// the incremented strong count overflows `STRONG_COUNT_MAX`.
    #[inline]
    pub fn from_payload(data: &T) -> Strong<T> where T: Intrusive {
        Strong::try_from_payload(data).unwrap()
    }

    /// Constructs a handle from a control block whose strong reference has
    /// already been acquired.
    #[inline]
    pub(crate) fn from_block(block: Option<NonNull<Block>>) -> Strong<T> {
        Strong {
            block,
            payload: PhantomData,
        }
    }

    /// Returns the referenced control block.
    #[inline]
    fn block(&self) -> Option<&Block> {
        match self.block {
            Some(block) => unsafe { Some(block.as_ref()) },
            None => None,
        }
    }

    /// Returns the payload address, or null if the handle is empty.
    #[inline]
    pub(crate) fn address(&self) -> *mut () {
        match self.block() {
            Some(block) => block.desc.address(),
            None => core::ptr::null_mut(),
        }
    }

    /// Returns `true` if the handle references a resource with at least
    /// one payload slot.
    #[inline]
    pub fn is_attached(&self) -> bool {
        !self.address().is_null() && self.len() != 0
    }

    /// Returns the number of strong handles to the shared resource;
    /// zero if this handle is empty.
    #[inline]
    pub fn strong_count(&self) -> u32 {
        match self.block() {
            Some(block) => block.strong_count(),
            None => 0,
        }
    }

    /// Returns the number of weak handles to the shared resource;
    /// zero if this handle is empty.
    #[inline]
    pub fn weak_count(&self) -> u32 {
        match self.block() {
            Some(block) => block.weak_count(),
            None => 0,
        }
    }

    /// Returns the number of payload slots; 1 for a scalar payload,
    /// zero if this handle is empty.
    #[inline]
    pub fn len(&self) -> usize {
        match self.block() {
            Some(block) => block.desc.len(),
            None => 0,
        }
    }

    /// Returns `true` if the handle references no payload slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the shared payload, or `None` if the handle
    /// is empty.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        let data = self.address() as *mut T;
        // A zero-length array attachment stores a dangling sentinel; only
        // a non-null address with at least one slot dereferences.
        if data.is_null() || self.len() == 0 {
            return None;
        }
        unsafe { Some(&*data) }
    }

    /// Returns a reference to the payload slot at `index`, or `None` if the
    /// handle is empty or `index` is out of bounds.
    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&T> {
        let data = self.address() as *mut T;
        // Check if the handle is empty or the index exceeds the slot count.
        if data.is_null() || index >= self.len() {
            return None;
        }
        unsafe { Some(&*data.add(index)) }
    }

    /// Returns the shared payload slots as a slice, or `None` if the handle
    /// is empty.
    #[inline]
    pub fn as_slice(&self) -> Option<&[T]> {
        let data = self.address() as *mut T;
        // Check if the handle is empty.
        if data.is_null() {
            return None;
        }
        unsafe { Some(core::slice::from_raw_parts(data, self.len())) }
    }

    /// Returns a raw pointer to the shared payload.
    ///
    /// # Safety
    ///
    /// The pointer is null if the handle is empty, and dangles once the
    /// last strong handle releases.
    #[inline]
    pub unsafe fn as_ptr_unchecked(&self) -> *mut T {
        self.address() as *mut T
    }

    /// Returns `true` if both handles share one control block. Two empty
    /// handles are considered to share.
    #[inline]
    pub fn ptr_eq<U>(&self, other: &Strong<U>) -> bool {
        self.block == other.block
    }

    /// Returns a new strong handle to the shared resource, returning an
    /// error if the incremented strong count overflows `STRONG_COUNT_MAX`.
    /// Cloning an empty handle yields an empty handle.
    pub fn try_clone(&self) -> Result<Strong<T>, HandleError> {
        match self.block() {
            Some(block) => {
                // Acquire another strong reference.
                block.try_retain_strong()?;
                Ok(Strong::from_block(self.block))
            },
            None => Ok(Strong::empty()),
        }
    }

    /// Converts this handle into a handle viewing the payload as `U`,
    /// without touching the reference counts.
    #[inline]
    pub fn upcast<U>(self) -> Strong<U> where T: Upcast<U> {
        // Transfer the strong reference to the new handle.
        let block = self.block;
        mem::forget(self);
        Strong::from_block(block)
    }

    /// Returns a weak handle to the shared resource, returning an error if
    /// the incremented weak count overflows `WEAK_COUNT_MAX`. Downgrading
    /// an empty handle yields an empty weak handle.
    pub fn try_downgrade(&self) -> Result<Weak<T>, HandleError> {
        match self.block() {
            Some(block) => {
                // Acquire the weak reference.
                block.try_retain_weak()?;
                Ok(Weak::from_block(self.block))
            },
            None => Ok(Weak::empty()),
        }
    }

    /// Returns a weak handle to the shared resource.
    ///
    /// # Panics
    ///
    /// Panics if the incremented weak count overflows `WEAK_COUNT_MAX`.
    #[inline]
    pub fn downgrade(&self) -> Weak<T> {
        self.try_downgrade().unwrap()
    }

    /// Detaches this handle, releasing its strong reference and leaving the
    /// handle empty.
    #[inline]
    pub fn clear(&mut self) {
        *self = Strong::empty();
    }

    /// Converts this handle into a raw control block pointer, without
    /// releasing its strong reference; `None` if the handle is empty.
    /// Use `Strong::from_raw` to reconstitute the returned pointer back
    /// into a strong handle.
    ///
    /// # Safety
    ///
    /// The resource leaks unless the returned pointer is eventually
    /// converted back into a strong handle and dropped.
    #[inline]
    pub unsafe fn into_raw(self) -> Option<NonNull<Block>> {
        let block = self.block;
        mem::forget(self);
        block
    }

    /// Constructs a strong handle from a raw control block pointer returned
    /// by `Strong::into_raw`.
    ///
    /// # Safety
    ///
    /// `block` must have come from `Strong::into_raw` of a handle to a
    /// payload of type `T`, and must not be reconstituted twice.
    #[inline]
    pub unsafe fn from_raw(block: Option<NonNull<Block>>) -> Strong<T> {
        Strong::from_block(block)
    }
}

impl<T> Drop for Strong<T> {
    fn drop(&mut self) {
        // Empty handles hold no reference.
        let block = match self.block {
            Some(block) => block.as_ptr(),
            None => return,
        };
        unsafe {
            // Release the strong reference; other strong handles keep the
            // payload alive.
            if (*block).release_strong() != 0 {
                return;
            }
            // Pin the block with a weak reference across payload
            // destruction; the payload's destructor may drop handles to
            // this very block, and those must leave reclamation to us.
            if (*block).try_retain_weak().is_ok() {
                // Destroy the payload with its erased deletion semantics.
                (*block).desc.release();
                // Release the pin.
                (*block).release_weak();
                // Check if no reference of any kind remains.
                if (*block).is_unreferenced() {
                    // Free the control block.
                    block::dealloc(block);
                }
            } else {
                // The weak count is saturated; the outstanding weak handles
                // reclaim the block, possibly during this release.
                (*block).desc.release();
            }
        }
    }
}

impl<T> Clone for Strong<T> {
    /// Returns a new strong handle to the shared resource.
    ///
    /// # Panics
    ///
    /// Panics if the incremented strong count overflows `STRONG_COUNT_MAX`.
    #[inline]
    fn clone(&self) -> Strong<T> {
        self.try_clone().unwrap()
    }

    fn clone_from(&mut self, source: &Strong<T>) {
        // Assigning a handle over itself must not release its reference.
        if self.block == source.block {
            return;
        }
        *self = source.clone();
    }
}

impl<T> Default for Strong<T> {
    #[inline]
    fn default() -> Strong<T> {
        Strong::empty()
    }
}

impl<T> Deref for Strong<T> {
    type Target = T;

    /// Dereferences the shared payload; for an array attachment, the first
    /// slot.
    ///
    /// # Panics
    ///
    /// Panics if the handle is empty, or references a zero-length array.
    #[inline]
    fn deref(&self) -> &T {
        match self.get() {
            Some(data) => data,
            None => panic!("dereferenced an unattached handle"),
        }
    }
}

impl<T> Index<usize> for Strong<T> {
    type Output = T;

    /// Returns the payload slot at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is empty, or if `index` is out of bounds.
    #[inline]
    fn index(&self, index: usize) -> &T {
        match self.get_index(index) {
            Some(data) => data,
            None => panic!("handle index out of bounds"),
        }
    }
}

impl<T, U> PartialEq<Strong<U>> for Strong<T> where T: Upcast<U> {
    /// Returns `true` if both handles address the same payload, or if both
    /// are empty. Defined across convertible payload types.
    #[inline]
    fn eq(&self, other: &Strong<U>) -> bool {
        self.address() == other.address()
    }
}

impl<T> Eq for Strong<T> {
}

impl<T, U> PartialEq<Weak<U>> for Strong<T> where T: Upcast<U> {
    #[inline]
    fn eq(&self, other: &Weak<U>) -> bool {
        self.address() == other.address()
    }
}

impl<T> PartialEq<*const T> for Strong<T> {
    #[inline]
    fn eq(&self, other: &*const T) -> bool {
        self.address() == *other as *mut ()
    }
}

impl<T> Debug for Strong<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.get() {
            Some(data) => f.debug_tuple("Strong").field(&(data as *const T)).finish(),
            None => f.write_str("Strong(empty)"),
        }
    }
}

impl<T> Pointer for Strong<T> {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Pointer::fmt(&self.address(), f)
    }
}
