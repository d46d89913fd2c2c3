use core::fmt::{self, Debug, Formatter, Pointer};
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;
use crate::anchor::Intrusive;
use crate::block::{self, Block, HandleError};
use crate::handle::{Strong, Upcast};

/// A non-owning, weakly counted handle to a shared resource.
///
/// A weak handle keeps the control block alive without keeping the payload
/// alive; once the last strong handle releases, the payload is destroyed
/// and every outstanding weak handle observes a cleared attachment. A weak
/// handle never dereferences directly; upgrade it to a strong handle to
/// access the payload.
pub struct Weak<T> {
    /// Shared control block, or `None` when empty.
    block: Option<NonNull<Block>>,
    /// Variant over the payload type.
    payload: PhantomData<*const T>,
}

impl<T> Weak<T> {
    /// Constructs an empty handle referencing no resource.
    #[inline]
    pub const fn empty() -> Weak<T> {
        Weak {
            block: None,
            payload: PhantomData,
        }
    }

    /// Returns a new weak handle to an adopted intrusive payload, sharing
    /// the payload's embedded control block. Returns an error if the
    /// incremented weak count overflows `WEAK_COUNT_MAX`.
    ///
    /// # Panics
    ///
    /// Panics if the payload has not been adopted.
    pub fn try_from_payload(data: &T) -> Result<Weak<T>, HandleError>
        where T: Intrusive
    {
        unsafe {
            // Get the payload's embedded control block.
            let block = data.anchor().block();
            // Acquire the weak reference.
            block.as_ref().try_retain_weak()?;
            Ok(Weak::from_block(Some(block)))
        }
    }

    /// Returns a new weak handle to an adopted intrusive payload, sharing
    /// the payload's embedded control block.
    ///
    /// # Panics
    ///
    /// Panics if the payload has not been adopted, or if the incremented
    /// weak count overflows `WEAK_COUNT_MAX`.
    #[inline]
    pub fn from_payload(data: &T) -> Weak<T> where T: Intrusive {
        Weak::try_from_payload(data).unwrap()
    }

    /// Constructs a handle from a control block whose weak reference has
    /// already been acquired.
    #[inline]
    pub(crate) fn from_block(block: Option<NonNull<Block>>) -> Weak<T> {
        Weak {
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

    /// Returns the payload address; null if the handle is empty or the
    /// payload has been released.
    #[inline]
    pub(crate) fn address(&self) -> *mut () {
        match self.block() {
            Some(block) => block.desc.address(),
            None => core::ptr::null_mut(),
        }
    }

    /// Returns `true` if the handle references a live resource with at
    /// least one payload slot. A weak handle detaches when the last strong
    /// handle releases.
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

    /// Returns the number of payload slots; zero if this handle is empty.
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

    /// Returns `true` if both handles share one control block. Two empty
    /// handles are considered to share.
    #[inline]
    pub fn ptr_eq<U>(&self, other: &Weak<U>) -> bool {
        self.block == other.block
    }

    /// Returns a strong handle to the shared resource, returning an error
    /// if the handle is empty, if the payload has already been released, or
    /// if the incremented strong count overflows `STRONG_COUNT_MAX`.
    pub fn try_upgrade(&self) -> Result<Strong<T>, HandleError> {
        let block = match self.block() {
            Some(block) => block,
            None => return Err(HandleError::Cleared),
        };
        // Check if the last strong handle has released the payload.
        if block.strong_count() == 0 {
            return Err(HandleError::Cleared);
        }
        // Acquire the strong reference.
        block.try_retain_strong()?;
        Ok(Strong::from_block(self.block))
    }

    /// Returns a strong handle to the shared resource, or `None` if the
    /// payload is no longer alive.
    ///
    /// # Panics
    ///
    /// Panics if the incremented strong count overflows `STRONG_COUNT_MAX`.
    pub fn upgrade(&self) -> Option<Strong<T>> {
        match self.try_upgrade() {
            Ok(handle) => Some(handle),
            Err(HandleError::Cleared) => None,
            Err(error) => panic!("{:?}", error),
        }
    }

    /// Returns a new weak handle to the shared resource, returning an error
    /// if the incremented weak count overflows `WEAK_COUNT_MAX`. Cloning an
    /// empty handle yields an empty handle.
    pub fn try_clone(&self) -> Result<Weak<T>, HandleError> {
        match self.block() {
            Some(block) => {
                // Acquire another weak reference.
                block.try_retain_weak()?;
                Ok(Weak::from_block(self.block))
            },
            None => Ok(Weak::empty()),
        }
    }

    /// Converts this handle into a handle viewing the payload as `U`,
    /// without touching the reference counts.
    #[inline]
    pub fn upcast<U>(self) -> Weak<U> where T: Upcast<U> {
        // Transfer the weak reference to the new handle.
        let block = self.block;
        mem::forget(self);
        Weak::from_block(block)
    }

    /// Detaches this handle, releasing its weak reference and leaving the
    /// handle empty.
    #[inline]
    pub fn clear(&mut self) {
        *self = Weak::empty();
    }
}

impl<T> Drop for Weak<T> {
    fn drop(&mut self) {
        // Empty handles hold no reference.
        let block = match self.block {
            Some(block) => block.as_ptr(),
            None => return,
        };
        unsafe {
            // Release the weak reference.
            (*block).release_weak();
            // Free the block once no reference of any kind remains and the
            // payload is gone.
            if (*block).is_unreferenced() && (*block).desc.is_released() {
                block::dealloc(block);
            }
        }
    }
}

impl<T> Clone for Weak<T> {
    /// Returns a new weak handle to the shared resource.
    ///
    /// # Panics
    ///
    /// Panics if the incremented weak count overflows `WEAK_COUNT_MAX`.
    #[inline]
    fn clone(&self) -> Weak<T> {
        self.try_clone().unwrap()
    }

    fn clone_from(&mut self, source: &Weak<T>) {
        // Assigning a handle over itself must not release its reference.
        if self.block == source.block {
            return;
        }
        *self = source.clone();
    }
}

impl<T> Default for Weak<T> {
    #[inline]
    fn default() -> Weak<T> {
        Weak::empty()
    }
}

impl<T, U> PartialEq<Weak<U>> for Weak<T> where T: Upcast<U> {
    /// Returns `true` if both handles address the same live payload, or if
    /// neither addresses one. Defined across convertible payload types.
    #[inline]
    fn eq(&self, other: &Weak<U>) -> bool {
        self.address() == other.address()
    }
}

impl<T> Eq for Weak<T> {
}

impl<T, U> PartialEq<Strong<U>> for Weak<T> where T: Upcast<U> {
    #[inline]
    fn eq(&self, other: &Strong<U>) -> bool {
        self.address() == other.address()
    }
}

impl<T> PartialEq<*const T> for Weak<T> {
    #[inline]
    fn eq(&self, other: &*const T) -> bool {
        self.address() == *other as *mut ()
    }
}

impl<T> Debug for Weak<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        // A weak handle never dereferences; only its address is printable.
        let data = self.address();
        if !data.is_null() {
            f.debug_tuple("Weak").field(&data).finish()
        } else {
            f.write_str("Weak(empty)")
        }
    }
}

impl<T> Pointer for Weak<T> {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Pointer::fmt(&self.address(), f)
    }
}
