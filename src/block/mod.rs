use core::cell::Cell;
use core::ptr::NonNull;
use alloc::boxed::Box;
use crate::resource::Resource;

/// Strong reference count bit field mask.
pub(crate) const STRONG_COUNT_MASK: u32 = 0x0000FFFF;

/// Maximum number of simultaneous strong handles per resource. Exceeding it
/// is a checked error, not a silent wraparound.
pub const STRONG_COUNT_MAX: u32 = 0xFFFF;

/// Weak reference count bit field mask.
pub(crate) const WEAK_COUNT_MASK: u32 = 0xFFFF0000;

/// Number of trailing bits after the weak reference count bit field.
pub(crate) const WEAK_COUNT_SHIFT: u32 = 16;

/// Maximum number of simultaneous weak handles per resource.
pub const WEAK_COUNT_MAX: u32 = 0xFFFF;

/// Status field representing a single strong reference.
pub(crate) const STRONG_STATUS_INIT: u32 = 1;

/// Status field representing an unreferenced block.
pub(crate) const UNREFERENCED_STATUS: u32 = 0;

/// Reference counting error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleError {
    /// Payload already released.
    Cleared,
    /// Too many strong handles.
    StrongCountOverflow,
    /// Too many weak handles.
    WeakCountOverflow,
}

/// Control block: the pairing of one packed reference counter and one
/// type-erased resource descriptor; the unit of lifetime management.
///
/// A block is shared by every handle to one logically-distinct resource.
/// The strong and weak sub-counts occupy one status word, so "no handle of
/// any kind remains" is a single comparison against zero.
pub struct Block<D: ?Sized = dyn Resource> {
    /// Packed strong and weak reference counts.
    pub(crate) status: Cell<u32>,
    /// Type-erased descriptor of the managed payload.
    pub(crate) desc: D,
}

impl<D: ?Sized> Block<D> {
    /// Returns the number of strong references to the block.
    #[inline]
    pub fn strong_count(&self) -> u32 {
        // Extract and return the strong count bit field.
        self.status.get() & STRONG_COUNT_MASK
    }

    /// Returns the number of weak references to the block.
    #[inline]
    pub fn weak_count(&self) -> u32 {
        // Extract and return the weak count bit field.
        (self.status.get() & WEAK_COUNT_MASK) >> WEAK_COUNT_SHIFT
    }

    /// Returns `true` if neither strong nor weak references remain;
    /// a single comparison against the combined status word.
    #[inline]
    pub fn is_unreferenced(&self) -> bool {
        self.status.get() == UNREFERENCED_STATUS
    }

    /// Acquires a strong reference to the block, returning an error if the
    /// incremented strong count overflows `STRONG_COUNT_MAX`.
    pub(crate) fn try_retain_strong(&self) -> Result<(), HandleError> {
        // Load the status field.
        let old_status = self.status.get();
        // Extract the strong count bit field.
        let old_strong_count = old_status & STRONG_COUNT_MASK;
        // Increment the strong reference count.
        let new_strong_count = old_strong_count.wrapping_add(1);
        // Check if the incremented strong count overflows its bit field.
        if new_strong_count > STRONG_COUNT_MAX {
            return Err(HandleError::StrongCountOverflow);
        }
        // Clear the strong count bit field.
        let new_status = old_status & !STRONG_COUNT_MASK;
        // Splice the incremented strong count into the status field.
        self.status.set(new_status | new_strong_count);
        Ok(())
    }

    /// Acquires a weak reference to the block, returning an error if the
    /// incremented weak count overflows `WEAK_COUNT_MAX`.
    pub(crate) fn try_retain_weak(&self) -> Result<(), HandleError> {
        // Load the status field.
        let old_status = self.status.get();
        // Extract the weak count bit field.
        let old_weak_count = (old_status & WEAK_COUNT_MASK) >> WEAK_COUNT_SHIFT;
        // Increment the weak reference count.
        let new_weak_count = old_weak_count.wrapping_add(1);
        // Check if the incremented weak count overflows its bit field.
        if new_weak_count > WEAK_COUNT_MAX {
            return Err(HandleError::WeakCountOverflow);
        }
        // Clear the weak count bit field.
        let new_status = old_status & !WEAK_COUNT_MASK;
        // Splice the incremented weak count into the status field.
        self.status.set(new_status | new_weak_count << WEAK_COUNT_SHIFT);
        Ok(())
    }

    /// Releases a strong reference; returns the decremented strong count.
    ///
    /// # Panics
    ///
    /// Panics if the strong count is already zero.
    pub(crate) fn release_strong(&self) -> u32 {
        // Load the status field.
        let old_status = self.status.get();
        // Extract the strong count bit field.
        let old_strong_count = old_status & STRONG_COUNT_MASK;
        // Decrement the strong reference count, checking for underflow.
        let new_strong_count = match old_strong_count.checked_sub(1) {
            Some(strong_count) => strong_count,
            None => panic!("strong count underflow"),
        };
        // Clear the strong count bit field.
        let new_status = old_status & !STRONG_COUNT_MASK;
        // Splice the decremented strong count into the status field.
        self.status.set(new_status | new_strong_count);
        new_strong_count
    }

    /// Releases a weak reference; returns the decremented weak count.
    ///
    /// # Panics
    ///
    /// Panics if the weak count is already zero.
    pub(crate) fn release_weak(&self) -> u32 {
        // Load the status field.
        let old_status = self.status.get();
        // Extract the weak count bit field.
        let old_weak_count = (old_status & WEAK_COUNT_MASK) >> WEAK_COUNT_SHIFT;
        // Decrement the weak reference count, checking for underflow.
        let new_weak_count = match old_weak_count.checked_sub(1) {
            Some(weak_count) => weak_count,
            None => panic!("weak count underflow"),
        };
        // Clear the weak count bit field.
        let new_status = old_status & !WEAK_COUNT_MASK;
        // Splice the decremented weak count into the status field.
        self.status.set(new_status | new_weak_count << WEAK_COUNT_SHIFT);
        new_weak_count
    }
}

/// Allocates a control block for `desc`, initialized with the given count
/// `status`. The block is freed by whichever party observes both counts at
/// zero with the descriptor released.
pub(crate) fn alloc<D: Resource + 'static>(desc: D, status: u32) -> NonNull<Block> {
    // Move the descriptor into a fresh block allocation.
    let block: Box<Block> = Box::new(Block {
        status: Cell::new(status),
        desc,
    });
    // Leak the box; the last reference out reclaims it.
    NonNull::from(Box::leak(block))
}

/// Frees a control block previously returned by `alloc`.
///
/// # Safety
///
/// `block` must have been allocated by `alloc`, both of its counts must be
/// zero, and no handle or anchor may reference it afterwards.
pub(crate) unsafe fn dealloc(block: *mut Block) {
    // Reconstitute and drop the boxed block.
    drop(Box::from_raw(block));
}
