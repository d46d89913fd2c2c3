use core::cell::Cell;
use core::marker::PhantomData;
use core::ptr::NonNull;
use crate::block::{self, Block};
use crate::resource::ScalarDesc;

/// The intrusive capability: a payload that supplies its own control block
/// instead of having the library allocate one per attachment.
///
/// A type opts in by embedding an [`Anchor`] field and returning it from
/// `anchor`. Every handle constructed from the payload, by adoption or by
/// self-reference, then shares the single block the anchor bootstraps, so
/// a self-referential structure such as a parent/children tree costs one
/// control block per node, created once, at first adoption.
///
/// An adopted payload must not be destroyed by any mechanism other than the
/// release of its last strong handle while handles referencing it exist.
pub trait Intrusive: Sized {
    /// Returns the payload's embedded anchor.
    fn anchor(&self) -> &Anchor<Self>;
}

/// Embedded control-block storage for an intrusive payload.
///
/// The block is bootstrapped on first adoption with both reference counts
/// pre-seeded to zero; no strong handle exists until adoption takes the
/// first strong reference.
pub struct Anchor<T> {
    /// Bootstrapped control block, or `None` before adoption.
    block: Cell<Option<NonNull<Block>>>,
    /// Variant over the owning payload type.
    payload: PhantomData<*const T>,
}

impl<T> Anchor<T> {
    /// Constructs an anchor with no control block; the block is
    /// bootstrapped when the payload is first adopted.
    #[inline]
    pub const fn new() -> Anchor<T> {
        Anchor {
            block: Cell::new(None),
            payload: PhantomData,
        }
    }

    /// Returns `true` once the payload has been adopted.
    #[inline]
    pub fn is_adopted(&self) -> bool {
        self.block.get().is_some()
    }

    /// Returns the bootstrapped control block.
    ///
    /// # Panics
    ///
    /// Panics if the payload has not been adopted.
    #[inline]
    pub(crate) fn block(&self) -> NonNull<Block> {
        match self.block.get() {
            Some(block) => block,
            None => panic!("intrusive payload not adopted"),
        }
    }

    /// Returns the payload's control block, bootstrapping it on first use.
    ///
    /// # Safety
    ///
    /// `payload` must address the live heap allocation that owns this
    /// anchor.
    pub(crate) unsafe fn block_for(&self, payload: *mut T) -> NonNull<Block>
        where T: 'static
    {
        // Reuse the block bootstrapped by an earlier adoption.
        if let Some(block) = self.block.get() {
            return block;
        }
        // Construct a scalar descriptor addressing the payload itself.
        let desc = ScalarDesc::from_raw(payload);
        // Allocate the block with both counts pre-seeded to zero; no handle
        // references the payload yet.
        let block = block::alloc(desc, block::UNREFERENCED_STATUS);
        self.block.set(Some(block));
        block
    }
}

impl<T> Default for Anchor<T> {
    #[inline]
    fn default() -> Anchor<T> {
        Anchor::new()
    }
}

impl<T> Drop for Anchor<T> {
    fn drop(&mut self) {
        // Unadopted payloads own no block.
        let block = match self.block.get() {
            Some(block) => block.as_ptr(),
            None => return,
        };
        unsafe {
            // A released descriptor marks handle-driven destruction; the
            // releasing handle reclaims the block.
            if (*block).desc.is_released() {
                return;
            }
            // The payload is being destroyed outside the handle system.
            // Clear the descriptor so no handle can release it again.
            (*block).desc.abandon();
            if (*block).is_unreferenced() {
                // No handles remain; reclaim the block here.
                block::dealloc(block);
            } else {
                // Outstanding handles now observe a released payload; the
                // last one out reclaims the block.
                log::error!(
                    "intrusive payload dropped with {} strong and {} weak handles outstanding",
                    (*block).strong_count(),
                    (*block).weak_count(),
                );
            }
        }
    }
}
