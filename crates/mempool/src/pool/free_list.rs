//! Intrusive recycle list threaded through released slots
//!
//! # Safety
//!
//! A released slot stores the link to the next released slot in its own first
//! word. The list never allocates; it only reads and writes that word.
//!
//! ## Invariants
//!
//! - Every pushed slot is at least one word long and word aligned
//! - A slot is on the list at most once (callers must not release twice)
//! - Nobody else touches a slot's first word while it is on the list
//! - The list is only mutated by the pool holding its state lock

use core::ptr::{self, NonNull};

/// Link stored in the first word of a released slot
#[repr(C)]
struct FreeSlot {
    next: *mut FreeSlot,
}

/// LIFO list of released slots
pub(crate) struct FreeList {
    head: *mut FreeSlot,
    len: usize,
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self {
            head: ptr::null_mut(),
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Push `slot` on top of the list.
    ///
    /// # Safety
    ///
    /// - `slot` must be valid for writes of one pointer and word aligned
    /// - `slot` must not already be on this list
    /// - `slot` must stay valid (its block alive) while it is on the list
    #[inline]
    pub(crate) unsafe fn push(&mut self, slot: NonNull<u8>) {
        let node = slot.cast::<FreeSlot>();

        // SAFETY: Writing the link into a released slot.
        // - caller guarantees the slot is writable and word aligned
        // - the slot is not on the list, so no other link points at it yet
        unsafe {
            node.as_ptr().write(FreeSlot { next: self.head });
        }

        self.head = node.as_ptr();
        self.len += 1;
    }

    /// Pop the most recently pushed slot.
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<NonNull<u8>> {
        let head = NonNull::new(self.head)?;

        // SAFETY: Reading the link from the list head.
        // - head was written by `push`, whose contract keeps it valid and aligned
        // - the state lock held by the owning pool serializes this read with
        //   the write performed by `push`, possibly on another thread
        self.head = unsafe { head.as_ptr().read().next };
        self.len -= 1;

        Some(head.cast())
    }

    /// Walk the list from head to tail.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = NonNull<u8>> + '_ {
        let mut cursor = self.head;
        core::iter::from_fn(move || {
            let node = NonNull::new(cursor)?;
            // SAFETY: every node on the list was written by `push`.
            cursor = unsafe { node.as_ptr().read().next };
            Some(node.cast())
        })
    }
}

// SAFETY: FreeList is Send because:
// - the slots it links are owned by the same pool that owns the list
// - all access goes through `&mut self`, i.e. through the pool's lock
unsafe impl Send for FreeList {}
