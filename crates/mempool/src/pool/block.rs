//! Fixed-capacity block of same-size slots.

use core::alloc::Layout;
use core::ptr::NonNull;
use std::alloc;

/// Where an address falls relative to a block's slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotLookup {
    /// Not inside this block
    Outside,
    /// Inside the block but not on a slot boundary
    Misaligned,
    /// Start of the slot with this index
    Slot(usize),
}

/// One zero-initialized allocation holding `objects_per_block` slots.
///
/// Blocks are only ever created and dropped; the pool never shrinks or moves
/// them, so slot addresses stay valid until the owning pool is dropped.
pub(crate) struct Block {
    base: NonNull<u8>,
    layout: Layout,
}

impl Block {
    /// Allocate a zeroed block. Memory exhaustion is fatal.
    pub(crate) fn zeroed(layout: Layout) -> Self {
        debug_assert!(layout.size() > 0);

        // SAFETY: Allocating a fresh zeroed region.
        // - layout has non-zero size (block_bytes is validated at pool construction)
        // - layout alignment is a power of two (from Layout::from_size_align)
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let Some(base) = NonNull::new(raw) else {
            alloc::handle_alloc_error(layout)
        };

        Self { base, layout }
    }

    /// Address of the first slot
    #[cfg(test)]
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Pointer to slot `index` for slots of `object_size` bytes
    #[inline]
    pub(crate) fn slot(&self, index: usize, object_size: usize) -> NonNull<u8> {
        debug_assert!((index + 1) * object_size <= self.layout.size());

        // SAFETY: Offsetting within the block allocation.
        // - index < objects_per_block, so the offset stays inside `layout.size()`
        // - base is non-null and the result of an in-bounds add is non-null
        unsafe { self.base.add(index * object_size) }
    }

    /// Classify `addr` against this block's slot grid
    #[inline]
    pub(crate) fn lookup(&self, addr: usize, object_size: usize) -> SlotLookup {
        let start = self.base.as_ptr() as usize;
        match addr.checked_sub(start) {
            Some(offset) if offset < self.layout.size() => {
                if offset.is_multiple_of(object_size) {
                    SlotLookup::Slot(offset / object_size)
                } else {
                    SlotLookup::Misaligned
                }
            }
            _ => SlotLookup::Outside,
        }
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: Returning the block to the system allocator.
        // - base was returned by alloc_zeroed with exactly this layout
        // - the block is dropped once, together with its pool
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) }
    }
}

// SAFETY: Block is Send because:
// - it uniquely owns its allocation (no aliasing Block for the same region)
// - the raw base pointer carries no thread affinity
unsafe impl Send for Block {}
