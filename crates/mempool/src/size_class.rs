//! Size class table and block sizing.
//!
//! Objects are bucketed into power-of-two size classes, starting at the
//! machine word size. A request is served by the smallest class whose
//! threshold covers it; anything above the largest class bypasses the pools.

use crate::error::{MemoryError, MemoryResult};

/// Machine word size; the smallest size class and the minimum slot size.
pub const WORD_SIZE: usize = size_of::<usize>();

/// Objects at or above this size get [`BIG_BLOCK`] slots per block.
pub const HUGE_OBJECT: usize = 64 * WORD_SIZE;

/// Slots per block for objects below [`HUGE_OBJECT`].
pub const SMALL_BLOCK: usize = 512;

/// Slots per block for objects at or above [`HUGE_OBJECT`].
pub const BIG_BLOCK: usize = 16;

/// Upper bound on slot alignment (one cache line).
pub const MAX_SLOT_ALIGN: usize = 64;

/// Default ceiling used by [`ManagerConfig::default`](crate::ManagerConfig).
pub const DEFAULT_MAX_SIZE: usize = 256;

/// Number of slots carved from each block for a given object size.
///
/// Large objects get fewer slots per block to bound the memory committed by a
/// single growth step; small objects get many to amortize growth.
#[inline]
pub const fn objects_per_block(object_size: usize) -> usize {
    if object_size < HUGE_OBJECT {
        SMALL_BLOCK
    } else {
        BIG_BLOCK
    }
}

/// Alignment every slot of a pool with this object size satisfies.
///
/// Slots sit at `object_size` multiples from a block base aligned to the
/// largest power of two dividing `object_size`, capped at [`MAX_SLOT_ALIGN`].
#[inline]
pub const fn slot_align(object_size: usize) -> usize {
    let natural = 1usize << object_size.trailing_zeros();
    if natural > MAX_SLOT_ALIGN {
        MAX_SLOT_ALIGN
    } else {
        natural
    }
}

/// Build the ascending size class table for `max_size`.
///
/// Starts at [`WORD_SIZE`] and doubles until the value reaches or exceeds
/// `max_size`, so the last class always covers `max_size`.
pub fn size_classes(max_size: usize) -> MemoryResult<Vec<usize>> {
    let mut classes = Vec::new();
    let mut class = WORD_SIZE;
    loop {
        block_bytes(class)?;
        classes.push(class);
        if class >= max_size {
            return Ok(classes);
        }
        class = class
            .checked_mul(2)
            .ok_or_else(|| MemoryError::size_overflow("size class doubling"))?;
    }
}

/// Index of the first class whose threshold covers `size`.
///
/// Linear scan; the table is short (under 20 entries for any realistic
/// ceiling).
#[inline]
pub fn class_index(classes: &[usize], size: usize) -> Option<usize> {
    classes.iter().position(|&threshold| size <= threshold)
}

/// Bytes in one block of `object_size` slots, checked against `isize::MAX`.
pub(crate) fn block_bytes(object_size: usize) -> MemoryResult<usize> {
    object_size
        .checked_mul(objects_per_block(object_size))
        .filter(|&bytes| bytes <= isize::MAX as usize - (MAX_SLOT_ALIGN - 1))
        .ok_or_else(|| MemoryError::size_overflow("block size calculation"))
}
