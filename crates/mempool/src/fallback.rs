//! System allocator path for requests above the largest size class

use core::alloc::Layout;
use core::ptr::NonNull;
use std::alloc;

#[cfg(feature = "logging")]
use tracing::trace;

use crate::size_class::WORD_SIZE;

/// Layout used for every fallback block of `size` bytes.
///
/// Word alignment matches what a pool slot of the largest class guarantees
/// at minimum, so callers see the same alignment on both paths.
fn layout(size: usize) -> Layout {
    match Layout::from_size_align(size, WORD_SIZE) {
        Ok(layout) => layout,
        Err(_) => capacity_overflow(size),
    }
}

#[cold]
#[inline(never)]
fn capacity_overflow(size: usize) -> ! {
    panic!("fallback allocation of {size} bytes exceeds isize::MAX")
}

/// Allocate `size` bytes from the system allocator. Exhaustion is fatal.
pub(crate) fn allocate(size: usize, zero: bool) -> NonNull<u8> {
    debug_assert!(size > 0);
    let layout = layout(size);

    #[cfg(feature = "logging")]
    trace!(size, zero, "size above largest class, using system allocator");

    // SAFETY: layout has non-zero size (every fallback size exceeds the
    // smallest class) and word alignment.
    let raw = unsafe {
        if zero {
            alloc::alloc_zeroed(layout)
        } else {
            alloc::alloc(layout)
        }
    };

    NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout))
}

/// Return a block obtained from [`allocate`].
///
/// # Safety
///
/// `ptr` must come from [`allocate`] with the same `size` and must not be
/// used afterwards.
pub(crate) unsafe fn deallocate(ptr: NonNull<u8>, size: usize) {
    // SAFETY: caller guarantees ptr was allocated with layout(size).
    unsafe { alloc::dealloc(ptr.as_ptr(), layout(size)) }
}
