//! Handle-style entry points
//!
//! Thin free functions over [`PoolManager`] for callers that pass the
//! allocator around as an explicit handle.
//!
//! ```
//! use mempool::api;
//!
//! let mp = api::init(256)?;
//! let ptr = api::alloc(&mp, 40, true);
//! // SAFETY: ptr came from `mp` with size 40 and is not used afterwards.
//! let ptr = unsafe { api::realloc(&mp, ptr, 40, 400) };
//! unsafe { api::free(&mp, 400, ptr) };
//! api::teardown(mp);
//! # Ok::<(), mempool::MemoryError>(())
//! ```

use core::ptr::NonNull;

use crate::error::MemoryResult;
use crate::manager::PoolManager;

/// Creates a manager serving objects up to `max_size` bytes from pools.
pub fn init(max_size: usize) -> MemoryResult<PoolManager> {
    PoolManager::new(max_size)
}

/// Allocates `size` bytes, falling back to the system allocator above the
/// largest class.
#[inline]
pub fn alloc(mp: &PoolManager, size: usize, zero: bool) -> NonNull<u8> {
    mp.allocate(size, zero)
}

/// Releases `size` bytes at `ptr`.
///
/// # Safety
///
/// See [`PoolManager::release`].
#[inline]
pub unsafe fn free(mp: &PoolManager, size: usize, ptr: NonNull<u8>) {
    // SAFETY: forwarded caller contract.
    unsafe { mp.release(size, ptr) }
}

/// Moves `old_size` bytes at `ptr` into a fresh `new_size` allocation.
///
/// # Safety
///
/// See [`PoolManager::reallocate`].
#[inline]
pub unsafe fn realloc(mp: &PoolManager, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> NonNull<u8> {
    // SAFETY: forwarded caller contract.
    unsafe { mp.reallocate(ptr, old_size, new_size) }
}

/// Releases every pool owned by `mp`.
pub fn teardown(mp: PoolManager) {
    mp.teardown();
}
