//! Pool manager: size-class table, lazy pools and the bootstrap pool
//!
//! # Architecture
//! ```text
//! PoolManager
//!   classes:   [8][16][32][64][128][256]        fixed at construction
//!   pools:     [ * ][null][ * ][null][null][ * ] AtomicPtr per class
//!                 ↓          ↓                ↓
//!   bootstrap: SizeClassPool of size_of::<SizeClassPool>() slots
//! ```
//!
//! Class pools are built on first use inside a bootstrap slot and published
//! with a compare-and-swap. No class lock is held while a pool is built; a
//! thread that loses the publication race drops its pool and hands the slot
//! back to the bootstrap pool.

use core::alloc::Layout;
use core::fmt;
use core::mem;
use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicPtr, Ordering};

#[cfg(feature = "logging")]
use tracing::{debug, error};

use crate::config::ManagerConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::fallback;
use crate::pool::{PoolStats, SizeClassPool};
use crate::size_class;

/// Size-classed allocator front end
///
/// Maps each request to the smallest power-of-two class covering it and
/// delegates to that class's [`SizeClassPool`]. Requests above the largest
/// class go to the system allocator through [`PoolManager::allocate`], or
/// report a capacity miss through [`PoolManager::try_allocate`].
///
/// # Examples
/// ```
/// use mempool::PoolManager;
///
/// let manager = PoolManager::new(256)?;
/// let ptr = manager.allocate(24, true);
/// // SAFETY: ptr came from this manager with size 24.
/// unsafe { manager.release(24, ptr) };
/// manager.teardown();
/// # Ok::<(), mempool::MemoryError>(())
/// ```
pub struct PoolManager {
    config: ManagerConfig,

    /// Ascending class thresholds, starting at the word size
    classes: Box<[usize]>,

    /// Validated block layout per class
    layouts: Box<[Layout]>,

    /// Lazily published class pools, each living in a bootstrap slot
    pools: Box<[AtomicPtr<SizeClassPool>]>,

    /// Pool whose slots hold the class pools themselves
    bootstrap: SizeClassPool,
}

impl PoolManager {
    /// Creates a manager serving objects up to `max_size` bytes from pools
    ///
    /// # Errors
    /// Returns [`MemoryError::InvalidConfig`] if `max_size` yields a class
    /// whose blocks cannot be allocated.
    pub fn new(max_size: usize) -> MemoryResult<Self> {
        Self::with_config(ManagerConfig::new(max_size))
    }

    /// Creates a manager from a full configuration
    ///
    /// # Errors
    /// Returns [`MemoryError::InvalidConfig`] if the configuration fails
    /// [`ManagerConfig::validate`].
    pub fn with_config(config: ManagerConfig) -> MemoryResult<Self> {
        config.validate()?;

        let classes = size_class::size_classes(config.max_size)?;
        let layouts = classes
            .iter()
            .map(|&class| SizeClassPool::block_layout_for(class))
            .collect::<MemoryResult<Vec<_>>>()?;
        let pools = classes
            .iter()
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect::<Box<[_]>>();

        let bootstrap = SizeClassPool::new(size_of::<SizeClassPool>(), config.pool.clone())?;
        if align_of::<SizeClassPool>() > bootstrap.slot_align() {
            return Err(MemoryError::invalid_alignment(
                align_of::<SizeClassPool>(),
                bootstrap.slot_align(),
            ));
        }

        #[cfg(feature = "logging")]
        debug!(
            max_size = config.max_size,
            classes = classes.len(),
            largest = classes.last().copied().unwrap_or_default(),
            "pool manager created"
        );

        Ok(Self {
            config,
            classes: classes.into_boxed_slice(),
            layouts: layouts.into_boxed_slice(),
            pools,
            bootstrap,
        })
    }

    /// Returns the configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Returns the size-class thresholds, ascending
    pub fn size_classes(&self) -> &[usize] {
        &self.classes
    }

    /// Returns the largest size served from a pool
    pub fn max_class(&self) -> usize {
        self.classes.last().copied().unwrap_or(size_class::WORD_SIZE)
    }

    /// Smallest class threshold covering `size`, if any
    pub fn class_for(&self, size: usize) -> Option<usize> {
        size_class::class_index(&self.classes, size).map(|index| self.classes[index])
    }

    /// Pool for the class covering `size`, created on first use
    ///
    /// Returns `None` when `size` exceeds the largest class.
    pub fn find_or_create_pool(&self, size: usize) -> Option<&SizeClassPool> {
        let index = size_class::class_index(&self.classes, size)?;
        Some(self.loaded(index).unwrap_or_else(|| self.create_pool(index)))
    }

    /// Pool for the class covering `size` if it has been created
    pub fn pool(&self, size: usize) -> Option<&SizeClassPool> {
        self.loaded(size_class::class_index(&self.classes, size)?)
    }

    /// Allocates `size` bytes from a pool
    ///
    /// Returns `None` (capacity miss) when `size` exceeds the largest class.
    pub fn try_allocate(&self, size: usize, zero: bool) -> Option<NonNull<u8>> {
        self.find_or_create_pool(size).map(|pool| pool.allocate(zero))
    }

    /// Allocates `size` bytes, from a pool or from the system allocator
    ///
    /// Memory exhaustion is fatal.
    pub fn allocate(&self, size: usize, zero: bool) -> NonNull<u8> {
        self.try_allocate(size, zero)
            .unwrap_or_else(|| fallback::allocate(size, zero))
    }

    /// Returns memory obtained from [`Self::allocate`] or [`Self::try_allocate`]
    ///
    /// # Safety
    ///
    /// Caller must ensure:
    /// - `ptr` came from this manager with exactly this `size`
    /// - `ptr` has not been released since
    /// - nothing uses `ptr` after this call
    pub unsafe fn release(&self, size: usize, ptr: NonNull<u8>) {
        let Some(index) = size_class::class_index(&self.classes, size) else {
            // SAFETY: sizes above the largest class were served by the
            // fallback path with this size (caller contract).
            unsafe { fallback::deallocate(ptr, size) };
            return;
        };

        match self.loaded(index) {
            // SAFETY: caller contract; the size maps to the class that
            // allocated ptr.
            Some(pool) => unsafe { pool.release(ptr) },
            None => {
                #[cfg(feature = "logging")]
                error!(
                    size,
                    addr = ptr.as_ptr() as usize,
                    "release into a size class that never allocated"
                );
            }
        }
    }

    /// Returns memory after validating it against the owning pool
    ///
    /// # Errors
    /// - [`MemoryError::ExceedsMaxSize`] if `size` is above the largest class
    ///   (fallback blocks cannot be validated)
    /// - [`MemoryError::TrackingDisabled`] without `track_slots`
    /// - [`MemoryError::ForeignPointer`] / [`MemoryError::DoubleFree`] on
    ///   misuse; the pool is left untouched
    pub fn checked_release(&self, size: usize, ptr: NonNull<u8>) -> MemoryResult<()> {
        let index = size_class::class_index(&self.classes, size)
            .ok_or_else(|| MemoryError::allocation_too_large(size, self.max_class()))?;

        match self.loaded(index) {
            Some(pool) => pool.checked_release(ptr),
            None => Err(MemoryError::foreign_pointer(
                ptr.as_ptr() as usize,
                self.classes[index],
            )),
        }
    }

    /// Moves an allocation to `new_size` bytes
    ///
    /// Always allocates anew, copies `min(old_size, new_size)` bytes and
    /// releases the old memory.
    ///
    /// # Safety
    ///
    /// Same contract as [`Self::release`] for `ptr` and `old_size`.
    pub unsafe fn reallocate(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> NonNull<u8> {
        let new = self.allocate(new_size, false);

        // SAFETY: Copying into the new allocation.
        // - ptr holds old_size readable bytes (caller contract)
        // - new holds new_size writable bytes
        // - new is a distinct live allocation, so the ranges do not overlap
        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), new.as_ptr(), old_size.min(new_size));
            self.release(old_size, ptr);
        }

        new
    }

    /// Snapshots of every class pool created so far, ascending by size
    pub fn stats(&self) -> Vec<PoolStats> {
        (0..self.classes.len())
            .filter_map(|index| self.loaded(index))
            .map(SizeClassPool::stats)
            .collect()
    }

    /// Snapshot of the pool holding the class pools
    pub fn bootstrap_stats(&self) -> PoolStats {
        self.bootstrap.stats()
    }

    /// Releases every class pool, then the bootstrap pool
    ///
    /// Consuming `self` makes further use impossible; dropping the manager
    /// does the same.
    pub fn teardown(self) {
        drop(self);
    }

    fn loaded(&self, index: usize) -> Option<&SizeClassPool> {
        let pool = self.pools[index].load(Ordering::Acquire);

        // SAFETY: non-null entries point at pools fully initialized before
        // their Release publication, which live until the manager drops.
        unsafe { pool.as_ref() }
    }

    #[cold]
    fn create_pool(&self, index: usize) -> &SizeClassPool {
        let object_size = self.classes[index];
        let slot = self.bootstrap.allocate(false).cast::<SizeClassPool>();

        // SAFETY: Building the pool in a bootstrap slot.
        // - bootstrap slots are size_of::<SizeClassPool>() bytes
        // - their alignment was checked against SizeClassPool in with_config
        // - the slot is freshly allocated and unshared
        unsafe {
            slot.as_ptr().write(SizeClassPool::with_layout(
                object_size,
                self.layouts[index],
                self.config.pool.clone(),
            ));
        }

        match self.pools[index].compare_exchange(
            ptr::null_mut(),
            slot.as_ptr(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                #[cfg(feature = "logging")]
                debug!(object_size, "size-class pool created");

                // SAFETY: just published; lives until the manager drops.
                unsafe { slot.as_ref() }
            }
            Err(winner) => {
                // SAFETY: Discarding the losing pool.
                // - it was never published, so no other thread saw it
                // - it has no blocks yet, dropping frees nothing else
                // - its slot goes back to the bootstrap pool exactly once
                unsafe {
                    ptr::drop_in_place(slot.as_ptr());
                    self.bootstrap.release(slot.cast());
                    &*winner
                }
            }
        }
    }
}

impl Drop for PoolManager {
    fn drop(&mut self) {
        let mut released = 0usize;
        for entry in self.pools.iter_mut() {
            let pool = mem::replace(entry.get_mut(), ptr::null_mut());
            let Some(pool) = NonNull::new(pool) else {
                continue;
            };

            // SAFETY: Destroying a class pool.
            // - &mut self: no outstanding borrows of any pool remain
            // - the pool lives in a bootstrap slot and is dropped exactly once
            //   (its entry is nulled above)
            unsafe {
                ptr::drop_in_place(pool.as_ptr());
                self.bootstrap.release(pool.cast());
            }
            released += 1;
        }

        #[cfg(feature = "logging")]
        debug!(class_pools = released, "pool manager torn down");
        #[cfg(not(feature = "logging"))]
        let _ = released;
    }
}

impl fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let created = (0..self.classes.len())
            .filter(|&index| self.loaded(index).is_some())
            .count();
        f.debug_struct("PoolManager")
            .field("config", &self.config)
            .field("classes", &self.classes)
            .field("created", &created)
            .finish_non_exhaustive()
    }
}
