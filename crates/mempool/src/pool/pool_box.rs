//! Owning pointer for values placed in a size-class pool

use core::fmt;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

use super::SizeClassPool;
use crate::error::{MemoryError, MemoryResult};
use crate::manager::PoolManager;

/// RAII smart pointer for one pool-allocated value
///
/// Like `Box`, but the value lives in a slot of a [`SizeClassPool`] and the
/// slot goes back to that pool when the box is dropped. The borrow of the
/// pool (and through it, the manager) keeps the slot's memory alive.
pub struct PoolBox<'m, T> {
    ptr: NonNull<T>,
    pool: &'m SizeClassPool,
    _owns: PhantomData<T>,
}

impl<'m, T> PoolBox<'m, T> {
    /// Places `value` in the class covering `size_of::<T>()`
    ///
    /// # Errors
    /// - [`MemoryError::ExceedsMaxSize`] if `T` is larger than the manager's
    ///   largest class
    /// - [`MemoryError::InvalidAlignment`] if the class's slots are less
    ///   aligned than `T`
    #[must_use = "allocated value must be used"]
    pub fn new_in(value: T, manager: &'m PoolManager) -> MemoryResult<Self> {
        let size = size_of::<T>();
        let pool = manager
            .find_or_create_pool(size)
            .ok_or_else(|| MemoryError::allocation_too_large(size, manager.max_class()))?;
        Self::in_pool(value, pool)
    }

    /// Places `value` in a slot of `pool`
    ///
    /// # Errors
    /// - [`MemoryError::ExceedsMaxSize`] if `T` does not fit one slot
    /// - [`MemoryError::InvalidAlignment`] if slots are less aligned than `T`
    #[must_use = "allocated value must be used"]
    pub fn in_pool(value: T, pool: &'m SizeClassPool) -> MemoryResult<Self> {
        if size_of::<T>() > pool.object_size() {
            return Err(MemoryError::allocation_too_large(
                size_of::<T>(),
                pool.object_size(),
            ));
        }
        if align_of::<T>() > pool.slot_align() {
            return Err(MemoryError::invalid_alignment(
                align_of::<T>(),
                pool.slot_align(),
            ));
        }

        let ptr = pool.allocate(false).cast::<T>();

        // SAFETY: Moving the value into a fresh slot.
        // - the slot holds at least size_of::<T>() bytes (checked above)
        // - the slot is aligned to slot_align >= align_of::<T>() (checked above)
        // - the slot was just handed out, nothing else references it
        unsafe { ptr.as_ptr().write(value) };

        Ok(Self {
            ptr,
            pool,
            _owns: PhantomData,
        })
    }

    /// Pool holding the value
    pub fn pool(this: &Self) -> &'m SizeClassPool {
        this.pool
    }

    /// Consumes the box and returns the contained value
    #[must_use]
    pub fn into_inner(self) -> T {
        let this = ManuallyDrop::new(self);

        // SAFETY: Moving the value out of an owned slot.
        // - ptr points to the T written by in_pool
        // - `this` is ManuallyDrop, so Drop does not run and T is read once
        let value = unsafe { ptr::read(this.ptr.as_ptr()) };

        // SAFETY: the slot came from this pool and is released exactly once;
        // the value has already been moved out.
        unsafe { this.pool.release(this.ptr.cast()) };

        value
    }
}

impl<T> Deref for PoolBox<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: ptr points to an initialized T owned by this box; the
        // shared borrow of self rules out concurrent mutation.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for PoolBox<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: ptr points to an initialized T owned by this box; &mut self
        // guarantees exclusive access.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for PoolBox<'_, T> {
    fn drop(&mut self) {
        // SAFETY: Dropping the value and returning its slot.
        // 1. drop_in_place runs T's destructor on the initialized value
        // 2. release returns the slot to the pool that allocated it, once
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            self.pool.release(self.ptr.cast());
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PoolBox<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// SAFETY: PoolBox<T> is Send when T is Send because:
// - the box uniquely owns its T, like Box<T>
// - the pool reference is Sync (SizeClassPool locks all state)
unsafe impl<T: Send> Send for PoolBox<'_, T> {}

// SAFETY: PoolBox<T> is Sync when T is Sync because shared access only
// hands out &T.
unsafe impl<T: Sync> Sync for PoolBox<'_, T> {}
