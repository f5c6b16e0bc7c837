//! Growable array with a pool-allocated header
//!
//! The header lives in a [`PoolBox`]; element storage is a plain heap buffer
//! whose capacity follows the array's own growth policy: start at
//! [`MAP_CAP`], double when full, halve once fewer than half the slots are
//! in use.

use core::fmt;
use core::slice;

use mempool::{MemoryResult, PoolBox, PoolManager};

/// Initial and minimum capacity
pub const MAP_CAP: usize = 4;

struct Storage<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> Storage<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        if capacity > self.items.capacity() {
            self.items.reserve_exact(capacity - self.items.len());
        } else {
            self.items.shrink_to(capacity);
        }
    }
}

/// Growable array of small `Copy` values
pub struct Vector<'m, T> {
    header: PoolBox<'m, Storage<T>>,
}

impl<'m, T: Copy + PartialEq> Vector<'m, T> {
    /// Creates an empty vector whose header lives in `manager`
    pub fn new(manager: &'m PoolManager) -> MemoryResult<Self> {
        let header = PoolBox::new_in(Storage::with_capacity(MAP_CAP), manager)?;
        Ok(Self { header })
    }

    /// Independent copy with the same contents and capacity
    pub fn copy(&self) -> MemoryResult<Self> {
        let mut storage = Storage::with_capacity(self.header.capacity);
        storage.items.extend_from_slice(&self.header.items);
        let header = PoolBox::in_pool(storage, PoolBox::pool(&self.header))?;
        Ok(Self { header })
    }

    /// Appends `value`, doubling the capacity when full
    pub fn add(&mut self, value: T) {
        let storage = &mut *self.header;
        if storage.items.len() == storage.capacity {
            storage.resize(storage.capacity * 2);
        }
        storage.items.push(value);
    }

    /// Index of the last element equal to `value`
    pub fn find(&self, value: &T) -> Option<usize> {
        self.header.items.iter().rposition(|item| item == value)
    }

    /// Removes the element at `index`, shifting later elements down
    ///
    /// Out-of-range indices are ignored. Halves the capacity afterwards when
    /// fewer than half of it is used and it is above [`MAP_CAP`].
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let storage = &mut *self.header;
        if index >= storage.items.len() {
            return None;
        }

        let value = storage.items.remove(index);
        if storage.items.len() < storage.capacity / 2 && storage.capacity > MAP_CAP {
            storage.resize(storage.capacity / 2);
        }
        Some(value)
    }

    /// Removes the last element equal to `value`; true if one was found
    pub fn remove_value(&mut self, value: &T) -> bool {
        match self.find(value) {
            Some(index) => self.remove(index).is_some(),
            None => false,
        }
    }

    /// Removes and returns the last element
    pub fn pop(&mut self) -> Option<T> {
        let last = self.len().checked_sub(1)?;
        self.remove(last)
    }

    /// Removes every element and resets the capacity to [`MAP_CAP`]
    pub fn clear(&mut self) {
        self.header.items.clear();
        self.header.resize(MAP_CAP);
    }

    /// Element at `index`
    pub fn at(&self, index: usize) -> Option<T> {
        self.header.items.get(index).copied()
    }

    pub fn front(&self) -> Option<T> {
        self.header.items.first().copied()
    }

    pub fn back(&self) -> Option<T> {
        self.header.items.last().copied()
    }
}

impl<T> Vector<'_, T> {
    pub fn len(&self) -> usize {
        self.header.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.items.is_empty()
    }

    /// Slots available before the next doubling
    pub fn capacity(&self) -> usize {
        self.header.capacity
    }

    pub fn as_slice(&self) -> &[T] {
        &self.header.items
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.header.items.iter()
    }
}

impl<'a, T> IntoIterator for &'a Vector<'_, T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Vector<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
