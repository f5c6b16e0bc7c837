//! Nested symbol scopes with staged global definitions
//!
//! A [`Scope`] is a stack of frames. The bottom frame is the global frame
//! and is never popped. Definitions made while only the global frame is open
//! are staged: every lookup sees them, but they join the global frame only on
//! [`Scope::commit`] and vanish on [`Scope::rollback`]. This lets a compiler
//! pass define globals tentatively and drop them if the unit fails.

use core::fmt;

use mempool::{MemoryResult, PoolBox, PoolManager};
#[cfg(feature = "logging")]
use tracing::debug;

use crate::symbol::Symbol;

/// Symbol to value map for one frame
struct Frame<V> {
    entries: Vec<(Symbol, V)>,
}

impl<V> Frame<V> {
    const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn get(&self, key: Symbol) -> Option<&V> {
        self.entries
            .iter()
            .find_map(|(k, v)| (*k == key).then_some(v))
    }

    /// Insert or overwrite
    fn set(&mut self, key: Symbol, value: V) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }
}

/// Stack of symbol frames whose frames live in a [`PoolManager`]
pub struct Scope<'m, V> {
    manager: &'m PoolManager,
    global: PoolBox<'m, Frame<V>>,
    staged: PoolBox<'m, Frame<V>>,
    nested: Vec<PoolBox<'m, Frame<V>>>,
}

impl<'m, V> Scope<'m, V> {
    /// Creates a scope holding only the global frame
    ///
    /// # Errors
    /// Fails when the manager's largest class cannot hold a frame.
    pub fn new(manager: &'m PoolManager) -> MemoryResult<Self> {
        Ok(Self {
            manager,
            global: PoolBox::new_in(Frame::new(), manager)?,
            staged: PoolBox::new_in(Frame::new(), manager)?,
            nested: Vec::new(),
        })
    }

    /// Opens a new innermost frame
    pub fn push(&mut self) -> MemoryResult<()> {
        self.nested.push(PoolBox::new_in(Frame::new(), self.manager)?);
        Ok(())
    }

    /// Closes the innermost frame and returns its entries
    ///
    /// Returns `None` when only the global frame is open.
    pub fn pop(&mut self) -> Option<Vec<(Symbol, V)>> {
        self.nested.pop().map(|frame| frame.into_inner().entries)
    }

    /// Defines `key` in the innermost frame, or stages it when only the
    /// global frame is open
    pub fn add(&mut self, key: Symbol, value: V) {
        match self.nested.last_mut() {
            Some(frame) => frame.set(key, value),
            None => self.staged.set(key, value),
        }
    }

    /// Entries of the innermost frame, in definition order
    ///
    /// With only the global frame open this is the committed globals;
    /// staged entries are not included.
    pub fn current(&self) -> impl Iterator<Item = &(Symbol, V)> {
        self.nested
            .last()
            .unwrap_or(&self.global)
            .entries
            .iter()
    }

    /// Looks `key` up in the innermost frame only
    pub fn lookup0(&self, key: Symbol) -> Option<&V> {
        match self.nested.last() {
            Some(frame) => frame.get(key),
            None => self.global.get(key).or_else(|| self.staged.get(key)),
        }
    }

    /// Looks `key` up in every frame, innermost first
    pub fn lookup1(&self, key: Symbol) -> Option<&V> {
        self.nested
            .iter()
            .rev()
            .find_map(|frame| frame.get(key))
            .or_else(|| self.lookup2(key))
    }

    /// Looks `key` up in the global frame, staged entries included
    pub fn lookup2(&self, key: Symbol) -> Option<&V> {
        self.global.get(key).or_else(|| self.staged.get(key))
    }

    /// Moves staged entries into the global frame
    pub fn commit(&mut self) {
        let staged = core::mem::take(&mut self.staged.entries);

        #[cfg(feature = "logging")]
        debug!(entries = staged.len(), "committing staged global definitions");

        for (key, value) in staged {
            self.global.set(key, value);
        }
    }

    /// Discards staged entries
    pub fn rollback(&mut self) {
        #[cfg(feature = "logging")]
        debug!(
            entries = self.staged.entries.len(),
            "discarding staged global definitions"
        );

        self.staged.entries.clear();
    }

    /// Number of open frames, the global frame included
    pub fn depth(&self) -> usize {
        1 + self.nested.len()
    }

    /// Whether staged entries are waiting for [`Self::commit`]
    pub fn has_staged(&self) -> bool {
        !self.staged.entries.is_empty()
    }

    /// Releases every frame back to the manager
    pub fn release(self) {
        drop(self);
    }
}

impl<V> fmt::Debug for Scope<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("depth", &self.depth())
            .field("globals", &self.global.entries.len())
            .field("staged", &self.staged.entries.len())
            .finish()
    }
}
