//! Pool serving objects of one fixed size
//!
//! # Memory Layout
//! ```text
//! blocks:  [Block0][Block1][Block2] ... (index array doubles when full)
//!             ↓
//!          [slot][slot][slot]...[slot]   objects_per_block slots each
//!
//! recycle: [freed] → [freed] → [freed] → null   (link stored in the slot)
//! ```
//!
//! Allocation pops the recycle list first (LIFO, so hot alloc/free loops keep
//! reusing the same cache lines) and otherwise carves the next never-used slot,
//! growing by one zeroed block when the current block is exhausted. Blocks are
//! never returned to the system before the pool is dropped.
//!
//! ## Invariants
//!
//! - Every slot pointer lies inside a block at an `object_size` multiple
//! - A carved slot is either held by a caller or on the recycle list, once
//! - `recycle.len() + live == carved` at every lock release
//! - Recycle list, cursor and blocks are only touched under `state`'s lock

use core::alloc::Layout;
use core::fmt;
use core::ptr::{self, NonNull};

use parking_lot::Mutex;

#[cfg(feature = "logging")]
use tracing::trace;

use super::PoolStats;
use super::block::{Block, SlotLookup};
use super::free_list::FreeList;
use super::tracking::SlotTracker;
use crate::config::PoolConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::size_class::{self, WORD_SIZE};

/// Allocator for objects of exactly one size
///
/// Every mutation goes through one `parking_lot::Mutex`, which also publishes
/// the in-slot free-list link written by a releasing thread to the next
/// thread that pops it.
pub struct SizeClassPool {
    /// Payload size of every slot
    object_size: usize,

    /// Slots carved from each block
    objects_per_block: usize,

    /// Layout of one block (size and slot alignment)
    block_layout: Layout,

    /// Hygiene and validation settings
    config: PoolConfig,

    /// Recycle list, cursor and blocks
    state: Mutex<SlotState>,
}

struct SlotState {
    /// Carved blocks; capacity doubles when the index array is full
    blocks: Vec<Block>,

    /// Next never-used slot in the last block
    next_slot: usize,

    /// Released slots awaiting reuse
    recycle: FreeList,

    allocations: u64,
    releases: u64,

    /// Live bitmaps, only with `track_slots`
    tracker: Option<SlotTracker>,
}

impl SlotState {
    fn new(objects_per_block: usize, track_slots: bool) -> Self {
        Self {
            blocks: Vec::with_capacity(1),
            // Exhausted cursor: the first carve grows the first block
            next_slot: objects_per_block,
            recycle: FreeList::new(),
            allocations: 0,
            releases: 0,
            tracker: track_slots.then(SlotTracker::new),
        }
    }

    fn carved(&self, objects_per_block: usize) -> usize {
        match self.blocks.len() {
            0 => 0,
            n => (n - 1) * objects_per_block + self.next_slot,
        }
    }

    /// Block and slot index of a carved slot starting at `addr`
    fn locate(&self, addr: usize, object_size: usize) -> Option<(usize, usize)> {
        let last = self.blocks.len().checked_sub(1)?;
        for (index, block) in self.blocks.iter().enumerate() {
            match block.lookup(addr, object_size) {
                SlotLookup::Outside => {}
                SlotLookup::Misaligned => return None,
                SlotLookup::Slot(slot) if index == last && slot >= self.next_slot => return None,
                SlotLookup::Slot(slot) => return Some((index, slot)),
            }
        }
        None
    }
}

impl SizeClassPool {
    /// Creates a pool for objects of `object_size` bytes
    ///
    /// # Errors
    /// Returns an error if:
    /// - `object_size` is not a non-zero multiple of the word size (a slot
    ///   must be able to hold the recycle link)
    /// - one block of `object_size` slots would overflow `isize::MAX`
    pub fn new(object_size: usize, config: PoolConfig) -> MemoryResult<Self> {
        let block_layout = Self::block_layout_for(object_size)?;
        Ok(Self::with_layout(object_size, block_layout, config))
    }

    /// Validated block layout for `object_size`
    pub(crate) fn block_layout_for(object_size: usize) -> MemoryResult<Layout> {
        if object_size < WORD_SIZE || !object_size.is_multiple_of(WORD_SIZE) {
            return Err(MemoryError::invalid_config(&format!(
                "object size {object_size} is not a non-zero multiple of {WORD_SIZE}"
            )));
        }
        let bytes = size_class::block_bytes(object_size)?;
        Layout::from_size_align(bytes, size_class::slot_align(object_size))
            .map_err(|_| MemoryError::size_overflow("block layout"))
    }

    /// Builds a pool from a layout produced by [`Self::block_layout_for`].
    pub(crate) fn with_layout(object_size: usize, block_layout: Layout, config: PoolConfig) -> Self {
        let objects_per_block = size_class::objects_per_block(object_size);
        debug_assert_eq!(block_layout.size(), object_size * objects_per_block);

        Self {
            object_size,
            objects_per_block,
            block_layout,
            state: Mutex::new(SlotState::new(objects_per_block, config.track_slots)),
            config,
        }
    }

    /// Returns the payload size of every slot
    pub fn object_size(&self) -> usize {
        self.object_size
    }

    /// Returns the number of slots per block
    pub fn objects_per_block(&self) -> usize {
        self.objects_per_block
    }

    /// Returns the alignment every slot satisfies
    pub fn slot_align(&self) -> usize {
        self.block_layout.align()
    }

    /// Returns the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Allocates one slot
    ///
    /// Reuses the most recently released slot when there is one, zeroing it
    /// if `zero` is set. Otherwise carves a never-used slot, which is already
    /// zero. Memory exhaustion while growing is fatal.
    pub fn allocate(&self, zero: bool) -> NonNull<u8> {
        let mut state = self.state.lock();
        state.allocations += 1;

        if let Some(slot) = state.recycle.pop() {
            if state.tracker.is_some() {
                self.mark_live(&mut state, slot);
            }
            if zero {
                // SAFETY: Zeroing a recycled slot.
                // - slot came off this pool's recycle list, so it is a whole
                //   object_size slot inside a live block
                // - the caller no longer holds it (it was released)
                unsafe { ptr::write_bytes(slot.as_ptr(), 0, self.object_size) };
            }
            return slot;
        }

        self.carve(&mut state)
    }

    /// Returns a slot to the recycle list
    ///
    /// With `track_slots` enabled a foreign or already released pointer is
    /// rejected (and logged) instead of corrupting the list.
    ///
    /// # Safety
    ///
    /// Caller must ensure:
    /// - `ptr` was returned by [`Self::allocate`] on this pool
    /// - `ptr` has not been released since that allocation
    /// - nothing reads or writes through `ptr` after this call
    pub unsafe fn release(&self, ptr: NonNull<u8>) {
        let mut state = self.state.lock();

        if state.tracker.is_some() && self.untrack(&mut state, ptr).is_err() {
            // Rejected; the error constructor already logged it.
            return;
        }

        // SAFETY: caller contract (or the tracker above) guarantees `ptr` is a
        // live slot of this pool.
        unsafe { self.push_free(&mut state, ptr) };
    }

    /// Returns a slot to the recycle list after validating it
    ///
    /// Requires `track_slots`. Never corrupts the pool: foreign pointers,
    /// interior pointers, never-carved slots and double releases are reported
    /// as errors and leave the pool untouched.
    pub fn checked_release(&self, ptr: NonNull<u8>) -> MemoryResult<()> {
        let mut state = self.state.lock();

        if state.tracker.is_none() {
            return Err(MemoryError::tracking_disabled(self.object_size));
        }
        self.untrack(&mut state, ptr)?;

        // SAFETY: untrack just proved `ptr` is a carved, live slot of this
        // pool and flipped it to free, so it is not on the list yet.
        unsafe { self.push_free(&mut state, ptr) };
        Ok(())
    }

    /// Whether `ptr` is the start of a slot carved from this pool
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        let state = self.state.lock();
        state
            .locate(ptr.as_ptr() as usize, self.object_size)
            .is_some()
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        let carved = state.carved(self.objects_per_block);
        let free = state.recycle.len();

        if let Some(tracker) = &state.tracker {
            debug_assert_eq!(tracker.live_count(), carved - free);
        }

        PoolStats {
            object_size: self.object_size,
            objects_per_block: self.objects_per_block,
            blocks: state.blocks.len(),
            carved,
            free,
            live: carved - free,
            allocations: state.allocations,
            releases: state.releases,
        }
    }

    fn carve(&self, state: &mut SlotState) -> NonNull<u8> {
        if state.next_slot == self.objects_per_block {
            self.grow(state);
        }

        let block_index = state.blocks.len() - 1;
        let slot_index = state.next_slot;
        state.next_slot += 1;

        if let Some(tracker) = &mut state.tracker {
            tracker.set_live(block_index, slot_index);
        }

        state.blocks[block_index].slot(slot_index, self.object_size)
    }

    /// Adds one zeroed block, doubling the block index array when it is full
    fn grow(&self, state: &mut SlotState) {
        if state.blocks.len() == state.blocks.capacity() {
            let additional = state.blocks.capacity().max(1);
            state.blocks.reserve_exact(additional);
        }

        state.blocks.push(Block::zeroed(self.block_layout));
        state.next_slot = 0;

        if let Some(tracker) = &mut state.tracker {
            tracker.add_block(self.objects_per_block);
        }

        #[cfg(feature = "logging")]
        trace!(
            object_size = self.object_size,
            blocks = state.blocks.len(),
            "size-class pool grew by one block"
        );
    }

    fn mark_live(&self, state: &mut SlotState, slot: NonNull<u8>) {
        let position = state.locate(slot.as_ptr() as usize, self.object_size);
        if let (Some((block, index)), Some(tracker)) = (position, &mut state.tracker) {
            tracker.set_live(block, index);
        }
    }

    fn untrack(&self, state: &mut SlotState, ptr: NonNull<u8>) -> MemoryResult<()> {
        let addr = ptr.as_ptr() as usize;
        let (block, index) = state
            .locate(addr, self.object_size)
            .ok_or_else(|| MemoryError::foreign_pointer(addr, self.object_size))?;

        let Some(tracker) = &mut state.tracker else {
            return Err(MemoryError::tracking_disabled(self.object_size));
        };
        if !tracker.is_live(block, index) {
            return Err(MemoryError::double_free(addr, self.object_size));
        }
        tracker.set_free(block, index);
        Ok(())
    }

    /// # Safety
    ///
    /// `ptr` must be a carved slot of this pool that is not on the recycle list.
    unsafe fn push_free(&self, state: &mut SlotState, ptr: NonNull<u8>) {
        if self.config.zero_on_free {
            // SAFETY: ptr is a whole slot of this pool (function contract).
            unsafe { ptr::write_bytes(ptr.as_ptr(), 0, self.object_size) };
        }

        // SAFETY: Linking the slot into the recycle list.
        // - slots are at least one word and aligned to slot_align >= word size
        // - the function contract guarantees the slot is not already listed
        // - the slot's block lives as long as this pool, which owns the list
        unsafe { state.recycle.push(ptr) };
        state.releases += 1;
    }

    #[cfg(test)]
    fn recycled(&self) -> Vec<NonNull<u8>> {
        self.state.lock().recycle.iter().collect()
    }
}

impl fmt::Debug for SizeClassPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeClassPool")
            .field("object_size", &self.object_size)
            .field("objects_per_block", &self.objects_per_block)
            .field("slot_align", &self.block_layout.align())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn fill(ptr: NonNull<u8>, len: usize, byte: u8) {
        // SAFETY: tests only fill slots they currently hold.
        unsafe { ptr::write_bytes(ptr.as_ptr(), byte, len) };
    }

    fn is_zeroed(ptr: NonNull<u8>, len: usize) -> bool {
        // SAFETY: tests only read slots they currently hold.
        unsafe { core::slice::from_raw_parts(ptr.as_ptr(), len) }
            .iter()
            .all(|&b| b == 0)
    }

    #[rstest]
    #[case(0)]
    #[case(WORD_SIZE - 1)]
    #[case(WORD_SIZE + 1)]
    fn rejects_slots_that_cannot_hold_a_link(#[case] object_size: usize) {
        let err = SizeClassPool::new(object_size, PoolConfig::default()).unwrap_err();
        assert_eq!(err.code(), "MEM:CONFIG:INVALID");
    }

    #[test]
    fn first_allocation_grows_one_block() {
        let pool = SizeClassPool::new(32, PoolConfig::default()).unwrap();
        assert_eq!(pool.stats().blocks, 0);

        let ptr = pool.allocate(false);
        assert!(pool.owns(ptr));
        assert_eq!(ptr.as_ptr() as usize % pool.slot_align(), 0);

        let stats = pool.stats();
        assert_eq!(stats.blocks, 1);
        assert_eq!(stats.carved, 1);
        assert_eq!(stats.live, 1);
        assert_eq!(stats.free, 0);

        unsafe { pool.release(ptr) };
    }

    #[test]
    fn release_then_allocate_is_lifo() {
        let pool = SizeClassPool::new(16, PoolConfig::default()).unwrap();
        let a = pool.allocate(false);
        let b = pool.allocate(false);
        let c = pool.allocate(false);

        unsafe {
            pool.release(a);
            pool.release(c);
        }
        assert_eq!(pool.recycled(), vec![c, a]);

        assert_eq!(pool.allocate(false), c);
        assert_eq!(pool.allocate(false), a);
        assert_eq!(pool.stats().carved, 3);

        unsafe {
            pool.release(a);
            pool.release(b);
            pool.release(c);
        }
    }

    #[test]
    fn zeroed_reuse_clears_previous_contents() {
        let pool = SizeClassPool::new(64, PoolConfig::default()).unwrap();
        let ptr = pool.allocate(false);
        fill(ptr, 64, 0xAB);
        unsafe { pool.release(ptr) };

        let again = pool.allocate(true);
        assert_eq!(again, ptr);
        assert!(is_zeroed(again, 64));
        unsafe { pool.release(again) };
    }

    #[test]
    fn zero_on_free_scrubs_all_but_the_link() {
        let config = PoolConfig {
            zero_on_free: true,
            track_slots: false,
        };
        let pool = SizeClassPool::new(64, config).unwrap();
        let ptr = pool.allocate(false);
        fill(ptr, 64, 0xCD);
        unsafe { pool.release(ptr) };

        // SAFETY: slot is on the recycle list; only the link word is written.
        let tail = unsafe { NonNull::new_unchecked(ptr.as_ptr().add(WORD_SIZE)) };
        assert!(is_zeroed(tail, 64 - WORD_SIZE));
    }

    #[test]
    fn index_array_doubles() {
        let pool = SizeClassPool::new(HUGE, PoolConfig::default()).unwrap();
        let per_block = pool.objects_per_block();
        let held: Vec<_> = (0..per_block * 3 + 1).map(|_| pool.allocate(false)).collect();

        let state = pool.state.lock();
        assert_eq!(state.blocks.len(), 4);
        assert!(state.blocks.capacity() >= 4);
        drop(state);

        for ptr in held {
            unsafe { pool.release(ptr) };
        }
    }

    const HUGE: usize = size_class::HUGE_OBJECT;

    #[test]
    fn checked_release_requires_tracking() {
        let pool = SizeClassPool::new(8, PoolConfig::production()).unwrap();
        let ptr = pool.allocate(false);
        let err = pool.checked_release(ptr).unwrap_err();
        assert_eq!(err.code(), "MEM:POOL:UNTRACKED");
        unsafe { pool.release(ptr) };
    }

    #[test]
    fn checked_release_catches_misuse() {
        let pool = SizeClassPool::new(32, PoolConfig::debug()).unwrap();
        let ptr = pool.allocate(false);
        let other = pool.allocate(false);

        // Interior pointer
        let interior = unsafe { NonNull::new_unchecked(ptr.as_ptr().add(8)) };
        assert!(pool.checked_release(interior).unwrap_err().is_misuse());

        // Foreign pointer
        let mut outside = [0usize; 4];
        let foreign = NonNull::from(&mut outside).cast::<u8>();
        assert_eq!(
            pool.checked_release(foreign).unwrap_err().code(),
            "MEM:POOL:FOREIGN"
        );

        // Never-carved slot in the current block
        let uncarved = unsafe { NonNull::new_unchecked(other.as_ptr().add(32)) };
        assert_eq!(
            pool.checked_release(uncarved).unwrap_err().code(),
            "MEM:POOL:FOREIGN"
        );

        pool.checked_release(ptr).unwrap();
        assert_eq!(
            pool.checked_release(ptr).unwrap_err().code(),
            "MEM:POOL:DOUBLE_FREE"
        );

        // Plain release of a stale pointer is rejected, not linked twice
        unsafe { pool.release(ptr) };
        assert_eq!(pool.recycled(), vec![ptr]);

        pool.checked_release(other).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.live, 0);
        assert_eq!(stats.free, 2);
    }

    #[test]
    fn tracking_follows_recycled_slots() {
        let pool = SizeClassPool::new(16, PoolConfig::debug()).unwrap();
        let ptr = pool.allocate(false);
        pool.checked_release(ptr).unwrap();

        let again = pool.allocate(false);
        assert_eq!(again, ptr);
        pool.checked_release(again).unwrap();
    }

    #[derive(Debug, Clone)]
    enum Op {
        Alloc { zero: bool },
        Free(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => any::<bool>().prop_map(|zero| Op::Alloc { zero }),
            2 => any::<usize>().prop_map(Op::Free),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn live_and_recycled_slots_stay_disjoint(
            object_size in prop_oneof![Just(8usize), Just(24), Just(HUGE)],
            ops in proptest::collection::vec(op(), 1..600),
        ) {
            let pool = SizeClassPool::new(object_size, PoolConfig::debug()).unwrap();
            let mut live: Vec<NonNull<u8>> = Vec::new();

            for op in ops {
                match op {
                    Op::Alloc { zero } => {
                        let ptr = pool.allocate(zero);
                        if zero {
                            prop_assert!(is_zeroed(ptr, object_size));
                        }
                        fill(ptr, object_size, 0x5A);
                        live.push(ptr);
                    }
                    Op::Free(pick) if !live.is_empty() => {
                        let ptr = live.swap_remove(pick % live.len());
                        prop_assert!(pool.checked_release(ptr).is_ok());
                    }
                    Op::Free(_) => {}
                }

                let recycled: HashSet<_> = pool.recycled().into_iter().collect();
                let held: HashSet<_> = live.iter().copied().collect();
                prop_assert_eq!(held.len(), live.len());
                prop_assert!(recycled.is_disjoint(&held));
                prop_assert!(live.iter().all(|&ptr| pool.owns(ptr)));

                let stats = pool.stats();
                prop_assert_eq!(stats.free, recycled.len());
                prop_assert_eq!(stats.live, live.len());
                prop_assert_eq!(stats.free + stats.live, stats.carved);
            }
        }
    }
}
