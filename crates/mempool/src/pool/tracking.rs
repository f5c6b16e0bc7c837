//! Optional live-slot bookkeeping used by checked releases.
//!
//! One bit per slot, one bitmap per block. Only allocated when
//! [`PoolConfig::track_slots`](crate::PoolConfig) is set.

const BITS: usize = u64::BITS as usize;

/// Live bitmaps for every carved block of a pool
#[derive(Debug, Default)]
pub(crate) struct SlotTracker {
    live: Vec<Vec<u64>>,
}

impl SlotTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a freshly carved block
    pub(crate) fn add_block(&mut self, objects_per_block: usize) {
        self.live.push(vec![0; objects_per_block.div_ceil(BITS)]);
    }

    #[inline]
    pub(crate) fn is_live(&self, block: usize, slot: usize) -> bool {
        self.live[block][slot / BITS] & (1 << (slot % BITS)) != 0
    }

    #[inline]
    pub(crate) fn set_live(&mut self, block: usize, slot: usize) {
        self.live[block][slot / BITS] |= 1 << (slot % BITS);
    }

    #[inline]
    pub(crate) fn set_free(&mut self, block: usize, slot: usize) {
        self.live[block][slot / BITS] &= !(1 << (slot % BITS));
    }

    /// Number of slots currently marked live
    pub(crate) fn live_count(&self) -> usize {
        self.live
            .iter()
            .flatten()
            .map(|word| word.count_ones() as usize)
            .sum()
    }
}
