//! Size-class pool statistics

/// Point-in-time snapshot of one size-class pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Payload size of every slot
    pub object_size: usize,
    /// Slots per block
    pub objects_per_block: usize,
    /// Blocks allocated so far
    pub blocks: usize,
    /// Slots ever handed out from blocks (never decreases)
    pub carved: usize,
    /// Slots currently on the recycle list
    pub free: usize,
    /// Slots currently held by callers
    pub live: usize,
    /// Total successful allocations
    pub allocations: u64,
    /// Total releases accepted onto the recycle list
    pub releases: u64,
}

impl PoolStats {
    /// Bytes committed to blocks
    pub fn committed_bytes(&self) -> usize {
        self.blocks * self.objects_per_block * self.object_size
    }

    /// Bytes currently held by callers
    pub fn live_bytes(&self) -> usize {
        self.live * self.object_size
    }

    /// Fraction of carved slots sitting on the recycle list (0.0 to 1.0)
    pub fn recycle_ratio(&self) -> f64 {
        if self.carved == 0 {
            0.0
        } else {
            self.free as f64 / self.carved as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_figures() {
        let stats = PoolStats {
            object_size: 16,
            objects_per_block: 512,
            blocks: 2,
            carved: 600,
            free: 150,
            live: 450,
            allocations: 900,
            releases: 450,
        };
        assert_eq!(stats.committed_bytes(), 2 * 512 * 16);
        assert_eq!(stats.live_bytes(), 450 * 16);
        assert!((stats.recycle_ratio() - 0.25).abs() < f64::EPSILON);
    }
}
