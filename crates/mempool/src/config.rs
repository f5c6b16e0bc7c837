//! Pool and manager configuration

use crate::error::{MemoryError, MemoryResult};
use crate::size_class::{self, DEFAULT_MAX_SIZE};

/// Configuration for a single size-class pool
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Zero every slot when it is released (hygiene / debugging)
    pub zero_on_free: bool,

    /// Keep a live-slot bitmap per block so bad releases are detected
    pub track_slots: bool,
}

impl PoolConfig {
    /// Production configuration - nothing beyond the fast path
    #[must_use]
    pub fn production() -> Self {
        Self {
            zero_on_free: false,
            track_slots: false,
        }
    }

    /// Debug configuration - zero released slots and validate every release
    #[must_use]
    pub fn debug() -> Self {
        Self {
            zero_on_free: true,
            track_slots: true,
        }
    }
}

/// Configuration for a [`PoolManager`](crate::PoolManager)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ManagerConfig {
    /// Largest request served from a pool; bigger ones go to the system allocator
    pub max_size: usize,

    /// Settings shared by every size-class pool
    pub pool: PoolConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            pool: PoolConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Configuration serving objects up to `max_size` bytes
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    /// Production configuration for `max_size`
    #[must_use]
    pub fn production(max_size: usize) -> Self {
        Self {
            max_size,
            pool: PoolConfig::production(),
        }
    }

    /// Debug configuration for `max_size`
    #[must_use]
    pub fn debug(max_size: usize) -> Self {
        Self {
            max_size,
            pool: PoolConfig::debug(),
        }
    }

    /// Replace the per-pool settings
    #[must_use = "builder methods must be chained or built"]
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Validate the configuration
    ///
    /// The ceiling must produce a size class table whose largest block still
    /// fits in a single allocation.
    pub fn validate(&self) -> MemoryResult<()> {
        size_class::size_classes(self.max_size)
            .map(drop)
            .map_err(|e| MemoryError::invalid_config(&format!("max_size {}: {e}", self.max_size)))
    }
}
