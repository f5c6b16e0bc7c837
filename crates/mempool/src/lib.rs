//! # mempool
//!
//! Size-classed object pool allocator for language runtimes.
//!
//! Small allocations are served from per-size-class pools that carve
//! fixed-size slots out of large zeroed blocks and recycle released slots
//! through an intrusive LIFO free list:
//! - [`SizeClassPool`]: allocation and release for one object size
//! - [`PoolManager`]: power-of-two class table, lazily created pools, and the
//!   bootstrap pool that holds the pools themselves
//! - [`PoolBox`]: owning pointer for one value in a pool slot
//! - [`api`]: handle-style `init` / `alloc` / `free` / `realloc` / `teardown`
//!
//! Requests above the largest class go to the system allocator.
//!
//! ## Quick Start
//!
//! ```rust
//! use mempool::prelude::*;
//!
//! let manager = PoolManager::with_config(ManagerConfig::new(256))?;
//!
//! let node = PoolBox::new_in([0u64; 4], &manager)?;
//! assert_eq!(node.len(), 4);
//!
//! let raw = manager.allocate(100, true);
//! // SAFETY: raw came from this manager with size 100.
//! unsafe { manager.release(100, raw) };
//! # Ok::<(), MemoryError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured `tracing` events for pool creation,
//!   block growth and rejected releases
//! - `serde`: `Serialize`/`Deserialize` for the configuration types

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::perf)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
// Precision loss in usize -> f64 casts is acceptable for stats
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::double_must_use)]
#![allow(clippy::return_self_not_must_use)]
// Slots are aligned to slot_align, checked before every typed cast
#![allow(clippy::cast_ptr_alignment)]

pub mod api;
pub mod config;
pub mod error;
mod fallback;
pub mod manager;
pub mod pool;
pub mod size_class;

pub use crate::config::{ManagerConfig, PoolConfig};
pub use crate::error::{MemoryError, MemoryResult, Result};
pub use crate::manager::PoolManager;
pub use crate::pool::{PoolBox, PoolStats, SizeClassPool};
pub use crate::size_class::WORD_SIZE;

pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::config::{ManagerConfig, PoolConfig};
    pub use crate::error::{MemoryError, MemoryResult};
    pub use crate::manager::PoolManager;
    pub use crate::pool::{PoolBox, PoolStats, SizeClassPool};
}
