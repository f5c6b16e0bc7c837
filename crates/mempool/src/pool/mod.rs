//! Size-class pools
//!
//! A [`SizeClassPool`] hands out fixed-size slots carved from zeroed blocks
//! and recycles released slots through an intrusive LIFO list. [`PoolBox`]
//! wraps a pool slot in an owning, typed handle.

mod block;
mod free_list;
mod pool_box;
mod size_class_pool;
mod stats;
mod tracking;

pub use pool_box::PoolBox;
pub use size_class_pool::SizeClassPool;
pub use stats::PoolStats;
