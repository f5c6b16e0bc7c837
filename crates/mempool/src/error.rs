//! Standalone error types for mempool
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.
//!
//! Only configuration problems and the optional checked-release layer produce
//! errors. A request above the largest size class is not an error: it is
//! reported as `None` by the lookup functions. Running out of system memory is
//! fatal and goes through [`std::alloc::handle_alloc_error`].

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{error, warn};

// ============================================================================
// Main Error Types
// ============================================================================

/// Memory pool errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    // --- Configuration Errors ---
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Size overflow during operation: {operation}")]
    SizeOverflow { operation: String },

    #[error("Invalid alignment: {alignment} (slots are aligned to {slot_align})")]
    InvalidAlignment { alignment: usize, slot_align: usize },

    #[error("Allocation exceeds largest size class: {size} bytes (max: {max_size})")]
    ExceedsMaxSize { size: usize, max_size: usize },

    // --- Checked Release Errors ---
    #[error("Pointer {addr:#x} does not belong to the {object_size}-byte pool")]
    ForeignPointer { addr: usize, object_size: usize },

    #[error("Pointer {addr:#x} released twice to the {object_size}-byte pool")]
    DoubleFree { addr: usize, object_size: usize },

    #[error("Slot tracking is disabled for the {object_size}-byte pool")]
    TrackingDisabled { object_size: usize },
}

impl MemoryError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "MEM:CONFIG:INVALID",
            Self::SizeOverflow { .. } => "MEM:CONFIG:OVERFLOW",
            Self::InvalidAlignment { .. } => "MEM:ALLOC:ALIGN",
            Self::ExceedsMaxSize { .. } => "MEM:ALLOC:MAX",
            Self::ForeignPointer { .. } => "MEM:POOL:FOREIGN",
            Self::DoubleFree { .. } => "MEM:POOL:DOUBLE_FREE",
            Self::TrackingDisabled { .. } => "MEM:POOL:UNTRACKED",
        }
    }

    /// Check if the error reports caller misuse detected by slot tracking
    #[must_use]
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::ForeignPointer { .. } | Self::DoubleFree { .. })
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create invalid config error
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }

    /// Create size overflow error
    pub fn size_overflow(operation: &str) -> Self {
        Self::SizeOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create invalid alignment error
    pub fn invalid_alignment(alignment: usize, slot_align: usize) -> Self {
        Self::InvalidAlignment {
            alignment,
            slot_align,
        }
    }

    /// Create allocation too large error
    pub fn allocation_too_large(size: usize, max_size: usize) -> Self {
        Self::ExceedsMaxSize { size, max_size }
    }

    /// Create foreign pointer error
    pub fn foreign_pointer(addr: usize, object_size: usize) -> Self {
        #[cfg(feature = "logging")]
        error!(addr, object_size, "release of a pointer not owned by this pool");

        Self::ForeignPointer { addr, object_size }
    }

    /// Create double free error
    pub fn double_free(addr: usize, object_size: usize) -> Self {
        #[cfg(feature = "logging")]
        error!(addr, object_size, "double release detected");

        Self::DoubleFree { addr, object_size }
    }

    /// Create tracking disabled error
    pub fn tracking_disabled(object_size: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(object_size, "checked release requested on an untracked pool");

        Self::TrackingDisabled { object_size }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for memory pool operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Generic result type alias
pub type Result<T> = MemoryResult<T>;

// ============================================================================
// Tests
// ============================================================================
