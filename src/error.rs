//! Error types for packing queries.

use thiserror::Error;

/// Result type for store, filter and solver operations.
pub type Result<T> = std::result::Result<T, PackingError>;

/// Errors reported at the boundary of a public operation.
///
/// A search that finds no packing is a normal `false`, never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackingError {
    /// Two multisets (or a multiset and a store) disagree on the number of classes.
    #[error("class count mismatch: expected {expected}, found {found}")]
    ClassCountMismatch {
        /// Class count of the store or target.
        expected: usize,
        /// Class count of the offending multiset.
        found: usize,
    },

    /// A store was requested for an empty batch of multisets.
    #[error("cannot build a store from an empty collection")]
    EmptyCollection,

    /// A signed count was negative.
    #[error("negative count {value} for class {class}")]
    NegativeCount {
        /// Class index of the count.
        class: usize,
        /// The rejected value.
        value: i64,
    },

    /// A count did not fit into the 32-bit counter.
    #[error("count {value} for class {class} exceeds u32::MAX")]
    CountOverflow {
        /// Class index of the count.
        class: usize,
        /// The rejected value.
        value: i64,
    },

    /// An item size has no class in a multiset of the given length.
    #[error("item size {size} out of range for {class_count} classes")]
    SizeOutOfRange {
        /// The rejected size.
        size: usize,
        /// Number of classes available.
        class_count: usize,
    },

    /// Filter, query or pool configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The dedicated worker pool could not be started.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

impl PackingError {
    /// Create a class count mismatch error.
    pub fn mismatch(expected: usize, found: usize) -> Self {
        Self::ClassCountMismatch { expected, found }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
