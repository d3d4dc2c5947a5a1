//! Error types for trieenv table operations
//!
//! All table errors are represented by the StoreError enum. Resource
//! exhaustion aborts the operation in progress; integrity errors mean the
//! anchor chain no longer matches the trie and the table must not be used.

use thiserror::Error;

/// trieenv error types with detailed context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An allocation needed by the trie or the anchor arena failed
    #[error("{component} memory exhausted: could not reserve {requested} more slots")]
    OutOfMemory {
        /// Which arena failed to grow ("trie node", "anchor", "key list")
        component: &'static str,
        /// Number of additional slots that were requested
        requested: usize,
    },

    /// The table already holds the configured maximum number of entries
    #[error("table full: limit of {limit} entries reached")]
    CapacityExceeded {
        /// Configured entry limit
        limit: usize,
    },

    /// Key is longer than the configured maximum
    #[error("key too large: {len} bytes exceeds limit of {max} bytes")]
    OversizedKey {
        /// Length of the rejected key
        len: usize,
        /// Configured maximum key size
        max: usize,
    },

    /// An anchor handle refers to a slot that was freed or reused
    #[error("stale anchor handle {index}:{generation}")]
    StaleAnchor {
        /// Arena slot index
        index: u32,
        /// Generation carried by the handle
        generation: u32,
    },

    /// Walking the anchor chain found a broken link, a cycle or a count mismatch
    #[error("anchor chain corrupted at slot {index}: {reason}")]
    ChainCorrupted {
        /// Arena slot where the walk detected the problem
        index: u32,
        /// Description of the inconsistency
        reason: String,
    },
}

/// Result type alias for trieenv operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// True for errors caused by running out of room (allocator or entry limit).
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, StoreError::OutOfMemory { .. } | StoreError::CapacityExceeded { .. })
    }

    pub(crate) fn oom(component: &'static str, requested: usize) -> Self {
        StoreError::OutOfMemory { component, requested }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::OversizedKey { len: 300, max: 256 };
        let display = format!("{}", err);
        assert!(display.contains("key too large"));
        assert!(display.contains("300"));
        assert!(display.contains("256"));
    }

    #[test]
    fn test_resource_exhaustion_classification() {
        assert!(StoreError::oom("anchor", 1).is_resource_exhaustion());
        assert!(StoreError::CapacityExceeded { limit: 4 }.is_resource_exhaustion());
        assert!(!StoreError::StaleAnchor { index: 0, generation: 1 }.is_resource_exhaustion());
    }
}
