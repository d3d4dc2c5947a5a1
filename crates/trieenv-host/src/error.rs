//! Error types returned across the host protocol boundary.

use thiserror::Error;
use trieenv_core::StoreError;

/// Errors surfaced to the host's backing-store dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The table failed: resource exhaustion or a broken anchor chain
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configuration handed to the entry point was rejected
    #[error("invalid table configuration: {0}")]
    InvalidConfig(String),

    /// The finalizer was handed an object that is not a trie backing store
    #[error("not a trie backing store (expected {expected})")]
    NotATable {
        /// Type the finalizer accepts
        expected: &'static str,
    },

    /// The store was finalized and can no longer accept bindings
    #[error("backing store has been torn down")]
    TornDown,
}

/// Result type alias for host protocol operations
pub type HostResult<T> = Result<T, HostError>;
