//! trieenv Core: Trie-Backed Name Store
//!
//! A byte-keyed trie mapping names to values, paired with an anchor chain
//! that keeps every stored value visible to a host's tracing collector.
//!
//! # Architecture
//!
//! - **Trie**: name → anchor id, ordered enumeration for free
//! - **Anchor chain**: doubly-linked wrapper nodes, one per live entry, traced by the host
//! - **Table**: owns both and keeps them in lockstep
//!
//! # Zero Host Dependencies
//!
//! This crate knows nothing about any particular interpreter. Values are an
//! opaque `V`; the host side of the protocol lives in `trieenv-host`.

pub mod anchor;
pub mod config;
pub mod error;
pub mod gc;
pub mod table;
pub mod trie;

// Re-export key types for convenience
pub use anchor::{Anchor, AnchorChain, AnchorId};
pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use gc::GcTrace;
pub use table::{Assigned, Released, Table};
pub use trie::{TrieStore, Upsert};
