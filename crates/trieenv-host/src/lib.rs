//! trieenv adapter for host runtimes
//!
//! Implements a host's pluggable backing-store protocol over a trieenv
//! `Table`.
//!
//! # Architecture
//!
//! A host environment normally keeps its bindings in its own table. With a
//! backing store installed, the host's dispatcher instead forwards the five
//! name operations (exists, get, assign, remove, enumerate) here:
//!
//! - Names are byte strings; enumeration order is ascending byte order
//! - Values are opaque `HostValue`s; absence is reported as `HostValue::unbound()`
//! - The installed store is a collector root: `GcTrace::trace_roots` reports
//!   every bound value so the host never collects one early
//! - A finalizer registered at install time releases the table, once

pub mod adapter;
pub mod error;
pub mod host;
pub mod install;

pub use adapter::TrieBackingStore;
pub use error::{HostError, HostResult};
pub use host::{BackingStore, Finalizer, GcTrace, HostEnvironment, HostValue, TeardownReport};
pub use install::{destroy_trie_env, install_trie_env};
