//! `BackingStore` implementation over a trieenv `Table`.
//!
//! Translates the host's calling convention (unbound sentinel, active flag,
//! finalizer-driven teardown) onto table operations. Anchor bookkeeping
//! happens inside `Table::assign` / `Table::remove`: a chain insert on the
//! insert branch of assign, nothing on the update branch, a chain remove on
//! a successful remove.

use std::any::Any;

use tracing::{debug, trace, warn};

use trieenv_core::{Config, GcTrace, Table};

use crate::error::{HostError, HostResult};
use crate::host::{BackingStore, HostValue, TeardownReport};

/// Trie-backed name store installed on one host environment.
///
/// Owns its table exclusively. After [`teardown`](Self::teardown) the table
/// is gone: reads report no binding, `remove` reports false and `assign`
/// fails with [`HostError::TornDown`].
pub struct TrieBackingStore<V> {
    table: Option<Table<V>>,
    active: bool,
    verify_on_teardown: bool,
}

impl<V: HostValue> TrieBackingStore<V> {
    /// Build an active store with a fresh, empty table.
    pub fn new(config: &Config) -> HostResult<Self> {
        config.validate().map_err(HostError::InvalidConfig)?;
        Ok(Self {
            table: Some(Table::new(config)?),
            active: true,
            verify_on_teardown: config.verify_on_teardown,
        })
    }

    /// The live table, if not yet torn down.
    pub fn table(&self) -> Option<&Table<V>> {
        self.table.as_ref()
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.table.as_ref().map_or(0, Table::len)
    }

    /// Returns true if no names are bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_torn_down(&self) -> bool {
        self.table.is_none()
    }

    /// Release the table and every anchor.
    ///
    /// Safe to call more than once; later calls release nothing and report
    /// `already_torn_down`.
    pub fn teardown(&mut self) -> HostResult<TeardownReport> {
        let Some(table) = self.table.take() else {
            warn!("backing store torn down twice; ignoring");
            return Ok(TeardownReport { already_torn_down: true, ..TeardownReport::default() });
        };

        if self.verify_on_teardown {
            if let Err(e) = table.verify() {
                warn!(error = %e, "anchor chain inconsistent at teardown");
            }
        }

        let released = table.release();
        debug!(entries = released.entries, bytes = released.bytes, "backing store torn down");
        Ok(TeardownReport {
            entries: released.entries,
            bytes: released.bytes,
            already_torn_down: false,
        })
    }
}

impl<V: HostValue> BackingStore<V> for TrieBackingStore<V> {
    fn exists(&self, name: &[u8]) -> bool {
        self.active && self.table.as_ref().is_some_and(|t| t.exists(name))
    }

    fn get(&self, name: &[u8]) -> V {
        self.table
            .as_ref()
            .and_then(|t| t.get(name))
            .cloned()
            .unwrap_or_else(V::unbound)
    }

    fn assign(&mut self, name: &[u8], value: V) -> HostResult<V> {
        if !self.active {
            trace!(name_len = name.len(), "assign on inactive store ignored");
            return Ok(V::unbound());
        }
        let table = self.table.as_mut().ok_or(HostError::TornDown)?;
        table.assign(name, value.clone())?;
        Ok(value)
    }

    fn remove(&mut self, name: &[u8]) -> HostResult<bool> {
        match self.table.as_mut() {
            Some(table) => Ok(table.remove(name)?.is_some()),
            None => Ok(false),
        }
    }

    fn enumerate(&self) -> HostResult<Vec<Vec<u8>>> {
        match self.table.as_ref() {
            Some(table) => Ok(table.enumerate()?),
            None => Ok(Vec::new()),
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<V: HostValue> GcTrace<V> for TrieBackingStore<V> {
    fn trace_roots(&self, roots: &mut Vec<V>) {
        if let Some(table) = self.table.as_ref() {
            table.trace_roots(roots);
        }
    }
}

impl<V> std::fmt::Debug for TrieBackingStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrieBackingStore")
            .field("entries", &self.table.as_ref().map(Table::len))
            .field("active", &self.active)
            .finish()
    }
}
