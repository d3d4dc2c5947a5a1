//! Table: one trie plus the anchor chain that keeps its values alive.
//!
//! The trie maps each key to the [`AnchorId`] of the anchor holding its
//! value. Every mutation goes through here so that the trie and the chain
//! always agree: one anchor per live key, no anchor without a key.
//!
//! **Assign (new key)**: anchor linked in as head, then id stored in the trie
//! **Assign (existing key)**: anchor value overwritten, chain untouched
//! **Remove**: trie entry deleted, then its anchor unlinked

use tracing::trace;

use crate::anchor::{AnchorChain, AnchorId};
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::gc::GcTrace;
use crate::trie::{Keys, TrieStore, Upsert};

/// Which branch an assignment took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assigned {
    /// New key; a new anchor was linked in
    Inserted,
    /// Existing key; its anchor's value was replaced
    Updated,
}

/// Memory released by [`Table::release`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Released {
    /// Live entries at the time of release
    pub entries: usize,
    /// Approximate heap bytes freed
    pub bytes: usize,
}

/// Name → value table backing one host environment.
pub struct Table<V> {
    trie: TrieStore<AnchorId>,
    chain: AnchorChain<V>,
    max_entries: Option<usize>,
}

impl<V> Table<V> {
    /// Create an empty table.
    pub fn new(config: &Config) -> StoreResult<Self> {
        Ok(Self {
            trie: TrieStore::with_config(config)?,
            chain: AnchorChain::with_capacity(config.initial_anchor_capacity)?,
            max_entries: config.max_entries,
        })
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    /// True iff `key` is bound.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.trie.exists(key)
    }

    /// Value bound to `key`.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let id = self.trie.lookup(key)?;
        self.chain.get(*id)
    }

    /// Bind `key` to `value`.
    ///
    /// A resource error leaves the table as it was before the call.
    pub fn assign(&mut self, key: &[u8], value: V) -> StoreResult<Assigned> {
        if let Some(&id) = self.trie.lookup(key) {
            self.chain.update(id, value)?;
            trace!(key_len = key.len(), "binding updated");
            return Ok(Assigned::Updated);
        }

        if let Some(limit) = self.max_entries {
            if self.len() >= limit {
                return Err(StoreError::CapacityExceeded { limit });
            }
        }

        let id = self.chain.insert(value)?;
        match self.trie.insert_or_update(key, id) {
            Ok(Upsert::Inserted) => {
                trace!(key_len = key.len(), entries = self.len(), "binding inserted");
                Ok(Assigned::Inserted)
            }
            Ok(Upsert::Updated { previous }) => {
                // Lookup above said the key was absent.
                Err(StoreError::ChainCorrupted {
                    index: previous.index(),
                    reason: "trie entry appeared during insert".into(),
                })
            }
            Err(e) => {
                // Roll the anchor back so no anchor outlives its key.
                self.chain.remove(id)?;
                Err(e)
            }
        }
    }

    /// Unbind `key`, returning its value if it was bound.
    pub fn remove(&mut self, key: &[u8]) -> StoreResult<Option<V>> {
        let Some(id) = self.trie.remove(key) else {
            return Ok(None);
        };
        let value = self.chain.remove(id)?;
        trace!(key_len = key.len(), entries = self.len(), "binding removed");
        Ok(Some(value))
    }

    /// All bound keys, ascending by byte value. Length equals `len()`.
    pub fn enumerate(&self) -> StoreResult<Vec<Vec<u8>>> {
        self.trie.enumerate()
    }

    /// Lazy ascending iterator over bound keys.
    pub fn keys(&self) -> Keys<'_, AnchorId> {
        self.trie.keys()
    }

    /// Bound keys starting with `prefix`, ascending.
    pub fn keys_with_prefix(&self, prefix: &[u8]) -> Keys<'_, AnchorId> {
        self.trie.keys_with_prefix(prefix)
    }

    /// Number of bound keys starting with `prefix`.
    pub fn prefix_count(&self, prefix: &[u8]) -> usize {
        self.trie.prefix_count(prefix)
    }

    /// The trie half of the table.
    pub fn trie(&self) -> &TrieStore<AnchorId> {
        &self.trie
    }

    /// The anchor half of the table.
    pub fn chain(&self) -> &AnchorChain<V> {
        &self.chain
    }

    /// Check that the trie and the chain agree.
    ///
    /// Verifies the chain's own structure, then that every trie slot names a
    /// live anchor and that both sides count the same number of entries.
    pub fn verify(&self) -> StoreResult<()> {
        self.chain.verify()?;
        if self.chain.len() != self.trie.len() {
            return Err(StoreError::ChainCorrupted {
                index: self.chain.head().map_or(0, |h| h.index()),
                reason: format!(
                    "{} trie entries but {} anchors",
                    self.trie.len(),
                    self.chain.len()
                ),
            });
        }
        for (_, id) in self.trie.iter() {
            if self.chain.anchor(*id).is_none() {
                return Err(StoreError::ChainCorrupted {
                    index: id.index(),
                    reason: "trie entry names a dead anchor".into(),
                });
            }
        }
        Ok(())
    }

    /// Approximate heap bytes held by the table.
    pub fn memory_usage(&self) -> usize {
        self.trie.memory_usage() + self.chain.memory_usage()
    }

    /// Drop every entry, keeping the table usable.
    pub fn clear(&mut self) {
        self.trie.clear();
        self.chain.clear();
    }

    /// Consume the table, freeing the trie and every anchor.
    pub fn release(self) -> Released {
        Released { entries: self.len(), bytes: self.memory_usage() }
    }
}

impl<V: Clone> GcTrace<V> for Table<V> {
    fn trace_roots(&self, roots: &mut Vec<V>) {
        self.chain.trace_roots(roots);
    }
}

impl<V> std::fmt::Debug for Table<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("entries", &self.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
