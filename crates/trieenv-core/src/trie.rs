//! Byte-keyed trie, the name → slot mapping of a table.
//!
//! Nodes live in an index-addressed arena. Each node carries an optional
//! slot (set when a key ends there) and its outgoing edges sorted by byte,
//! so a depth-first walk yields keys in ascending byte order with every key
//! ahead of its own extensions.
//!
//! **Point ops**: O(key length × log fanout), independent of table size
//! **Remove**: prunes the dead branch immediately, nothing waits for compaction
//! **Enumerate**: lazy iterator, key buffer grows with the deepest key seen

use std::mem;

use crate::config::Config;
use crate::error::{StoreError, StoreResult};

/// Arena index of the root node. The root always exists.
const ROOT: u32 = 0;

struct Node<T> {
    /// Present iff a key ends at this node
    slot: Option<T>,
    /// Outgoing edges, sorted by edge byte
    children: Vec<(u8, u32)>,
}

impl<T> Node<T> {
    fn empty() -> Self {
        Self { slot: None, children: Vec::new() }
    }

    fn child(&self, byte: u8) -> Option<u32> {
        self.children
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|pos| self.children[pos].1)
    }
}

/// Outcome of [`TrieStore::insert_or_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert<T> {
    /// The key was absent; a new entry was created
    Inserted,
    /// The key was present; its slot was replaced in place
    Updated {
        /// Slot value before the update
        previous: T,
    },
}

impl<T> Upsert<T> {
    pub fn is_insert(&self) -> bool {
        matches!(self, Upsert::Inserted)
    }
}

/// Trie mapping byte-string keys to fixed-width slots.
pub struct TrieStore<T> {
    /// Node arena; index 0 is the root
    nodes: Vec<Node<T>>,
    /// Vacated node indices available for reuse
    free: Vec<u32>,
    /// Number of keys present
    len: usize,
    /// Keys longer than this are rejected
    max_key_size: Option<usize>,
}

impl<T> TrieStore<T> {
    /// Create an empty trie with no reservation and no key limit.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::empty()],
            free: Vec::new(),
            len: 0,
            max_key_size: None,
        }
    }

    /// Create an empty trie sized and limited by `config`.
    pub fn with_config(config: &Config) -> StoreResult<Self> {
        let mut nodes = Vec::new();
        nodes
            .try_reserve(config.initial_node_capacity.max(1))
            .map_err(|_| StoreError::oom("trie node", config.initial_node_capacity))?;
        nodes.push(Node::empty());
        Ok(Self {
            nodes,
            free: Vec::new(),
            len: 0,
            max_key_size: config.max_key_size,
        })
    }

    /// Number of keys present.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the trie holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True iff `key` is present.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.lookup(key).is_some()
    }

    /// Point lookup. `None` means no binding.
    pub fn lookup(&self, key: &[u8]) -> Option<&T> {
        let node = self.find(key)?;
        self.nodes[node as usize].slot.as_ref()
    }

    /// Point lookup returning the slot for in-place modification.
    pub fn lookup_mut(&mut self, key: &[u8]) -> Option<&mut T> {
        let node = self.find(key)?;
        self.nodes[node as usize].slot.as_mut()
    }

    /// Insert `value` under `key`, or replace the slot if `key` is present.
    ///
    /// On the insert branch every node the new key needs is reserved before
    /// the trie is touched; if any reservation fails the trie is unchanged
    /// and `OutOfMemory` is returned.
    pub fn insert_or_update(&mut self, key: &[u8], value: T) -> StoreResult<Upsert<T>> {
        self.check_key(key)?;
        let (node, depth) = self.descend(key);

        if depth == key.len() {
            return Ok(match self.nodes[node as usize].slot.replace(value) {
                Some(previous) => Upsert::Updated { previous },
                None => {
                    self.len += 1;
                    Upsert::Inserted
                }
            });
        }

        let tail = &key[depth..];
        self.reserve_nodes(tail.len())?;
        self.nodes[node as usize]
            .children
            .try_reserve(1)
            .map_err(|_| StoreError::oom("trie node", 1))?;

        // Build the missing path bottom-up so a failure leaves nothing attached.
        let mut top = self.alloc_node(Node { slot: Some(value), children: Vec::new() });
        for &byte in tail[1..].iter().rev() {
            let mut children = Vec::new();
            if children.try_reserve_exact(1).is_err() {
                self.release_path(top);
                return Err(StoreError::oom("trie node", 1));
            }
            children.push((byte, top));
            top = self.alloc_node(Node { slot: None, children });
        }

        let parent = &mut self.nodes[node as usize];
        let pos = match parent.children.binary_search_by_key(&tail[0], |&(b, _)| b) {
            Ok(pos) | Err(pos) => pos,
        };
        parent.children.insert(pos, (tail[0], top));
        self.len += 1;
        Ok(Upsert::Inserted)
    }

    /// Remove `key`, returning its slot if it was present.
    ///
    /// Nodes left with neither a slot nor children are returned to the
    /// free list before this returns.
    pub fn remove(&mut self, key: &[u8]) -> Option<T> {
        // Deepest node on the path that must survive the removal, and the
        // edge under it that leads towards `key`.
        let mut cut: Option<(u32, u8)> = None;
        let mut node = ROOT;
        for &byte in key {
            let current = &self.nodes[node as usize];
            if node == ROOT || current.slot.is_some() || current.children.len() > 1 {
                cut = Some((node, byte));
            }
            node = current.child(byte)?;
        }

        let removed = self.nodes[node as usize].slot.take()?;
        self.len -= 1;

        if self.nodes[node as usize].children.is_empty() {
            if let Some((keep, byte)) = cut {
                let parent = &mut self.nodes[keep as usize];
                if let Ok(pos) = parent.children.binary_search_by_key(&byte, |&(b, _)| b) {
                    let (_, dead) = parent.children.remove(pos);
                    self.release_path(dead);
                }
            }
        }
        Some(removed)
    }

    /// All keys in ascending byte order.
    ///
    /// The result has exactly `len()` elements.
    pub fn enumerate(&self) -> StoreResult<Vec<Vec<u8>>> {
        let mut out = Vec::new();
        out.try_reserve_exact(self.len)
            .map_err(|_| StoreError::oom("key list", self.len))?;
        out.extend(self.keys());
        Ok(out)
    }

    /// Lazy ascending iterator over keys.
    pub fn keys(&self) -> Keys<'_, T> {
        Keys { inner: self.iter() }
    }

    /// Lazy ascending iterator over `(key, slot)` pairs.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::start_at(self, ROOT, Vec::new(), Some(self.len))
    }

    /// Keys that start with `prefix` (including `prefix` itself), ascending.
    pub fn keys_with_prefix(&self, prefix: &[u8]) -> Keys<'_, T> {
        let inner = match self.find(prefix) {
            Some(node) => Iter::start_at(self, node, prefix.to_vec(), None),
            None => Iter::exhausted(self),
        };
        Keys { inner }
    }

    /// Count keys that start with `prefix` without materializing them.
    pub fn prefix_count(&self, prefix: &[u8]) -> usize {
        let Some(start) = self.find(prefix) else { return 0 };
        let mut count = 0;
        let mut pending = vec![start];
        while let Some(node) = pending.pop() {
            let node = &self.nodes[node as usize];
            if node.slot.is_some() {
                count += 1;
            }
            pending.extend(node.children.iter().map(|&(_, c)| c));
        }
        count
    }

    /// Remove every key, keeping the root.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[ROOT as usize] = Node::empty();
        self.free.clear();
        self.len = 0;
    }

    /// Approximate heap bytes held by the trie.
    pub fn memory_usage(&self) -> usize {
        let edges: usize = self
            .nodes
            .iter()
            .map(|n| n.children.capacity() * mem::size_of::<(u8, u32)>())
            .sum();
        self.nodes.capacity() * mem::size_of::<Node<T>>()
            + self.free.capacity() * mem::size_of::<u32>()
            + edges
    }

    /// Number of arena nodes in use, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    fn check_key(&self, key: &[u8]) -> StoreResult<()> {
        match self.max_key_size {
            Some(max) if key.len() > max => Err(StoreError::OversizedKey { len: key.len(), max }),
            _ => Ok(()),
        }
    }

    /// Node reached by the full key, if every edge exists.
    fn find(&self, key: &[u8]) -> Option<u32> {
        key.iter().try_fold(ROOT, |node, &byte| self.nodes[node as usize].child(byte))
    }

    /// Follow `key` as far as edges exist. Returns the last node reached and
    /// how many bytes were consumed.
    fn descend(&self, key: &[u8]) -> (u32, usize) {
        let mut node = ROOT;
        for (depth, &byte) in key.iter().enumerate() {
            match self.nodes[node as usize].child(byte) {
                Some(next) => node = next,
                None => return (node, depth),
            }
        }
        (node, key.len())
    }

    /// Guarantee `count` calls to `alloc_node` will not allocate.
    fn reserve_nodes(&mut self, count: usize) -> StoreResult<()> {
        let fresh = count.saturating_sub(self.free.len());
        if self.nodes.len() + fresh > u32::MAX as usize {
            return Err(StoreError::oom("trie node", fresh));
        }
        self.nodes
            .try_reserve(fresh)
            .and_then(|_| self.free.try_reserve(fresh))
            .map_err(|_| StoreError::oom("trie node", fresh))
    }

    fn alloc_node(&mut self, node: Node<T>) -> u32 {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index as usize] = node;
                index
            }
            None => {
                self.nodes.push(node);
                (self.nodes.len() - 1) as u32
            }
        }
    }

    /// Free `top` and the single-child chain hanging below it.
    fn release_path(&mut self, top: u32) {
        let mut next = Some(top);
        while let Some(index) = next {
            let node = mem::replace(&mut self.nodes[index as usize], Node::empty());
            debug_assert!(node.children.len() <= 1, "released a branching node");
            next = node.children.first().map(|&(_, c)| c);
            self.free.push(index);
        }
    }
}

impl<T> Default for TrieStore<T> {
    fn default() -> Self { Self::new() }
}

impl<T> std::fmt::Debug for TrieStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrieStore")
            .field("len", &self.len)
            .field("nodes", &self.node_count())
            .finish()
    }
}

/// Depth-first iterator over `(key, slot)` pairs in ascending key order.
pub struct Iter<'a, T> {
    trie: &'a TrieStore<T>,
    /// (node, index of the next child to visit)
    stack: Vec<(u32, usize)>,
    /// Bytes on the path to the top of `stack`
    key: Vec<u8>,
    /// Start node's own slot has not been reported yet
    at_start: bool,
    /// Entries left, when known up front
    remaining: Option<usize>,
}

impl<'a, T> Iter<'a, T> {
    fn start_at(trie: &'a TrieStore<T>, node: u32, key: Vec<u8>, remaining: Option<usize>) -> Self {
        Self { trie, stack: vec![(node, 0)], key, at_start: true, remaining }
    }

    fn exhausted(trie: &'a TrieStore<T>) -> Self {
        Self { trie, stack: Vec::new(), key: Vec::new(), at_start: false, remaining: Some(0) }
    }

    fn emit(&mut self, slot: &'a T) -> Option<(Vec<u8>, &'a T)> {
        if let Some(r) = self.remaining.as_mut() {
            *r = r.saturating_sub(1);
        }
        Some((self.key.clone(), slot))
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Vec<u8>, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let trie: &'a TrieStore<T> = self.trie;
        let nodes = &trie.nodes;
        if self.at_start {
            self.at_start = false;
            let &(start, _) = self.stack.last()?;
            if let Some(slot) = nodes[start as usize].slot.as_ref() {
                return self.emit(slot);
            }
        }

        loop {
            let (node, next_child) = self.stack.last_mut()?;
            let children = &nodes[*node as usize].children;
            if let Some(&(byte, child)) = children.get(*next_child) {
                *next_child += 1;
                self.key.push(byte);
                self.stack.push((child, 0));
                if let Some(slot) = nodes[child as usize].slot.as_ref() {
                    return self.emit(slot);
                }
            } else {
                self.stack.pop();
                self.key.pop();
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining {
            Some(r) => (r, Some(r)),
            None => (0, Some(self.trie.len)),
        }
    }
}

/// Iterator over keys in ascending byte order.
pub struct Keys<'a, T> {
    inner: Iter<'a, T>,
}

impl<'a, T> Iterator for Keys<'a, T> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie_of(keys: &[&[u8]]) -> TrieStore<usize> {
        let mut trie = TrieStore::new();
        for (i, k) in keys.iter().enumerate() {
            trie.insert_or_update(k, i).unwrap();
        }
        trie
    }

    #[test]
    fn test_empty() {
        let trie: TrieStore<u32> = TrieStore::new();
        assert!(trie.is_empty());
        assert!(!trie.exists(b"a"));
        assert_eq!(trie.enumerate().unwrap(), Vec::<Vec<u8>>::new());
        assert_eq!(trie.node_count(), 1);
    }

    #[test]
    fn test_insert_lookup() {
        let mut trie = TrieStore::new();
        assert_eq!(trie.insert_or_update(b"hello", 7u32).unwrap(), Upsert::Inserted);
        assert!(trie.exists(b"hello"));
        assert_eq!(trie.lookup(b"hello"), Some(&7));
        assert_eq!(trie.lookup(b"hell"), None);
        assert_eq!(trie.lookup(b"helloo"), None);
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_update_in_place() {
        let mut trie = TrieStore::new();
        trie.insert_or_update(b"k", 1u32).unwrap();
        assert_eq!(trie.insert_or_update(b"k", 2).unwrap(), Upsert::Updated { previous: 1 });
        assert_eq!(trie.lookup(b"k"), Some(&2));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_lookup_mut() {
        let mut trie = trie_of(&[b"x"]);
        *trie.lookup_mut(b"x").unwrap() = 42;
        assert_eq!(trie.lookup(b"x"), Some(&42));
        assert!(trie.lookup_mut(b"y").is_none());
    }

    #[test]
    fn test_empty_key_is_a_key() {
        let mut trie = TrieStore::new();
        trie.insert_or_update(b"", 1u8).unwrap();
        trie.insert_or_update(b"a", 2).unwrap();
        assert!(trie.exists(b""));
        assert_eq!(trie.enumerate().unwrap(), vec![b"".to_vec(), b"a".to_vec()]);
        assert_eq!(trie.remove(b""), Some(1));
        assert_eq!(trie.enumerate().unwrap(), vec![b"a".to_vec()]);
    }

    #[test]
    fn test_enumerate_sorted() {
        let trie = trie_of(&[b"b", b"a", b"c", b"ab", b"abc", b"\xff", b"\x00"]);
        let keys = trie.enumerate().unwrap();
        assert_eq!(
            keys,
            vec![
                b"\x00".to_vec(),
                b"a".to_vec(),
                b"ab".to_vec(),
                b"abc".to_vec(),
                b"b".to_vec(),
                b"c".to_vec(),
                b"\xff".to_vec(),
            ]
        );
        assert_eq!(keys.len(), trie.len());
    }

    #[test]
    fn test_remove_prunes() {
        let mut trie = trie_of(&[b"abc"]);
        assert_eq!(trie.node_count(), 4);
        assert_eq!(trie.remove(b"abc"), Some(0));
        assert_eq!(trie.node_count(), 1);
        assert!(trie.is_empty());
        assert_eq!(trie.enumerate().unwrap(), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn test_remove_keeps_prefix_and_siblings() {
        let mut trie = trie_of(&[b"ab", b"abcd", b"abx"]);
        assert_eq!(trie.remove(b"abcd"), Some(1));
        assert!(trie.exists(b"ab"));
        assert!(trie.exists(b"abx"));
        assert!(!trie.exists(b"abc"));
        assert_eq!(trie.enumerate().unwrap(), vec![b"ab".to_vec(), b"abx".to_vec()]);
        // "c" and "d" nodes are freed; root, a, b, x remain
        assert_eq!(trie.node_count(), 4);
    }

    #[test]
    fn test_remove_interior_key_keeps_extensions() {
        let mut trie = trie_of(&[b"ab", b"abc"]);
        assert_eq!(trie.remove(b"ab"), Some(0));
        assert!(!trie.exists(b"ab"));
        assert!(trie.exists(b"abc"));
        assert_eq!(trie.node_count(), 4);
    }

    #[test]
    fn test_remove_missing() {
        let mut trie = trie_of(&[b"abc"]);
        assert_eq!(trie.remove(b"ab"), None);
        assert_eq!(trie.remove(b"abd"), None);
        assert_eq!(trie.remove(b"abcd"), None);
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_freed_nodes_reused() {
        let mut trie = trie_of(&[b"abc"]);
        trie.remove(b"abc");
        let before = trie.memory_usage();
        trie.insert_or_update(b"xyz", 9).unwrap();
        assert_eq!(trie.node_count(), 4);
        assert_eq!(trie.memory_usage(), before);
    }

    #[test]
    fn test_oversized_key_rejected() {
        let mut config = Config::standard();
        config.max_key_size = Some(4);
        let mut trie = TrieStore::with_config(&config).unwrap();
        trie.insert_or_update(b"four", 1u8).unwrap();
        let err = trie.insert_or_update(b"fiver", 2).unwrap_err();
        assert_eq!(err, StoreError::OversizedKey { len: 5, max: 4 });
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_long_keys_enumerate() {
        let long_a = vec![b'a'; 1_000_100];
        let mut long_b = long_a.clone();
        long_b.push(b'b');
        let mut trie = TrieStore::new();
        trie.insert_or_update(&long_b, 2u8).unwrap();
        trie.insert_or_update(&long_a, 1).unwrap();
        let keys = trie.enumerate().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], long_a);
        assert_eq!(keys[1], long_b);
    }

    #[test]
    fn test_prefix_queries() {
        let trie = trie_of(&[b"base::c", b"base::a", b"stats::sd", b"base", b"bas"]);
        let under: Vec<_> = trie.keys_with_prefix(b"base").collect();
        assert_eq!(under, vec![b"base".to_vec(), b"base::a".to_vec(), b"base::c".to_vec()]);
        assert_eq!(trie.prefix_count(b"base"), 3);
        assert_eq!(trie.prefix_count(b"b"), 4);
        assert_eq!(trie.prefix_count(b""), 5);
        assert_eq!(trie.prefix_count(b"zzz"), 0);
        assert_eq!(trie.keys_with_prefix(b"zzz").count(), 0);
    }

    #[test]
    fn test_iter_pairs_and_size_hint() {
        let trie = trie_of(&[b"b", b"a"]);
        let it = trie.iter();
        assert_eq!(it.size_hint(), (2, Some(2)));
        let pairs: Vec<_> = it.collect();
        assert_eq!(pairs, vec![(b"a".to_vec(), &1), (b"b".to_vec(), &0)]);
    }

    #[test]
    fn test_clear() {
        let mut trie = trie_of(&[b"a", b"bc"]);
        trie.clear();
        assert!(trie.is_empty());
        assert_eq!(trie.node_count(), 1);
        assert!(!trie.exists(b"a"));
        trie.insert_or_update(b"a", 3).unwrap();
        assert_eq!(trie.lookup(b"a"), Some(&3));
    }
}
