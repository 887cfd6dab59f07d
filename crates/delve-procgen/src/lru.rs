//! Access-ordered set of generated regions.

use std::hash::Hash;

use ahash::AHashMap;

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Hash index plus an intrusive doubly-linked recency list over a slab.
///
/// The head is the least recently used key, the tail the most recent.
#[derive(Debug)]
pub struct RegionCache<K> {
    index: AHashMap<K, usize>,
    slots: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K: Hash + Eq + Clone> Default for RegionCache<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone> RegionCache<K> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: AHashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether a key is present. Does not change recency.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Marks a key most recently used. Returns false if absent.
    pub fn touch(&mut self, key: &K) -> bool {
        match self.index.get(key).copied() {
            Some(slot) => {
                self.unlink(slot);
                self.push_back(slot);
                true
            },
            None => false,
        }
    }

    /// Inserts a key as most recently used. Returns false if it was already
    /// present, in which case it is only touched.
    pub fn insert(&mut self, key: K) -> bool {
        if self.touch(&key) {
            return false;
        }
        let node = Some(Node {
            key: key.clone(),
            prev: None,
            next: None,
        });
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = node;
                slot
            },
            None => {
                self.slots.push(node);
                self.slots.len() - 1
            },
        };
        self.index.insert(key, slot);
        self.push_back(slot);
        true
    }

    /// Removes and returns the least recently used key.
    pub fn pop_oldest(&mut self) -> Option<K> {
        let slot = self.head?;
        self.unlink(slot);
        let node = self.slots.get_mut(slot)?.take()?;
        self.free.push(slot);
        self.index.remove(&node.key);
        Some(node.key)
    }

    /// Removes a key. Returns false if absent.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(slot) = self.index.remove(key) else {
            return false;
        };
        self.unlink(slot);
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = None;
        }
        self.free.push(slot);
        true
    }

    /// Drops every key.
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keys from least to most recently used.
    #[must_use]
    pub fn keys_oldest_first(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(node) = cursor.and_then(|slot| self.node(slot)) {
            keys.push(&node.key);
            cursor = node.next;
        }
        keys
    }

    fn node(&self, slot: usize) -> Option<&Node<K>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node<K>> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    fn unlink(&mut self, slot: usize) {
        let Some((prev, next)) = self.node(slot).map(|n| (n.prev, n.next)) else {
            return;
        };
        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            },
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            },
            None => self.tail = prev,
        }
        if let Some(node) = self.node_mut(slot) {
            node.prev = None;
            node.next = None;
        }
    }

    fn push_back(&mut self, slot: usize) {
        let old_tail = self.tail;
        if let Some(node) = self.node_mut(slot) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(node) = self.node_mut(t) {
                    node.next = Some(slot);
                }
            },
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }
}
