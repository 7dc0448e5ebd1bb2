//! Best-first frontier (open set).
//!
//! Entries are ordered by score, lowest first, with insertion order breaking
//! exact ties (FIFO). To maximize, score with `std::cmp::Reverse`.
//!
//! [`SharedFrontier`] puts a single global lock around the heap. Workers
//! insert through it concurrently while the control thread pops.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::node::NodeId;

/// Total order of a frontier entry: score, then insertion sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct FrontierKey<V> {
    score: V,
    seq: u64,
}

/// `BinaryHeap` is a max-heap, so we wrap the key in `Reverse` to get
/// min-heap behavior.
#[derive(Debug)]
struct HeapEntry<V> {
    key: Reverse<FrontierKey<V>>,
    node: NodeId,
}

impl<V: Ord> PartialEq for HeapEntry<V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<V: Ord> Eq for HeapEntry<V> {}

impl<V: Ord> PartialOrd for HeapEntry<V> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<V: Ord> Ord for HeapEntry<V> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// A node paired with its evaluation score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry<V> {
    pub node: NodeId,
    pub score: V,
}

/// Priority queue of scored nodes.
///
/// Maintains:
/// - A `BinaryHeap` for O(log n) pop of the best node
/// - A `HashSet<NodeId>` of enqueued nodes, so no node appears twice
///
/// Membership is by node, not by domain state: two nodes carrying equal
/// states coexist.
#[derive(Debug)]
pub struct Frontier<V> {
    heap: BinaryHeap<HeapEntry<V>>,
    members: HashSet<NodeId>,
    next_seq: u64,
    inserted: u64,
    high_water: u64,
}

impl<V: Ord> Frontier<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            members: HashSet::new(),
            next_seq: 0,
            inserted: 0,
            high_water: 0,
        }
    }

    /// Insert a scored node.
    ///
    /// Returns `false` if the node is already enqueued (not added again).
    pub fn push(&mut self, node: NodeId, score: V) -> bool {
        if !self.members.insert(node) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.inserted += 1;
        self.heap.push(HeapEntry {
            key: Reverse(FrontierKey { score, seq }),
            node,
        });
        let size = self.heap.len() as u64;
        if size > self.high_water {
            self.high_water = size;
        }
        true
    }

    /// Remove the best (lowest score, earliest inserted) entry.
    pub fn pop(&mut self) -> Option<FrontierEntry<V>> {
        let entry = self.heap.pop()?;
        self.members.remove(&entry.node);
        let Reverse(FrontierKey { score, .. }) = entry.key;
        Some(FrontierEntry {
            node: entry.node,
            score,
        })
    }

    /// The entry [`Self::pop`] would return next.
    #[must_use]
    pub fn peek(&self) -> Option<(NodeId, &V)> {
        self.heap.peek().map(|e| (e.node, &e.key.0.score))
    }

    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// High-water mark of frontier size.
    #[must_use]
    pub fn high_water(&self) -> u64 {
        self.high_water
    }

    /// Total number of successful inserts over the frontier's lifetime.
    #[must_use]
    pub fn inserted(&self) -> u64 {
        self.inserted
    }
}

impl<V: Ord + Clone> Frontier<V> {
    /// Every entry, in the order they would be popped.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FrontierEntry<V>> {
        let mut keys: Vec<(&FrontierKey<V>, NodeId)> =
            self.heap.iter().map(|e| (&e.key.0, e.node)).collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));
        keys.into_iter()
            .map(|(k, node)| FrontierEntry {
                node,
                score: k.score.clone(),
            })
            .collect()
    }
}

impl<V: Ord> Default for Frontier<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`Frontier`] behind one global lock, shared by the control thread and
/// scheduler workers.
#[derive(Debug)]
pub struct SharedFrontier<V> {
    inner: Arc<Mutex<Frontier<V>>>,
}

impl<V> Clone for SharedFrontier<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Ord> SharedFrontier<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Frontier::new())),
        }
    }

    /// See [`Frontier::push`].
    pub fn push(&self, node: NodeId, score: V) -> bool {
        self.inner.lock().push(node, score)
    }

    pub fn pop(&self) -> Option<FrontierEntry<V>> {
        self.inner.lock().pop()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    #[must_use]
    pub fn high_water(&self) -> u64 {
        self.inner.lock().high_water()
    }

    /// Run `f` with the lock held.
    pub fn with<R>(&self, f: impl FnOnce(&Frontier<V>) -> R) -> R {
        f(&self.inner.lock())
    }
}

impl<V: Ord + Clone> SharedFrontier<V> {
    #[must_use]
    pub fn snapshot(&self) -> Vec<FrontierEntry<V>> {
        self.inner.lock().snapshot()
    }
}

impl<V: Ord> Default for SharedFrontier<V> {
    fn default() -> Self {
        Self::new()
    }
}
