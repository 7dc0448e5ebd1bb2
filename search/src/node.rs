//! Search nodes, labeled paths, and the traversal-tree arena.
//!
//! Nodes never point at each other directly. Each node stores the
//! [`NodeId`] of its parent, and the [`TraversalTree`] arena resolves ids.
//! A solution is a [`NodePath`]: the chain of shared node handles from a root
//! down to the node, rebuilt by walking parent ids.

use std::sync::{Arc, OnceLock};

use crate::contract::{Expansion, NodeKind};
use crate::error::PruneReason;

/// Handle of a node inside a [`TraversalTree`]. Assigned in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[allow(clippy::cast_possible_truncation)]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// An immutable node of the traversal tree.
///
/// The goal flag is the only field written after construction, and it is
/// written at most once.
#[derive(Debug)]
pub struct SearchNode<S, A> {
    id: NodeId,
    parent: Option<NodeId>,
    depth: u32,
    state: S,
    action: Option<A>,
    kind: NodeKind,
    goal: OnceLock<bool>,
}

impl<S, A> SearchNode<S, A> {
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Parent handle (`None` for roots).
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Tree depth (roots are depth 0).
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Edge label that produced this node from its parent.
    #[must_use]
    pub fn action(&self) -> Option<&A> {
        self.action.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Whether the goal test accepted this node. `false` until tested.
    #[must_use]
    pub fn is_goal(&self) -> bool {
        self.goal.get().copied().unwrap_or(false)
    }

    /// Record the goal test verdict. Later calls are ignored.
    pub(crate) fn mark_goal(&self, goal: bool) {
        let _ = self.goal.set(goal);
    }
}

/// A root-to-node chain of shared node handles.
///
/// Cloning a path clones handles, not states.
#[derive(Debug)]
pub struct NodePath<S, A> {
    nodes: Vec<Arc<SearchNode<S, A>>>,
}

impl<S, A> Clone for NodePath<S, A> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
        }
    }
}

impl<S, A> NodePath<S, A> {
    /// A detached single-node path, for exercising evaluators outside a search.
    #[must_use]
    pub fn from_root(state: S) -> Self {
        Self {
            nodes: vec![Arc::new(SearchNode {
                id: NodeId(0),
                parent: None,
                depth: 0,
                state,
                action: None,
                kind: NodeKind::Or,
                goal: OnceLock::new(),
            })],
        }
    }

    /// Extend a detached path by one edge. Node ids follow depth.
    #[must_use]
    pub fn extended(&self, state: S, action: A) -> Self {
        let mut path = self.clone();
        path.push(state, action);
        path
    }

    /// In-place form of [`Self::extended`].
    pub fn push(&mut self, state: S, action: A) {
        let head = self.head();
        let (id, depth) = (head.id, head.depth);
        self.nodes.push(Arc::new(SearchNode {
            id: NodeId(u64::from(depth) + 1),
            parent: Some(id),
            depth: depth + 1,
            state,
            action: Some(action),
            kind: NodeKind::Or,
            goal: OnceLock::new(),
        }));
    }

    /// The last node of the path.
    #[must_use]
    pub fn head(&self) -> &SearchNode<S, A> {
        // Paths are built from at least one node by every constructor.
        &self.nodes[self.nodes.len() - 1]
    }

    #[must_use]
    pub fn root(&self) -> &SearchNode<S, A> {
        &self.nodes[0]
    }

    /// Number of nodes on the path (edges + 1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; a path holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SearchNode<S, A>> {
        self.nodes.iter().map(AsRef::as_ref)
    }

    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.nodes.iter().map(|n| &n.state)
    }

    /// Edge labels, root first. One shorter than [`Self::states`].
    pub fn actions(&self) -> impl Iterator<Item = &A> {
        self.nodes.iter().filter_map(|n| n.action.as_ref())
    }

    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }
}

/// Lifecycle of a node inside the traversal tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    /// Created; evaluation not finished yet.
    Pending,
    /// Scored and sitting on the frontier.
    Open,
    /// Popped and expanded.
    Expanded,
    /// Popped as a goal and reported as a solution.
    Solution,
    /// Discarded without entering the frontier.
    Pruned(PruneReason),
}

/// Arena entry: the shared node plus the bookkeeping owned by the engine.
#[derive(Debug)]
pub struct NodeRecord<S, A, V> {
    node: Arc<SearchNode<S, A>>,
    score: Option<V>,
    status: NodeStatus,
    children: Vec<NodeId>,
}

impl<S, A, V> NodeRecord<S, A, V> {
    #[must_use]
    pub fn node(&self) -> &SearchNode<S, A> {
        &self.node
    }

    /// Evaluation label; `None` until scored (and forever, if pruned).
    #[must_use]
    pub fn score(&self) -> Option<&V> {
        self.score.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> &NodeStatus {
        &self.status
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// The tree of every node created during a search, indexed by [`NodeId`].
///
/// Owned by the control thread. Nodes are retained for the whole run so any
/// node's path can be rebuilt. The same domain state may appear at several
/// nodes; the tree does not deduplicate.
#[derive(Debug)]
pub struct TraversalTree<S, A, V> {
    records: Vec<NodeRecord<S, A, V>>,
    roots: Vec<NodeId>,
}

impl<S, A, V> Default for TraversalTree<S, A, V> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            roots: Vec::new(),
        }
    }
}

impl<S, A, V> TraversalTree<S, A, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> NodeId {
        NodeId(self.records.len() as u64)
    }

    /// Add a root node.
    pub fn add_root(&mut self, state: S) -> NodeId {
        let id = self.next_id();
        self.records.push(NodeRecord {
            node: Arc::new(SearchNode {
                id,
                parent: None,
                depth: 0,
                state,
                action: None,
                kind: NodeKind::Or,
                goal: OnceLock::new(),
            }),
            score: None,
            status: NodeStatus::Pending,
            children: Vec::new(),
        });
        self.roots.push(id);
        id
    }

    /// Add the child described by `expansion` under `parent`.
    ///
    /// Returns `None` if `parent` is not part of this tree.
    pub fn add_child(&mut self, parent: NodeId, expansion: Expansion<S, A>) -> Option<NodeId> {
        let depth = self.records.get(parent.index())?.node.depth + 1;
        let id = self.next_id();
        self.records.push(NodeRecord {
            node: Arc::new(SearchNode {
                id,
                parent: Some(parent),
                depth,
                state: expansion.state,
                action: Some(expansion.action),
                kind: expansion.kind,
                goal: OnceLock::new(),
            }),
            score: None,
            status: NodeStatus::Pending,
            children: Vec::new(),
        });
        self.records[parent.index()].children.push(id);
        Some(id)
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeRecord<S, A, V>> {
        self.records.get(id.index())
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SearchNode<S, A>> {
        self.get(id).map(NodeRecord::node)
    }

    /// Shared handle of a node (cheap to send to worker threads).
    #[must_use]
    pub fn handle(&self, id: NodeId) -> Option<Arc<SearchNode<S, A>>> {
        self.get(id).map(|r| Arc::clone(&r.node))
    }

    /// Rebuild the root-to-`id` path by walking parent ids.
    #[must_use]
    pub fn path_to(&self, id: NodeId) -> Option<NodePath<S, A>> {
        let mut nodes = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let record = self.get(cur)?;
            nodes.push(Arc::clone(&record.node));
            current = record.node.parent;
        }
        nodes.reverse();
        Some(NodePath { nodes })
    }

    pub(crate) fn set_score(&mut self, id: NodeId, score: V) {
        if let Some(r) = self.records.get_mut(id.index()) {
            r.score = Some(score);
        }
    }

    pub(crate) fn set_status(&mut self, id: NodeId, status: NodeStatus) {
        if let Some(r) = self.records.get_mut(id.index()) {
            r.status = status;
        }
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord<S, A, V>> {
        self.records.iter()
    }
}
