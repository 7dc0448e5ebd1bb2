//! MCTS tree arena and per-edge reward statistics.

use serde::Serialize;

use crate::contract::Expansion;
use crate::node::{NodeId, NodePath};

/// Visit count plus online mean and variance (Welford) of backed-up rewards.
///
/// Stored on the child node, so each entry describes one (parent, action)
/// pair. The root's entry counts the root's own visits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RewardStats {
    visits: u64,
    mean: f64,
    m2: f64,
}

impl RewardStats {
    pub fn record(&mut self, reward: f64) {
        self.visits += 1;
        #[allow(clippy::cast_precision_loss)]
        let n = self.visits as f64;
        let delta = reward - self.mean;
        self.mean += delta / n;
        self.m2 += delta * (reward - self.mean);
    }

    #[must_use]
    pub fn visits(&self) -> u64 {
        self.visits
    }

    /// Mean reward; 0 before the first visit.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance; 0 with fewer than two visits.
    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.visits < 2 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let n = (self.visits - 1) as f64;
            self.m2 / n
        }
    }
}

/// One node of the MCTS tree.
#[derive(Debug)]
pub struct TreeNode<S, A> {
    state: S,
    parent: Option<NodeId>,
    action: Option<A>,
    depth: u32,
    children: Vec<NodeId>,
    /// Successors not yet added as children. `None` until first generated.
    untried: Option<Vec<Expansion<S, A>>>,
    goal: bool,
    exhausted: bool,
    stats: RewardStats,
}

impl<S, A> TreeNode<S, A> {
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn action(&self) -> Option<&A> {
        self.action.as_ref()
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[must_use]
    pub fn is_goal(&self) -> bool {
        self.goal
    }

    /// Whether every path below this node has been enumerated in the tree.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    #[must_use]
    pub fn stats(&self) -> &RewardStats {
        &self.stats
    }

    /// Whether successors have been generated.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.untried.is_some()
    }

    /// Successors generated but not yet in the tree.
    #[must_use]
    pub fn untried_len(&self) -> usize {
        self.untried.as_ref().map_or(0, Vec::len)
    }

    /// Generated, fully expanded into the tree, and without children:
    /// a goal or a dead end.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.goal || (self.untried.as_ref().is_some_and(Vec::is_empty) && self.children.is_empty())
    }
}

/// Arena of MCTS nodes. Node 0 is the root.
#[derive(Debug)]
pub struct MctsTree<S, A> {
    nodes: Vec<TreeNode<S, A>>,
}

impl<S, A> MctsTree<S, A> {
    #[must_use]
    pub fn new(root: S, goal: bool) -> Self {
        Self {
            nodes: vec![TreeNode {
                state: root,
                parent: None,
                action: None,
                depth: 0,
                children: Vec::new(),
                untried: if goal { Some(Vec::new()) } else { None },
                goal,
                exhausted: false,
                stats: RewardStats::default(),
            }],
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&TreeNode<S, A>> {
        self.nodes.get(index(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode<S, A>> {
        self.nodes.get_mut(index(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode<S, A>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::new(i as u64), n))
    }

    /// Record generated successors. Goals never get successors.
    pub(crate) fn set_untried(&mut self, id: NodeId, successors: Vec<Expansion<S, A>>) {
        if let Some(node) = self.get_mut(id) {
            if node.untried.is_none() {
                node.untried = Some(if node.goal { Vec::new() } else { successors });
            }
        }
    }

    /// Flag a node as a goal. Goals are terminal: pending successors are
    /// dropped.
    pub(crate) fn mark_goal(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            node.goal = true;
            node.untried = Some(Vec::new());
        }
    }

    /// Move untried successor `pick` into the tree as a new child.
    pub(crate) fn expand(&mut self, parent: NodeId, pick: usize, goal: bool) -> Option<NodeId> {
        let id = NodeId::new(self.nodes.len() as u64);
        let node = self.get_mut(parent)?;
        let untried = node.untried.as_mut()?;
        if pick >= untried.len() {
            return None;
        }
        let expansion = untried.swap_remove(pick);
        node.children.push(id);
        let depth = node.depth + 1;
        self.nodes.push(TreeNode {
            state: expansion.state,
            parent: Some(parent),
            action: Some(expansion.action),
            depth,
            children: Vec::new(),
            untried: if goal { Some(Vec::new()) } else { None },
            goal,
            exhausted: false,
            stats: RewardStats::default(),
        });
        Some(id)
    }

    /// Node ids from the root down to `leaf`.
    #[must_use]
    pub fn path_ids(&self, leaf: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut current = Some(leaf);
        while let Some(id) = current {
            let Some(node) = self.get(id) else { break };
            ids.push(id);
            current = node.parent;
        }
        ids.reverse();
        ids
    }

    /// Fold `reward` into every edge on the root-to-`leaf` path.
    pub(crate) fn backpropagate(&mut self, leaf: NodeId, reward: f64) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let Some(node) = self.get_mut(id) else { break };
            node.stats.record(reward);
            current = node.parent;
        }
    }

    /// Mark `id` exhausted if it is terminal or all its children are, then
    /// repeat for its ancestors. Returns `true` once the root is exhausted.
    pub(crate) fn propagate_exhaustion(&mut self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            let Some(node) = self.get(cur) else { break };
            let done = node.exhausted
                || node.is_terminal()
                || (node.untried.as_ref().is_some_and(Vec::is_empty)
                    && node
                        .children
                        .iter()
                        .all(|c| self.get(*c).is_some_and(|n| n.exhausted)));
            if !done {
                break;
            }
            let parent = node.parent;
            if let Some(node) = self.get_mut(cur) {
                node.exhausted = true;
            }
            current = parent;
        }
        self.get(self.root()).is_some_and(|r| r.exhausted)
    }
}

impl<S: Clone, A: Clone> MctsTree<S, A> {
    /// Detached root-to-`leaf` path of states and actions.
    #[must_use]
    pub fn path(&self, leaf: NodeId) -> Option<NodePath<S, A>> {
        let ids = self.path_ids(leaf);
        let (first, rest) = ids.split_first()?;
        let mut path = NodePath::from_root(self.get(*first)?.state.clone());
        for id in rest {
            let node = self.get(*id)?;
            path.push(node.state.clone(), node.action.clone()?);
        }
        Some(path)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn index(id: NodeId) -> usize {
    id.as_u64() as usize
}
