//! `BalancedTree`: a complete tree with pseudo-random edge weights.
//!
//! Node ids use heap numbering (children of `n` are `n*b + 1 ..= n*b + b`),
//! weights come from splitmix64 over the child id, and every leaf is a goal.
//! The shape is fixed by `(branching, depth, seed)`, which makes it the
//! workload for determinism checks and benchmarks.

use serde::Serialize;
use wayfinder_search::{Expansion, GeneratorError, GraphGenerator};

use super::{Costed, Heuristic};

/// Heaviest edge weight; weights are uniform in `1..=MAX_EDGE_WEIGHT`.
pub const MAX_EDGE_WEIGHT: u64 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Branch {
    pub id: u64,
    pub depth: u32,
    pub cost: u64,
}

impl Costed for Branch {
    fn cost(&self) -> u64 {
        self.cost
    }
}

#[derive(Debug, Clone)]
pub struct BalancedTree {
    id: String,
    branching: u32,
    depth: u32,
    seed: u64,
}

impl BalancedTree {
    #[must_use]
    pub fn new(branching: u32, depth: u32, seed: u64) -> Self {
        Self {
            id: format!("balanced-b{branching}-d{depth}-s{seed}"),
            branching,
            depth,
            seed,
        }
    }

    #[must_use]
    pub fn leaf_count(&self) -> u64 {
        u64::from(self.branching).saturating_pow(self.depth)
    }

    /// Weight of the edge into `child`.
    #[must_use]
    pub fn edge_weight(&self, child: u64) -> u64 {
        splitmix64(self.seed ^ child) % MAX_EDGE_WEIGHT + 1
    }

    fn children(&self, node: &Branch) -> impl Iterator<Item = (u32, Branch)> + '_ {
        let base = node.id * u64::from(self.branching);
        let depth = node.depth + 1;
        let cost = node.cost;
        (0..self.branching).map(move |i| {
            let id = base + u64::from(i) + 1;
            (
                i,
                Branch {
                    id,
                    depth,
                    cost: cost + self.edge_weight(id),
                },
            )
        })
    }

    /// Every root-to-leaf cost, ascending. Exponential in `depth`; a test
    /// oracle for small trees.
    #[must_use]
    pub fn leaf_costs(&self) -> Vec<u64> {
        let mut costs = Vec::new();
        let mut stack = vec![Branch {
            id: 0,
            depth: 0,
            cost: 0,
        }];
        while let Some(node) = stack.pop() {
            if node.depth == self.depth {
                costs.push(node.cost);
            } else {
                stack.extend(self.children(&node).map(|(_, child)| child));
            }
        }
        costs.sort_unstable();
        costs
    }
}

impl GraphGenerator for BalancedTree {
    type State = Branch;
    type Action = u32;

    fn generator_id(&self) -> &str {
        &self.id
    }

    fn roots(&self) -> Result<Vec<Branch>, GeneratorError> {
        Ok(vec![Branch {
            id: 0,
            depth: 0,
            cost: 0,
        }])
    }

    fn successors(&self, state: &Branch) -> Result<Vec<Expansion<Branch, u32>>, GeneratorError> {
        if state.depth >= self.depth {
            return Ok(Vec::new());
        }
        Ok(self
            .children(state)
            .map(|(i, child)| Expansion::new(child, i))
            .collect())
    }

    fn is_goal(&self, state: &Branch) -> bool {
        state.depth == self.depth
    }
}

/// One unit per remaining level: every edge weighs at least 1.
impl Heuristic<Branch> for BalancedTree {
    fn estimate(&self, state: &Branch) -> u64 {
        u64::from(self.depth.saturating_sub(state.depth))
    }
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_and_ids_follow_heap_numbering() {
        let tree = BalancedTree::new(3, 2, 11);
        let root = tree.roots().unwrap().remove(0);
        let kids = tree.successors(&root).unwrap();
        let ids: Vec<u64> = kids.iter().map(|e| e.state.id).collect();
        assert_eq!(ids, [1, 2, 3]);
        let grandkids = tree.successors(&kids[1].state).unwrap();
        let ids: Vec<u64> = grandkids.iter().map(|e| e.state.id).collect();
        assert_eq!(ids, [7, 8, 9]);
        assert!(grandkids.iter().all(|e| tree.is_goal(&e.state)));
        assert!(tree.successors(&grandkids[0].state).unwrap().is_empty());
    }

    #[test]
    fn weights_are_in_range_and_seeded() {
        let a = BalancedTree::new(4, 3, 1);
        let b = BalancedTree::new(4, 3, 2);
        assert!((1..=84).all(|id| (1..=MAX_EDGE_WEIGHT).contains(&a.edge_weight(id))));
        assert_ne!(a.leaf_costs(), b.leaf_costs());
        assert_eq!(a.leaf_costs(), BalancedTree::new(4, 3, 1).leaf_costs());
        assert_eq!(a.leaf_costs().len() as u64, a.leaf_count());
    }

    #[test]
    fn heuristic_never_overestimates() {
        let tree = BalancedTree::new(2, 4, 5);
        let root = tree.roots().unwrap().remove(0);
        assert_eq!(tree.estimate(&root), 4);
        assert!(tree.estimate(&root) <= tree.leaf_costs()[0]);
    }
}
