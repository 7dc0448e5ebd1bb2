//! Graph generator contract.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;
use crate::node::NodePath;

/// Classification of a child produced by successor generation.
///
/// Carried through to node-reached events for observers. The engines treat
/// both kinds alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Or,
    And,
}

/// One child produced by expanding a parent: the child state, the edge label
/// from the parent, and the child classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion<S, A> {
    pub state: S,
    pub action: A,
    pub kind: NodeKind,
}

impl<S, A> Expansion<S, A> {
    /// An `Or` child.
    #[must_use]
    pub fn new(state: S, action: A) -> Self {
        Self {
            state,
            action,
            kind: NodeKind::Or,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Lazily discovered search graph.
///
/// # Contract
///
/// - `successors` must be a pure function of its input: the same state
///   yields the same set of children (order may vary), and no shared state is
///   mutated. It may be called concurrently for distinct states.
/// - `successors` must terminate. Expanding one node is not a search.
/// - Returning `Err` (or panicking) from `roots` or `successors` is a contract
///   violation. The engine stops and surfaces it to the caller.
pub trait GraphGenerator: Send + Sync + 'static {
    type State: Clone + Debug + Send + Sync + 'static;
    type Action: Clone + Debug + Send + Sync + 'static;

    /// Identifier used in logs and transcripts.
    fn generator_id(&self) -> &str;

    /// Produce the initial states. An empty list is allowed; the search is
    /// then exhausted immediately.
    ///
    /// # Errors
    ///
    /// Any error is treated as a contract violation.
    fn roots(&self) -> Result<Vec<Self::State>, GeneratorError>;

    /// Produce the children of `state`. An empty list marks a dead end.
    ///
    /// # Errors
    ///
    /// Any error is treated as a contract violation.
    fn successors(
        &self,
        state: &Self::State,
    ) -> Result<Vec<Expansion<Self::State, Self::Action>>, GeneratorError>;

    /// State-local goal test.
    fn is_goal(&self, state: &Self::State) -> bool;

    /// Whole-path goal test, for problems where goal-ness depends on how the
    /// head state was reached. Defaults to [`Self::is_goal`] on the head.
    fn is_goal_path(&self, path: &NodePath<Self::State, Self::Action>) -> bool {
        self.is_goal(path.head().state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown;

    impl GraphGenerator for Countdown {
        type State = u32;
        type Action = ();

        fn generator_id(&self) -> &str {
            "countdown"
        }

        fn roots(&self) -> Result<Vec<u32>, GeneratorError> {
            Ok(vec![3])
        }

        fn successors(&self, state: &u32) -> Result<Vec<Expansion<u32, ()>>, GeneratorError> {
            Ok(state
                .checked_sub(1)
                .map(|s| Expansion::new(s, ()))
                .into_iter()
                .collect())
        }

        fn is_goal(&self, state: &u32) -> bool {
            *state == 0
        }
    }

    #[test]
    fn default_path_goal_test_checks_head() {
        let g = Countdown;
        let path = NodePath::from_root(1).extended(0, ());
        assert!(g.is_goal_path(&path));
        assert!(!g.is_goal_path(&NodePath::from_root(2)));
    }

    #[test]
    fn expansion_kind_defaults_to_or() {
        let e = Expansion::new(1u8, 'x');
        assert_eq!(e.kind, NodeKind::Or);
        assert_eq!(e.with_kind(NodeKind::And).kind, NodeKind::And);
    }
}
