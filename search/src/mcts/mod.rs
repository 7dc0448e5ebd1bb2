//! Monte-Carlo tree search over the same [`crate::contract::GraphGenerator`]
//! contract as the best-first engine.
//!
//! Each iteration descends the tree with a [`TreePolicy`] (UCB1 by default),
//! adds one new node, plays out below it with a [`DefaultPolicy`], scores the
//! playout with a [`PlayoutEvaluator`] and backs the reward up the path.
//! Statistics live in an [`MctsTree`] owned by the engine; they are never
//! shared with the best-first engine.

pub mod config;
pub mod policy;
pub mod search;
pub mod tree;

pub use config::MctsConfig;
pub use policy::{
    DefaultPolicy, GreedyPolicy, Playout, PlayoutEnd, PlayoutEvaluator, TreePolicy, Ucb1,
    UniformRandomPolicy,
};
pub use search::{ChildReport, MctsEvent, MctsReport, MctsSearch, MctsTermination, ScoredPlayout};
pub use tree::{MctsTree, RewardStats, TreeNode};
