//! Wayfinder Search: lazy best-first (A*-style) search and Monte-Carlo tree
//! search over caller-supplied graphs.
//!
//! The graph is never materialized up front. A [`GraphGenerator`] supplies
//! roots, successors and the goal test on demand; a [`NodeEvaluator`] scores
//! nodes, possibly slowly, on a bounded worker pool with per-node timeouts.
//! Solutions are produced one at a time, best first, until the frontier is
//! exhausted or the caller stops asking.
//!
//! # Crate dependency graph
//!
//! ```text
//! wayfinder-search  ←  wayfinder-harness  ←  lock-tests, wayfinder-benchmarks
//! (engines, frontier,   (worlds, evaluators,   (cross-crate acceptance
//!  scheduler, MCTS)      transcript, runner)    tests, criterion benches)
//! ```
//!
//! # Key types
//!
//! - [`BestFirstSearch`] — the anytime best-first engine ([`BestFirstSearch::next_solution`])
//! - [`GraphGenerator`] — roots, successors and goal test of the searched graph
//! - [`NodeEvaluator`] — scores a path; lower scores are expanded first
//! - [`Frontier`] / [`SharedFrontier`] — min-ordered open list with FIFO tie-break
//! - [`SearchPolicy`] — parallelism, timeouts and budgets
//! - [`SearchEvent`] / [`Observer`] — synchronous event stream
//! - [`MctsSearch`] — Monte-Carlo tree search with UCB1 selection

#![forbid(unsafe_code)]

pub mod cancel;
pub mod contract;
pub mod error;
pub mod event;
pub mod frontier;
pub mod mcts;
pub mod node;
pub mod policy;
mod scheduler;
pub mod scorer;
pub mod search;

pub use cancel::CancelHandle;
pub use contract::{Expansion, GraphGenerator, NodeKind};
pub use error::{EvaluationError, GeneratorError, GeneratorStage, PruneReason, SearchError};
pub use event::{Observer, ObserverRegistry, SearchEvent, Solution, TerminationReason};
pub use frontier::{Frontier, FrontierEntry, SharedFrontier};
pub use mcts::{MctsConfig, MctsEvent, MctsReport, MctsSearch};
pub use node::{NodeId, NodePath, NodeRecord, NodeStatus, SearchNode, TraversalTree};
pub use policy::SearchPolicy;
pub use scheduler::WORKER_NAME_PREFIX;
pub use scorer::{
    Evaluation, EvaluationContext, FnEvaluator, NodeEvaluator, SolutionReports, UniformEvaluator,
};
pub use search::{BestFirstSearch, EngineState, SearchStats, StepOutcome};
