//! Shared workloads for the wayfinder benchmark suites.

use std::time::Duration;

use wayfinder_harness::canon::canonical_json_bytes;
use wayfinder_harness::evaluators::{AStar, Delayed, GoalReward};
use wayfinder_harness::worlds::balanced::BalancedTree;
use wayfinder_search::{BestFirstSearch, MctsConfig, MctsSearch, SearchPolicy};

/// Branching factor and depth of the engine workloads.
pub const WORKLOADS: &[(u32, u32)] = &[(3, 5), (6, 3), (10, 2)];

/// Enumerate every solution of `tree` with A* at `parallelism` workers and
/// return how many there were.
///
/// `delay` wraps the evaluator in [`Delayed`] to model an expensive scorer.
///
/// # Panics
///
/// Panics if the search fails; the balanced tree never violates its
/// contract, so a failure is a bug worth stopping the run for.
#[must_use]
pub fn solve_all(tree: &BalancedTree, parallelism: usize, delay: Duration) -> usize {
    let policy = SearchPolicy {
        parallelism,
        ..SearchPolicy::default()
    };
    let evaluator = Delayed::new(AStar::new(tree.clone()), delay);
    let mut search = BestFirstSearch::with_policy(tree.clone(), evaluator, policy)
        .expect("benchmark policy is valid");
    search
        .solutions()
        .map(|s| s.expect("balanced tree search does not fail"))
        .count()
}

/// Run `iterations` MCTS playouts over `tree` and return the tree size.
///
/// # Panics
///
/// As for [`solve_all`].
#[must_use]
pub fn mcts_batch(tree: &BalancedTree, iterations: u64, rollout_parallelism: usize) -> usize {
    let config = MctsConfig {
        iterations_per_call: iterations,
        rollout_parallelism,
        seed: 7,
        ..MctsConfig::default()
    };
    let mut search = MctsSearch::with_config(tree.clone(), GoalReward, config)
        .expect("benchmark config is valid");
    search.run().expect("balanced tree search does not fail").tree_size
}

/// A representative transcript line, for canonicalization benchmarks.
///
/// # Panics
///
/// Never for the fixed value built here.
#[must_use]
pub fn sample_event_line(successors: usize) -> Vec<u8> {
    let value = serde_json::json!({
        "event": "solution_found",
        "nodes": (0..successors as u64).collect::<Vec<_>>(),
        "actions": (0..successors as u64).map(|i| i % 4).collect::<Vec<_>>(),
        "score": 1_234,
    });
    canonical_json_bytes(&value).expect("integers only")
}
