//! The set of solutions found before exhaustion does not depend on the
//! number of evaluation workers. Only ties may come out in another order.

use std::time::Duration;

use wayfinder_harness::evaluators::{AStar, Delayed, PathCost};
use wayfinder_harness::worlds::balanced::{BalancedTree, Branch};
use wayfinder_search::{BestFirstSearch, NodeEvaluator, SearchPolicy, TerminationReason};

type Key = (Vec<u32>, u64);

fn all_solutions<E>(tree: &BalancedTree, evaluator: E, parallelism: usize) -> Vec<Key>
where
    E: NodeEvaluator<Branch, u32, Score = u64>,
{
    let policy = SearchPolicy {
        parallelism,
        ..SearchPolicy::default()
    };
    let mut search = BestFirstSearch::with_policy(tree.clone(), evaluator, policy).unwrap();
    let keys: Vec<Key> = search
        .solutions()
        .map(|s| {
            let s = s.unwrap();
            (s.path.actions().copied().collect(), s.score)
        })
        .collect();
    assert_eq!(search.termination(), Some(TerminationReason::FrontierExhausted));
    keys
}

fn sorted(mut keys: Vec<Key>) -> Vec<Key> {
    keys.sort();
    keys
}

#[test]
fn solution_sets_agree_across_worker_counts() {
    let tree = BalancedTree::new(3, 4, 42);
    let sequential = all_solutions(&tree, AStar::new(tree.clone()), 1);
    assert_eq!(sequential.len() as u64, tree.leaf_count());

    for k in [2, 4, 8] {
        let parallel = all_solutions(&tree, AStar::new(tree.clone()), k);
        let scores: Vec<u64> = parallel.iter().map(|(_, s)| *s).collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]), "k={k}");
        assert_eq!(sorted(parallel), sorted(sequential.clone()), "k={k}");
    }
}

#[test]
fn slow_evaluations_do_not_change_the_set() {
    let tree = BalancedTree::new(2, 4, 3);
    let slow = |k| {
        all_solutions(&tree, Delayed::new(PathCost, Duration::from_millis(1)), k)
    };
    let sequential = slow(1);
    let parallel = slow(4);
    assert_eq!(sorted(parallel), sorted(sequential));
}

#[test]
fn sequential_runs_repeat_exactly() {
    let tree = BalancedTree::new(3, 3, 9);
    let first = all_solutions(&tree, PathCost, 1);
    let second = all_solutions(&tree, PathCost, 1);
    assert_eq!(first, second);
}
