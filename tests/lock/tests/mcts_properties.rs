//! MCTS visit accounting, exhaustion and reproducibility.

use wayfinder_harness::evaluators::GoalReward;
use wayfinder_harness::runner::run_mcts;
use wayfinder_harness::worlds::balanced::{BalancedTree, Branch};
use wayfinder_search::mcts::{MctsTermination, MctsTree, PlayoutEnd};
use wayfinder_search::{EngineState, MctsConfig, MctsEvent, MctsSearch};

fn config(seed: u64, rollout_parallelism: usize) -> MctsConfig {
    MctsConfig {
        seed,
        rollout_parallelism,
        ..MctsConfig::default()
    }
}

/// Every node with children was visited once on its own, then once per
/// child visit.
fn assert_visit_accounting(tree: &MctsTree<Branch, u32>) {
    for (id, node) in tree.iter() {
        if node.children().is_empty() {
            continue;
        }
        let child_visits: u64 = node
            .children()
            .iter()
            .map(|c| tree.get(*c).unwrap().stats().visits())
            .sum();
        assert_eq!(child_visits, node.stats().visits() - 1, "node {id}");
    }
}

#[test]
fn every_root_child_is_tried_before_any_is_revisited() {
    let tree = BalancedTree::new(5, 3, 2);
    let mut search = MctsSearch::with_config(tree, GoalReward, config(1, 1)).unwrap();

    let report = search.run_iterations(5).unwrap();
    assert_eq!(report.children.len(), 5);
    assert!(report.children.iter().all(|c| c.visits == 1));

    let report = search.run_iterations(20).unwrap();
    assert!(report.children.iter().all(|c| c.visits >= 1));
    assert_eq!(report.root_visits, 26);
}

#[test]
fn child_visits_sum_to_parent_visits_minus_one() {
    for parallelism in [1, 4] {
        let tree = BalancedTree::new(4, 3, 6);
        let mut search =
            MctsSearch::with_config(tree, GoalReward, config(3, parallelism)).unwrap();
        let report = search.run_iterations(60).unwrap();

        assert_eq!(report.iterations, 60, "parallelism {parallelism}");
        assert_eq!(report.root_visits, 61);
        let root_children: u64 = report.children.iter().map(|c| c.visits).sum();
        assert_eq!(root_children, 60);
        search.with_tree(assert_visit_accounting).unwrap();
    }
}

#[test]
fn small_tree_is_exhausted_and_best_goal_is_the_cheapest_leaf() {
    let tree = BalancedTree::new(2, 3, 4);
    let cheapest = tree.leaf_costs()[0];
    let mut search = MctsSearch::with_config(tree, GoalReward, config(9, 1)).unwrap();

    let report = search.run_iterations(100).unwrap();
    assert_eq!(search.state(), EngineState::Inactive);
    assert_eq!(search.termination(), Some(MctsTermination::TreeExhausted));
    assert!(report.exhausted);
    assert_eq!(report.tree_size, 15);
    assert_eq!(report.iterations, 14);
    assert_eq!(report.best_actions.len(), 3);

    let best = search.best_goal_playout().unwrap();
    assert_eq!(best.playout.end, PlayoutEnd::Goal);
    assert_eq!(best.playout.path.head().state().cost, cheapest);
    search.with_tree(assert_visit_accounting).unwrap();

    // An exhausted engine only reports.
    assert_eq!(search.run().unwrap().iterations, 14);
}

#[test]
fn same_seed_same_transcript() {
    for parallelism in [1, 4] {
        let digest = || {
            let run = run_mcts(BalancedTree::new(3, 4, 1), GoalReward, MctsConfig {
                iterations_per_call: 50,
                ..config(17, parallelism)
            })
            .unwrap();
            run.report_digest().unwrap()
        };
        assert_eq!(digest(), digest(), "parallelism {parallelism}");
    }
}

#[test]
fn cancel_from_an_observer_stops_the_batch() {
    let mut search =
        MctsSearch::with_config(BalancedTree::new(3, 5, 2), GoalReward, config(5, 1)).unwrap();
    let handle = search.cancel_handle();
    search.register_observer(move |event: &MctsEvent| {
        if let MctsEvent::PlayoutCompleted { playout: 10, .. } = event {
            handle.cancel();
        }
    });

    let report = search.run_iterations(1_000).unwrap();
    assert!(search.was_canceled());
    assert_eq!(search.termination(), None);
    assert_eq!(report.iterations, 10);
    assert_eq!(search.run().unwrap().iterations, 10);
}
