//! Timeouts: the global search timeout ends the run with `Timeout`, and the
//! per-node budget can be set, changed and cleared through the engine.

use std::time::{Duration, Instant};

use lock_tests::fixtures::{names, two_routes, Tally};
use wayfinder_harness::evaluators::{AStar, Delayed};
use wayfinder_harness::worlds::balanced::BalancedTree;
use wayfinder_harness::worlds::explicit::Waypoint;
use wayfinder_search::{
    BestFirstSearch, EngineState, Evaluation, EvaluationContext, EvaluationError, FnEvaluator,
    NodeEvaluator, NodePath, PruneReason, SearchPolicy, StepOutcome, TerminationReason,
};

/// Scores by path cost; the listed nodes take 40 ms and ignore interruption.
fn stalls_on(slow: Vec<u32>) -> impl NodeEvaluator<Waypoint, u32, Score = u64> {
    FnEvaluator::new(move |path: &NodePath<Waypoint, u32>, _: &EvaluationContext| {
        let head = path.head().state();
        if slow.contains(&head.node) {
            std::thread::sleep(Duration::from_millis(40));
        }
        Ok::<_, EvaluationError>(Evaluation::Score(head.cost))
    })
}

#[test]
fn global_timeout_from_policy_ends_with_timeout() {
    let tree = BalancedTree::new(3, 6, 11);
    let evaluator = Delayed::new(AStar::new(tree.clone()), Duration::from_millis(2));
    let policy = SearchPolicy {
        timeout_ms: Some(30),
        ..SearchPolicy::default()
    };
    let mut search = BestFirstSearch::with_policy(tree.clone(), evaluator, policy).unwrap();
    let tally = Tally::new();
    search.register_observer(tally.clone());

    let started = Instant::now();
    let found = search.solutions().map(Result::unwrap).count() as u64;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(found < tree.leaf_count());
    assert_eq!(search.termination(), Some(TerminationReason::Timeout));
    assert_eq!(tally.finished(), Some(TerminationReason::Timeout));
    assert_eq!(search.state(), EngineState::Inactive);
    assert!(search.next_solution().unwrap().is_none());
}

#[test]
fn global_timeout_set_on_the_engine_ends_with_timeout() {
    let tree = BalancedTree::new(3, 6, 12);
    let evaluator = Delayed::new(AStar::new(tree.clone()), Duration::from_millis(2));
    let mut search = BestFirstSearch::new(tree, evaluator);
    search.set_timeout(Some(Duration::from_millis(30))).unwrap();

    while search.next_solution().unwrap().is_some() {}
    assert_eq!(search.termination(), Some(TerminationReason::Timeout));
}

#[test]
fn node_timeout_set_before_activation_prunes_the_slow_child() {
    let graph = two_routes();
    let c = graph.node("C").unwrap();
    let mut search = BestFirstSearch::new(graph.clone(), stalls_on(vec![c]));
    search
        .set_node_evaluation_timeout(Some(Duration::from_millis(10)))
        .unwrap();

    let solutions: Vec<Vec<String>> = search
        .solutions()
        .map(|s| names(&graph, &s.unwrap()))
        .collect();
    assert_eq!(solutions, [["R", "A", "GA"]]);
    assert_eq!(search.stats().pruned_timed_out, 1);
}

#[test]
fn node_timeout_changed_between_steps_applies_to_later_batches() {
    let graph = two_routes();
    let slow = vec![graph.node("GA").unwrap(), graph.node("GC").unwrap()];
    let mut search = BestFirstSearch::new(graph.clone(), stalls_on(slow));
    let tally = Tally::new();
    search.register_observer(tally.clone());

    assert!(matches!(search.step().unwrap(), StepOutcome::Initialized { roots: 1 }));
    assert!(matches!(
        search.step().unwrap(),
        StepOutcome::Expanded { successors: 2, .. }
    ));

    // A is popped next (FIFO among equal scores); its goal child overruns.
    search
        .set_node_evaluation_timeout(Some(Duration::from_millis(5)))
        .unwrap();
    assert!(matches!(
        search.step().unwrap(),
        StepOutcome::Expanded { successors: 1, .. }
    ));
    assert_eq!(search.stats().pruned_timed_out, 1);

    // Without a budget the slow GC is scored normally.
    search.set_node_evaluation_timeout(None).unwrap();
    let solutions: Vec<Vec<String>> = search
        .solutions()
        .map(|s| names(&graph, &s.unwrap()))
        .collect();
    assert_eq!(solutions, [["R", "C", "GC"]]);

    let reasons: Vec<PruneReason> = tally.pruned().into_values().collect();
    assert_eq!(
        reasons,
        [PruneReason::TimedOut {
            budget: Duration::from_millis(5)
        }]
    );
}
