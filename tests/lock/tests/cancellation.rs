//! Cancellation always ends the solution stream, never hangs, and leaves the
//! frontier consistent.

use std::collections::BTreeSet;
use std::thread;
use std::time::{Duration, Instant};

use lock_tests::fixtures::{nap, star, Tally};
use wayfinder_harness::evaluators::{AStar, PathCost};
use wayfinder_harness::worlds::balanced::{BalancedTree, Branch};
use wayfinder_harness::worlds::explicit::Waypoint;
use wayfinder_search::{
    BestFirstSearch, EngineState, Evaluation, EvaluationContext, EvaluationError, FnEvaluator,
    NodePath, NodeStatus, PruneReason, SearchEvent,
};

#[test]
fn cancel_before_start_yields_no_solutions() {
    let tree = BalancedTree::new(2, 3, 1);
    let mut search = BestFirstSearch::new(tree.clone(), AStar::new(tree));
    search.cancel();
    search.cancel();

    assert_eq!(search.state(), EngineState::Inactive);
    assert!(search.was_canceled());
    assert!(search.next_solution().unwrap().is_none());
    assert!(search.tree().is_empty());
}

#[test]
fn cancel_from_an_observer_stops_after_the_current_step() {
    let tree = BalancedTree::new(3, 3, 2);
    let mut search = BestFirstSearch::new(tree.clone(), AStar::new(tree));
    let handle = search.cancel_handle();
    search.register_observer(move |event: &SearchEvent<Branch, u32, u64>| {
        if matches!(event, SearchEvent::SolutionFound(_)) {
            handle.cancel();
        }
    });

    assert!(search.next_solution().unwrap().is_some());
    assert!(search.next_solution().unwrap().is_none());
    assert!(search.next_solution().unwrap().is_none());
    assert!(search.was_canceled());
    assert_eq!(search.termination(), None);
    assert_eq!(search.stats().solutions_found, 1);
}

#[test]
fn cancel_from_another_thread_never_hangs() {
    let tree = BalancedTree::new(4, 6, 3);
    let mut search = BestFirstSearch::new(tree.clone(), AStar::new(tree));
    search.set_parallelism(4).unwrap();
    let handle = search.cancel_handle();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        handle.cancel();
    });
    let started = Instant::now();
    let found = search.solutions().count();
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(search.was_canceled() || found as u64 == 4u64.pow(6));
    assert_eq!(search.state(), EngineState::Inactive);
}

#[test]
fn cancel_with_three_evaluations_in_flight() {
    let graph = star(3);
    let evaluator: FnEvaluator<_, u64> =
        FnEvaluator::new(|path: &NodePath<Waypoint, u32>, ctx: &EvaluationContext| {
            if path.len() > 1 {
                nap(ctx, Duration::from_secs(5))?;
            }
            Ok::<_, EvaluationError>(Evaluation::Score(path.head().state().cost))
        });
    let mut search = BestFirstSearch::new(graph, evaluator);
    search.set_parallelism(3).unwrap();
    let tally = Tally::new();
    search.register_observer(tally.clone());
    let handle = search.cancel_handle();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.cancel();
    });
    let started = Instant::now();
    assert!(search.next_solution().unwrap().is_none());
    canceller.join().unwrap();

    // One drain cycle, not the 5 s the evaluations would take.
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(search.state(), EngineState::Inactive);
    assert!(search.was_canceled());
    assert!(tally.canceled());

    let pruned = tally.pruned();
    assert_eq!(pruned.len(), 3);
    assert!(pruned.values().all(|r| *r == PruneReason::Canceled));
    assert!(search.frontier_snapshot().is_empty());

    // Every child is accounted for exactly once.
    let children: BTreeSet<_> = search
        .tree()
        .iter()
        .filter(|r| r.node().parent().is_some())
        .map(|r| r.node().id())
        .collect();
    assert_eq!(children, pruned.keys().copied().collect::<BTreeSet<_>>());
    for record in search.tree().iter().filter(|r| r.node().parent().is_some()) {
        assert_eq!(*record.status(), NodeStatus::Pruned(PruneReason::Canceled));
    }
}

#[test]
fn canceled_frontier_holds_no_duplicates() {
    let tree = BalancedTree::new(5, 4, 4);
    let mut search = BestFirstSearch::new(tree, PathCost);
    search.set_parallelism(4).unwrap();
    for _ in 0..20 {
        search.step().unwrap();
    }
    search.cancel();

    let snapshot = search.frontier_snapshot();
    let unique: BTreeSet<_> = snapshot.iter().map(|e| e.node).collect();
    assert_eq!(unique.len(), snapshot.len());
    for entry in &snapshot {
        let record = search.tree().get(entry.node).unwrap();
        assert_eq!(*record.status(), NodeStatus::Open);
        assert_eq!(record.score(), Some(&entry.score));
    }
}
