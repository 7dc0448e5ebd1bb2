//! Pruning: failed, slow and indifferent evaluations drop a node without
//! ever stopping the search, and a dropped node is never part of a solution.

use std::time::Duration;

use lock_tests::fixtures::{lower_goal_sibling, names, two_routes, Tally};
use wayfinder_harness::evaluators::PathCost;
use wayfinder_harness::worlds::balanced::{BalancedTree, Branch};
use wayfinder_harness::worlds::explicit::{ExplicitGraph, Waypoint};
use wayfinder_search::{
    BestFirstSearch, Evaluation, EvaluationContext, EvaluationError, FnEvaluator,
    GeneratorStage, NodeEvaluator, NodePath, NodeStatus, PruneReason, SearchError, SearchPolicy,
    TerminationReason,
};

#[test]
fn lower_scored_goal_wins_before_its_sibling_is_expanded() {
    let graph = lower_goal_sibling();
    let mut search = BestFirstSearch::new(graph.clone(), PathCost);
    let tally = Tally::new();
    search.register_observer(tally.clone());

    let first = search.next_solution().unwrap().unwrap();
    assert_eq!(names(&graph, &first), ["R", "B"]);
    assert_eq!(first.score, 3);

    // Only the root has been expanded; A sits on the frontier untouched.
    let a = graph.node("A").unwrap();
    let record = search
        .tree()
        .iter()
        .find(|r| r.node().state().node == a)
        .unwrap();
    assert_eq!(*record.status(), NodeStatus::Open);
    assert_eq!(tally.expanded().len(), 1);

    assert!(search.next_solution().unwrap().is_none());
    assert_eq!(search.termination(), Some(TerminationReason::FrontierExhausted));
    assert_eq!(search.stats().dead_ends, 1);
}

/// Scores by path cost, except that `slow` takes 50 ms and ignores
/// interruption.
fn stalls_on(slow: u32) -> impl NodeEvaluator<Waypoint, u32, Score = u64> {
    FnEvaluator::new(move |path: &NodePath<Waypoint, u32>, _: &EvaluationContext| {
        let head = path.head().state();
        if head.node == slow {
            std::thread::sleep(Duration::from_millis(50));
        }
        Ok::<_, EvaluationError>(Evaluation::Score(head.cost))
    })
}

#[test]
fn timed_out_node_never_appears_and_search_still_finishes() {
    let graph = two_routes();
    let c = graph.node("C").unwrap();
    for k in [1, 2] {
        let policy = SearchPolicy {
            parallelism: k,
            node_evaluation_timeout_ms: Some(10),
            ..SearchPolicy::default()
        };
        let mut search =
            BestFirstSearch::with_policy(graph.clone(), stalls_on(c), policy).unwrap();
        let tally = Tally::new();
        search.register_observer(tally.clone());

        let solutions: Vec<Vec<String>> = search
            .solutions()
            .map(|s| names(&graph, &s.unwrap()))
            .collect();

        assert_eq!(solutions, [["R", "A", "GA"]], "k={k}");
        assert_eq!(search.termination(), Some(TerminationReason::FrontierExhausted));
        assert_eq!(search.stats().pruned_timed_out, 1, "k={k}");
        let reasons: Vec<PruneReason> = tally.pruned().into_values().collect();
        assert_eq!(
            reasons,
            [PruneReason::TimedOut {
                budget: Duration::from_millis(10)
            }]
        );
    }
}

#[test]
fn timeout_fallback_keeps_the_slow_node() {
    let graph = two_routes();
    let c = graph.node("C").unwrap();
    let policy = SearchPolicy {
        node_evaluation_timeout_ms: Some(10),
        ..SearchPolicy::default()
    };
    let mut search = BestFirstSearch::with_policy(graph.clone(), stalls_on(c), policy).unwrap();
    search.set_timeout_evaluator(PathCost);

    let solutions: Vec<Vec<String>> = search
        .solutions()
        .map(|s| names(&graph, &s.unwrap()))
        .collect();
    assert_eq!(solutions, [["R", "C", "GC"], ["R", "A", "GA"]]);
    assert_eq!(search.stats().pruned_timed_out, 0);
}

fn dropped(id: u64) -> bool {
    id % 4 == 1 || id % 7 == 3
}

#[test]
fn pruned_nodes_never_appear_in_a_solution() {
    let tree = BalancedTree::new(3, 4, 5);
    for k in [1, 3] {
        let evaluator: FnEvaluator<_, u64> =
            FnEvaluator::new(|path: &NodePath<Branch, u32>, _: &EvaluationContext| {
                let head = path.head().state();
                match head.id {
                    id if id % 4 == 1 => Ok(Evaluation::NoOpinion),
                    id if id % 7 == 3 => {
                        Err(EvaluationError::Failed(format!("no model for {id}")))
                    }
                    _ => Ok(Evaluation::Score(head.cost)),
                }
            });
        let mut search = BestFirstSearch::new(tree.clone(), evaluator);
        search.set_parallelism(k).unwrap();
        let tally = Tally::new();
        search.register_observer(tally.clone());

        let solutions: Vec<_> = search.solutions().map(Result::unwrap).collect();
        let pruned = tally.pruned();

        assert!(!solutions.is_empty());
        assert!(!pruned.is_empty());
        for solution in &solutions {
            assert!(solution.path.node_ids().iter().all(|id| !pruned.contains_key(id)));
            assert!(solution.path.states().all(|b| !dropped(b.id)));
        }
        let stats = search.stats();
        assert_eq!(stats.nodes_pruned, pruned.len() as u64);
        assert_eq!(stats.pruned_no_opinion + stats.pruned_evaluator_failed, stats.nodes_pruned);
        assert!(tally.expanded().iter().all(|id| !pruned.contains_key(id)));
    }
}

#[test]
fn panicking_evaluator_prunes_only_its_node() {
    let graph = two_routes();
    let a = graph.node("A").unwrap();
    let evaluator: FnEvaluator<_, u64> =
        FnEvaluator::new(move |path: &NodePath<Waypoint, u32>, _: &EvaluationContext| {
            let head = path.head().state();
            assert_ne!(head.node, a, "evaluator crashed");
            Ok::<_, EvaluationError>(Evaluation::Score(head.cost))
        });
    let mut search = BestFirstSearch::new(graph.clone(), evaluator);
    search.set_parallelism(2).unwrap();

    let solutions: Vec<Vec<String>> = search
        .solutions()
        .map(|s| names(&graph, &s.unwrap()))
        .collect();
    assert_eq!(solutions, [["R", "C", "GC"]]);
    assert_eq!(search.stats().pruned_worker_failure, 1);
}

#[test]
fn generator_failure_is_surfaced_once() {
    let graph = ExplicitGraph::builder("broken")
        .root("R")
        .edge("R", "A", 1)
        .edge("R", "B", 2)
        .edge("B", "G", 1)
        .goal("G")
        .failing("A")
        .build();
    let mut search = BestFirstSearch::new(graph, PathCost);

    let err = search.next_solution().unwrap_err();
    assert!(matches!(
        err,
        SearchError::GeneratorContractViolation {
            stage: GeneratorStage::Successors,
            ..
        }
    ));
    assert!(search.next_solution().unwrap().is_none());
    assert_eq!(
        search.termination(),
        Some(TerminationReason::GeneratorContractViolation)
    );
    assert_eq!(search.error(), Some(&err));
}
