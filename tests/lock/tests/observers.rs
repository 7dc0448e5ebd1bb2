//! Observers are fire-and-forget: a panicking observer changes nothing, and
//! a single-worker transcript is a pure function of the inputs.

use lock_tests::fixtures::Tally;
use wayfinder_harness::evaluators::{AStar, PathCost};
use wayfinder_harness::runner::run_best_first;
use wayfinder_harness::transcript::Transcript;
use wayfinder_harness::worlds::balanced::{BalancedTree, Branch};
use wayfinder_search::{BestFirstSearch, SearchEvent, SearchPolicy};

type Event = SearchEvent<Branch, u32, u64>;

fn solution_actions(search: &mut BestFirstSearch<BalancedTree, PathCost>) -> Vec<Vec<u32>> {
    search
        .solutions()
        .map(|s| s.unwrap().path.actions().copied().collect())
        .collect()
}

#[test]
fn panicking_observer_does_not_disturb_the_search() {
    let tree = BalancedTree::new(2, 3, 8);

    let mut quiet = BestFirstSearch::new(tree.clone(), PathCost);
    let expected = solution_actions(&mut quiet);

    let mut noisy = BestFirstSearch::new(tree.clone(), PathCost);
    noisy.register_observer(|event: &Event| {
        if matches!(event, SearchEvent::NodeScored { .. } | SearchEvent::SolutionFound(_)) {
            panic!("observer bug");
        }
    });
    let tally = Tally::new();
    noisy.register_observer(tally.clone());

    assert_eq!(solution_actions(&mut noisy), expected);
    assert_eq!(tally.solutions(), tree.leaf_count());
    assert_eq!(tally.scored(), noisy.stats().nodes_scored);
    assert_eq!(tally.reached(), noisy.stats().nodes_created);
    assert!(tally.finished().is_some());
}

#[test]
fn every_event_reaches_every_observer_in_order() {
    let tree = BalancedTree::new(2, 2, 1);
    let mut search = BestFirstSearch::new(tree.clone(), AStar::new(tree));
    let first = Transcript::new();
    let second = Transcript::new();
    search.register_observer(first.clone());
    search.register_observer(second.clone());
    while search.next_solution().unwrap().is_some() {}

    assert_eq!(first.lines(), second.lines());
    let lines = first.lines();
    assert!(lines[0].contains(r#""event":"node_reached""#));
    assert!(lines.iter().any(|l| l.starts_with(r#"{"event":"initialized""#)));
    let solutions = lines.iter().filter(|l| l.contains(r#""event":"solution_found""#));
    assert_eq!(solutions.count(), 4);
    assert_eq!(
        lines.last().map(String::as_str),
        Some(r#"{"event":"finished","reason":"frontier_exhausted"}"#)
    );
}

#[test]
fn sequential_transcripts_have_identical_digests() {
    let digest = || {
        let tree = BalancedTree::new(3, 3, 21);
        let run = run_best_first(tree.clone(), AStar::new(tree), SearchPolicy::default(), 100)
            .unwrap();
        (run.transcript.digest().unwrap(), run.report_digest().unwrap())
    };
    let (transcript, report) = digest();
    for _ in 0..4 {
        assert_eq!(digest(), (transcript.clone(), report.clone()));
    }
}

#[test]
fn transcript_digest_tracks_the_world() {
    let digest = |seed| {
        let tree = BalancedTree::new(3, 3, seed);
        run_best_first(tree.clone(), AStar::new(tree), SearchPolicy::default(), 1)
            .unwrap()
            .transcript
            .digest()
            .unwrap()
    };
    assert_ne!(digest(1), digest(2));
}
