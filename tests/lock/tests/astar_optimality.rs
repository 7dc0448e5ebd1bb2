//! A* optimality: with an admissible, consistent evaluator the first
//! solution is the cheapest and later solutions never get cheaper.

use lock_tests::fixtures::RING;
use wayfinder_harness::evaluators::AStar;
use wayfinder_harness::worlds::balanced::BalancedTree;
use wayfinder_harness::worlds::grid::{GridWorld, Move};
use wayfinder_search::{BestFirstSearch, TerminationReason};

fn first_costs(grid: &GridWorld, parallelism: usize, count: usize) -> Vec<u64> {
    let mut search = BestFirstSearch::new(grid.clone(), AStar::new(grid.clone()));
    search.set_parallelism(parallelism).unwrap();
    let mut costs = Vec::new();
    while costs.len() < count {
        match search.next_solution().unwrap() {
            Some(solution) => costs.push(solution.path.head().state().cost),
            None => break,
        }
    }
    costs
}

#[test]
fn first_grid_solution_matches_dijkstra() {
    let grid = GridWorld::parse("ring", RING).unwrap();
    let optimum = grid.reference_cost().unwrap();
    assert_eq!(optimum, 5);

    let mut search = BestFirstSearch::new(grid.clone(), AStar::new(grid.clone()));
    let first = search.next_solution().unwrap().unwrap();
    assert_eq!(first.score, optimum);
    assert_eq!(first.path.head().state().cost, optimum);
    let moves: Vec<Move> = first.path.actions().copied().collect();
    assert_eq!(moves, [Move::East, Move::East, Move::South, Move::South]);
}

#[test]
fn grid_solution_costs_never_decrease() {
    let grid = GridWorld::parse("ring", RING).unwrap();
    for k in [1, 4] {
        let costs = first_costs(&grid, k, 4);
        assert_eq!(costs.len(), 4, "k={k}");
        assert_eq!(costs[0], 5, "k={k}");
        assert_eq!(costs[1], 6, "k={k}");
        assert!(costs.windows(2).all(|w| w[0] <= w[1]), "k={k}: {costs:?}");
    }
}

#[test]
fn balanced_tree_solutions_come_out_in_cost_order() {
    let tree = BalancedTree::new(3, 4, 7);
    let mut search = BestFirstSearch::new(tree.clone(), AStar::new(tree.clone()));
    let scores: Vec<u64> = search
        .solutions()
        .map(|s| s.unwrap().score)
        .collect();

    assert_eq!(scores, tree.leaf_costs());
    assert_eq!(search.termination(), Some(TerminationReason::FrontierExhausted));
    assert_eq!(search.stats().solutions_found, tree.leaf_count());
}
