//! Runs the fixed best-first and MCTS workloads and prints their digests,
//! one `key=value` line each, for cross-process comparison.
//!
//! Usage: `search_fixture`

use wayfinder_harness::evaluators::{AStar, GoalReward};
use wayfinder_harness::runner::{run_best_first, run_mcts, RunError};
use wayfinder_harness::transcript::Transcript;
use wayfinder_harness::worlds::balanced::BalancedTree;
use wayfinder_search::{MctsConfig, SearchPolicy};

fn main() -> Result<(), RunError> {
    wayfinder_harness::logging::init_tracing();

    let tree = BalancedTree::new(3, 4, 2024);
    let evaluator = AStar::new(tree.clone());
    let best_first = run_best_first(tree.clone(), evaluator, SearchPolicy::default(), 10)?;
    println!("best_first_transcript={}", digest_or_empty(&best_first.transcript));
    println!("best_first_report={}", best_first.report_digest()?);
    println!("best_first_solutions={}", best_first.solutions.len());
    println!("best_first_expanded={}", best_first.stats.nodes_expanded);

    let config = MctsConfig {
        iterations_per_call: 200,
        seed: 2024,
        ..MctsConfig::default()
    };
    let mcts = run_mcts(tree, GoalReward, config)?;
    println!("mcts_transcript={}", digest_or_empty(&mcts.transcript));
    println!("mcts_report={}", mcts.report_digest()?);
    println!("mcts_tree_size={}", mcts.report.tree_size);
    Ok(())
}

fn digest_or_empty(transcript: &Transcript) -> String {
    transcript.digest().map(|d| d.to_string()).unwrap_or_default()
}
