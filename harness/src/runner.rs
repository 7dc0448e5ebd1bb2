//! One-call drivers: build an engine, attach a transcript, run it, and
//! package what came out.
//!
//! # Report digests
//!
//! `report_json()` is a canonical-JSON-safe summary (integers only; MCTS
//! means are fixed-point millionths). `report_digest()` hashes it under
//! [`DOMAIN_RUN_REPORT`], so two runs of the same world under the same
//! single-worker policy have the same digest.

use serde::Serialize;
use serde_json::{json, Value};
use wayfinder_search::mcts::{MctsReport, PlayoutEvaluator};
use wayfinder_search::{
    BestFirstSearch, GraphGenerator, MctsConfig, MctsSearch, NodeEvaluator, SearchError,
    SearchPolicy, SearchStats, Solution, TerminationReason,
};

use crate::canon::{canonical_json_bytes, micros, CanonError};
use crate::hash::{canonical_hash, ContentHash, DOMAIN_RUN_REPORT};
use crate::transcript::Transcript;

/// Failure of a harness run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Canon(#[from] CanonError),
}

// ---------------------------------------------------------------------------
// Best-first
// ---------------------------------------------------------------------------

/// Output of [`run_best_first`].
#[derive(Debug)]
pub struct BestFirstRun<S, A, V> {
    pub generator_id: String,
    pub policy: SearchPolicy,
    /// Solutions in the order they were found.
    pub solutions: Vec<Solution<S, A, V>>,
    pub stats: SearchStats,
    /// `None` when the run stopped at `max_solutions` or was canceled.
    pub termination: Option<TerminationReason>,
    pub transcript: Transcript,
}

impl<S: Serialize, A: Serialize, V: Serialize> BestFirstRun<S, A, V> {
    #[must_use]
    pub fn report_json(&self) -> Value {
        json!({
            "engine": "best_first",
            "generator": self.generator_id,
            "policy": self.policy,
            "stats": self.stats,
            "termination": self.termination,
            "solutions": self.solutions.iter().map(|s| json!({
                "actions": s.path.actions().collect::<Vec<_>>(),
                "score": s.score,
                "depth": s.path.len().saturating_sub(1),
            })).collect::<Vec<_>>(),
            "transcript_digest": self.transcript.digest().map(|d| d.to_string()),
        })
    }

    /// # Errors
    ///
    /// [`CanonError`] if a state, action or score serializes to a float.
    pub fn report_digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = canonical_json_bytes(&self.report_json())?;
        Ok(canonical_hash(DOMAIN_RUN_REPORT, &bytes))
    }
}

/// Pull up to `max_solutions` solutions from a fresh [`BestFirstSearch`].
///
/// # Errors
///
/// [`RunError::Search`] for an invalid policy, a generator contract
/// violation or a worker that could not be started.
pub fn run_best_first<G, E>(
    generator: G,
    evaluator: E,
    policy: SearchPolicy,
    max_solutions: usize,
) -> Result<BestFirstRun<G::State, G::Action, E::Score>, RunError>
where
    G: GraphGenerator,
    G::State: Serialize,
    G::Action: Serialize,
    E: NodeEvaluator<G::State, G::Action>,
    E::Score: Serialize,
{
    let generator_id = generator.generator_id().to_string();
    let mut search = BestFirstSearch::with_policy(generator, evaluator, policy)?;
    let transcript = Transcript::new();
    search.register_observer(transcript.clone());

    let _span = tracing::info_span!("best_first", generator = %generator_id).entered();
    let mut solutions = Vec::new();
    while solutions.len() < max_solutions {
        match search.next_solution()? {
            Some(solution) => solutions.push(solution),
            None => break,
        }
    }
    let stats = search.stats();
    tracing::info!(
        solutions = solutions.len(),
        expanded = stats.nodes_expanded,
        pruned = stats.nodes_pruned,
        "best-first run finished"
    );

    Ok(BestFirstRun {
        generator_id,
        policy: search.policy().clone(),
        solutions,
        stats,
        termination: search.termination(),
        transcript,
    })
}

// ---------------------------------------------------------------------------
// MCTS
// ---------------------------------------------------------------------------

/// Output of [`run_mcts`].
#[derive(Debug)]
pub struct MctsRun<A> {
    pub generator_id: String,
    pub config: MctsConfig,
    pub report: MctsReport<A>,
    pub transcript: Transcript,
}

impl<A: Serialize> MctsRun<A> {
    #[must_use]
    pub fn report_json(&self) -> Value {
        let report = &self.report;
        json!({
            "engine": "mcts",
            "generator": self.generator_id,
            "seed": self.config.seed,
            "iterations": report.iterations,
            "tree_size": report.tree_size,
            "root_visits": report.root_visits,
            "best_actions": report.best_actions,
            "best_mean_micros": report.best_mean.map(micros),
            "exhausted": report.exhausted,
            "failures": report.failures,
            "children": report.children.iter().map(|c| json!({
                "action": c.action,
                "visits": c.visits,
                "mean_micros": micros(c.mean),
                "exhausted": c.exhausted,
            })).collect::<Vec<_>>(),
            "transcript_digest": self.transcript.digest().map(|d| d.to_string()),
        })
    }

    /// # Errors
    ///
    /// [`CanonError`] if an action serializes to a float.
    pub fn report_digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = canonical_json_bytes(&self.report_json())?;
        Ok(canonical_hash(DOMAIN_RUN_REPORT, &bytes))
    }
}

/// Run one `config.iterations_per_call` batch of MCTS playouts.
///
/// # Errors
///
/// [`RunError::Search`] for an invalid config or a generator contract
/// violation.
pub fn run_mcts<G, P>(
    generator: G,
    evaluator: P,
    config: MctsConfig,
) -> Result<MctsRun<G::Action>, RunError>
where
    G: GraphGenerator,
    G::Action: Serialize,
    P: PlayoutEvaluator<G::State, G::Action>,
{
    let generator_id = generator.generator_id().to_string();
    let mut search = MctsSearch::with_config(generator, evaluator, config)?;
    let transcript = Transcript::new();
    search.register_observer(transcript.clone());

    let _span = tracing::info_span!("mcts", generator = %generator_id).entered();
    let report = search.run()?;
    tracing::info!(
        iterations = report.iterations,
        tree_size = report.tree_size,
        failures = report.failures,
        "mcts run finished"
    );

    Ok(MctsRun {
        generator_id,
        config: search.config().clone(),
        report,
        transcript,
    })
}
