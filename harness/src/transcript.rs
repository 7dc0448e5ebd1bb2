//! Event transcripts: every engine event as one canonical JSON line.
//!
//! A [`Transcript`] is an observer. Register a clone with an engine, run it,
//! then read the lines or their hash chain from the original. For a
//! single-worker best-first search or any MCTS run the transcript is a pure
//! function of the inputs, so two runs can be compared by digest alone.
//!
//! With several evaluation workers the order of `node_scored` and
//! `node_pruned` lines within one expansion follows completion order and is
//! not reproducible; solutions are.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use wayfinder_search::mcts::MctsEvent;
use wayfinder_search::{Observer, PruneReason, SearchEvent, Solution};

use crate::canon::{canonical_json_bytes, micros};
use crate::hash::{chain_digests, ContentHash};

/// Shared, append-only list of canonical event lines.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Lines recorded so far, in event order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .map(|l| String::from_utf8_lossy(l).into_owned())
            .collect()
    }

    /// Hash chain over the lines; see [`chain_digests`].
    #[must_use]
    pub fn chain(&self) -> Vec<ContentHash> {
        let lines = self.lines.lock();
        chain_digests(lines.iter().map(Vec::as_slice))
    }

    /// Digest of the whole transcript; `None` while empty.
    #[must_use]
    pub fn digest(&self) -> Option<ContentHash> {
        self.chain().pop()
    }

    /// Write the transcript as JSON Lines.
    ///
    /// # Errors
    ///
    /// Any I/O error from creating or writing `path`.
    pub fn write_jsonl(&self, path: &Path) -> std::io::Result<()> {
        let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
        for line in self.lines.lock().iter() {
            out.write_all(line)?;
            out.write_all(b"\n")?;
        }
        out.flush()
    }

    fn record(&self, value: &Value) {
        let line = canonical_json_bytes(value).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "event not canonicalizable; recording placeholder");
            br#"{"event":"unrenderable"}"#.to_vec()
        });
        self.lines.lock().push(line);
    }
}

impl<S, A, V> Observer<SearchEvent<S, A, V>> for Transcript
where
    S: Serialize,
    A: Serialize,
    V: Serialize,
{
    fn on_event(&mut self, event: &SearchEvent<S, A, V>) {
        self.record(&search_event_json(event));
    }
}

impl Observer<MctsEvent> for Transcript {
    fn on_event(&mut self, event: &MctsEvent) {
        self.record(&mcts_event_json(event));
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "unserializable": e.to_string() }))
}

/// JSON form of a best-first event.
pub fn search_event_json<S, A, V>(event: &SearchEvent<S, A, V>) -> Value
where
    S: Serialize,
    A: Serialize,
    V: Serialize,
{
    match event {
        SearchEvent::Initialized { roots } => json!({
            "event": "initialized",
            "roots": roots.iter().map(|r| r.as_u64()).collect::<Vec<_>>(),
        }),
        SearchEvent::NodeReached {
            node,
            parent,
            depth,
            kind,
            is_goal,
        } => json!({
            "event": "node_reached",
            "node": node.as_u64(),
            "parent": parent.map(|p| p.as_u64()),
            "depth": depth,
            "kind": to_json(kind),
            "goal": is_goal,
        }),
        SearchEvent::NodeScored { node, score } => json!({
            "event": "node_scored",
            "node": node.as_u64(),
            "score": to_json(score),
        }),
        SearchEvent::NodePruned { node, reason } => json!({
            "event": "node_pruned",
            "node": node.as_u64(),
            "reason": prune_reason_json(reason),
        }),
        SearchEvent::NodeExpanded { node, successors } => json!({
            "event": "node_expanded",
            "node": node.as_u64(),
            "successors": successors,
        }),
        SearchEvent::SolutionFound(solution) => {
            let mut line = json!({
                "event": "solution_found",
                "nodes": tree_node_ids(solution),
                "states": solution.path.states().map(to_json).collect::<Vec<_>>(),
                "actions": solution.path.actions().map(to_json).collect::<Vec<_>>(),
                "score": to_json(&solution.score),
            });
            if let (Some(reporter), Some(fields)) = (solution.reported_by, line.as_object_mut()) {
                fields.insert("reported_by".into(), json!(reporter.as_u64()));
            }
            line
        }
        SearchEvent::Finished(reason) => json!({
            "event": "finished",
            "reason": to_json(reason),
        }),
        SearchEvent::Canceled => json!({ "event": "canceled" }),
    }
}

/// Ids of the solution's nodes that belong to the traversal tree. A reported
/// path stops at its reporting node; the rest was never part of the tree.
fn tree_node_ids<S, A, V>(solution: &Solution<S, A, V>) -> Vec<u64> {
    let ids = solution.path.node_ids();
    let keep = solution
        .reported_by
        .and_then(|reporter| ids.iter().position(|id| *id == reporter))
        .map_or(ids.len(), |at| at + 1);
    ids[..keep].iter().map(|n| n.as_u64()).collect()
}

/// JSON form of an MCTS event. Rewards are fixed-point millionths.
#[must_use]
pub fn mcts_event_json(event: &MctsEvent) -> Value {
    match event {
        MctsEvent::Initialized { root_goal } => json!({
            "event": "mcts_initialized",
            "root_goal": root_goal,
        }),
        MctsEvent::PlayoutCompleted {
            playout,
            leaf,
            leaf_depth,
            rollout_steps,
            end,
            reward,
            failure,
        } => json!({
            "event": "playout_completed",
            "playout": playout,
            "leaf": leaf.as_u64(),
            "leaf_depth": leaf_depth,
            "rollout_steps": rollout_steps,
            "end": to_json(end),
            "reward_micros": micros(*reward),
            "failure": failure.as_ref().map(prune_reason_json),
        }),
        MctsEvent::NewBestGoal { playout, reward } => json!({
            "event": "new_best_goal",
            "playout": playout,
            "reward_micros": micros(*reward),
        }),
        MctsEvent::Finished(reason) => json!({
            "event": "finished",
            "reason": to_json(reason),
        }),
        MctsEvent::Canceled => json!({ "event": "canceled" }),
    }
}

/// `{"kind": ..., "detail"?: ..., "budget_ms"?: ...}`.
#[must_use]
pub fn prune_reason_json(reason: &PruneReason) -> Value {
    match reason {
        PruneReason::EvaluatorFailed(detail) => json!({ "kind": "evaluator_failed", "detail": detail }),
        PruneReason::TimedOut { budget } => json!({
            "kind": "timed_out",
            "budget_ms": u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
        }),
        PruneReason::NoOpinion => json!({ "kind": "no_opinion" }),
        PruneReason::WorkerFailure(detail) => json!({ "kind": "worker_failure", "detail": detail }),
        PruneReason::DepthLimit => json!({ "kind": "depth_limit" }),
        PruneReason::Canceled => json!({ "kind": "canceled" }),
    }
}
