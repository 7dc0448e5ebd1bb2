//! Typed search errors.
//!
//! `SearchError` is the only error surfaced by the engines. Evaluator failures,
//! evaluator timeouts and worker crashes never reach the caller: they are
//! converted into a [`PruneReason`] and reported to observers only.

use std::time::Duration;

/// Which graph-generator callback broke its contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorStage {
    /// `GraphGenerator::roots()` failed or panicked.
    Roots,
    /// `GraphGenerator::successors()` failed or panicked.
    Successors,
    /// `GraphGenerator::is_goal_path()` panicked.
    GoalTest,
}

impl std::fmt::Display for GeneratorStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Roots => f.write_str("root generation"),
            Self::Successors => f.write_str("successor generation"),
            Self::GoalTest => f.write_str("goal test"),
        }
    }
}

/// Failure surfaced by the best-first and MCTS engines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// A policy or config value is out of range.
    #[error("invalid search policy: {detail}")]
    InvalidPolicy { detail: String },

    /// A policy document could not be parsed.
    #[error("could not parse search policy: {detail}")]
    PolicyParse { detail: String },

    /// A setting that is only accepted in the `Created` state was changed later.
    #[error("the search has already left the Created state")]
    AlreadyStarted,

    /// The graph generator failed in a way the engine cannot recover from.
    /// The engine is `Inactive` afterwards.
    #[error("graph generator contract violated during {stage}: {detail}")]
    GeneratorContractViolation {
        stage: GeneratorStage,
        detail: String,
    },

    /// The operating system refused to start a scheduler worker thread.
    #[error("could not start scheduler worker: {detail}")]
    WorkerSpawn { detail: String },
}

/// Error returned by a [`crate::contract::GraphGenerator`] callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct GeneratorError {
    pub message: String,
}

impl GeneratorError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error returned by a node or playout evaluator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    /// Domain failure inside the evaluator.
    #[error("evaluation failed: {0}")]
    Failed(String),
    /// The evaluator observed its interrupt flag and gave up.
    #[error("evaluation interrupted")]
    Interrupted,
}

/// Why a node was discarded without entering the frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneReason {
    /// The evaluator returned an error.
    EvaluatorFailed(String),
    /// The evaluator exceeded the per-node wall-clock budget.
    TimedOut { budget: Duration },
    /// The evaluator returned [`crate::scorer::Evaluation::NoOpinion`].
    NoOpinion,
    /// The worker running the evaluation crashed (panic outside domain logic).
    WorkerFailure(String),
    /// The node is deeper than `SearchPolicy::max_depth`.
    DepthLimit,
    /// The search was canceled while the evaluation was in flight.
    Canceled,
}

impl std::fmt::Display for PruneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EvaluatorFailed(detail) => write!(f, "evaluator failed: {detail}"),
            Self::TimedOut { budget } => {
                write!(f, "evaluation exceeded {}ms budget", budget.as_millis())
            }
            Self::NoOpinion => f.write_str("evaluator had no opinion"),
            Self::WorkerFailure(detail) => write!(f, "worker failure: {detail}"),
            Self::DepthLimit => f.write_str("depth limit exceeded"),
            Self::Canceled => f.write_str("search canceled"),
        }
    }
}

/// Render a caught panic payload for diagnostics.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
