//! Node evaluator contract.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::EvaluationError;
use crate::node::NodePath;

/// Outcome of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation<V> {
    /// The node's priority label. Lower pops first.
    Score(V),
    /// The evaluator declines to rank the node. The node is pruned.
    NoOpinion,
}

/// Per-call context handed to an evaluator.
///
/// Long-running evaluators should poll [`Self::check`] (or
/// [`Self::is_interrupted`]) between units of work. The flag is raised when
/// the per-node budget runs out or the search is canceled; whatever the
/// evaluator returns afterwards is discarded.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    interrupt: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl EvaluationContext {
    pub(crate) fn new(interrupt: Arc<AtomicBool>, deadline: Option<Instant>) -> Self {
        Self {
            interrupt,
            deadline,
        }
    }

    /// A context that is never interrupted and has no deadline.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)), None)
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Acquire)
    }

    /// `Err(Interrupted)` once the evaluation has been abandoned.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::Interrupted`] if the interrupt flag is set.
    pub fn check(&self) -> Result<(), EvaluationError> {
        if self.is_interrupted() {
            Err(EvaluationError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Wall-clock instant after which the result will be ignored.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if one is set.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// Complete solutions an evaluator came across while scoring a node.
///
/// Evaluators that complete paths on their own (random completion, rollouts)
/// report the goal paths they reach here. Each reported path must extend the
/// path that was handed to the evaluator.
#[derive(Debug)]
pub struct SolutionReports<S, A, V> {
    found: Vec<(NodePath<S, A>, V)>,
}

impl<S, A, V> Default for SolutionReports<S, A, V> {
    fn default() -> Self {
        Self { found: Vec::new() }
    }
}

impl<S, A, V> SolutionReports<S, A, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, path: NodePath<S, A>, score: V) {
        self.found.push((path, score));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.found.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    pub(crate) fn into_inner(self) -> Vec<(NodePath<S, A>, V)> {
        self.found
    }
}

/// Scoring function used to prioritize the frontier.
///
/// Evaluators run on scheduler workers, possibly several at once, and may
/// block. Failure semantics:
/// - `Err(_)` or a panic prunes the node
/// - [`Evaluation::NoOpinion`] prunes the node
/// - exceeding the node-evaluation timeout prunes the node (unless a timeout
///   fallback evaluator supplies a score)
pub trait NodeEvaluator<S, A>: Send + Sync + 'static {
    type Score: Ord + Clone + Debug + Send + Sync + 'static;

    /// Score the head node of `path`.
    ///
    /// # Errors
    ///
    /// A domain failure. The node is pruned and the search continues.
    fn evaluate(
        &self,
        path: &NodePath<S, A>,
        ctx: &EvaluationContext,
    ) -> Result<Evaluation<Self::Score>, EvaluationError>;

    /// Score the head node of `path`, reporting any complete solution found
    /// on the way. The search calls this form.
    ///
    /// Reports are only kept when the node itself is scored in time. A node
    /// that is pruned takes its reports with it.
    ///
    /// # Errors
    ///
    /// As for [`Self::evaluate`].
    fn evaluate_reporting(
        &self,
        path: &NodePath<S, A>,
        ctx: &EvaluationContext,
        reports: &mut SolutionReports<S, A, Self::Score>,
    ) -> Result<Evaluation<Self::Score>, EvaluationError> {
        let _ = reports;
        self.evaluate(path, ctx)
    }
}

/// Scores every node 0. With FIFO tie-breaking the search runs breadth-first.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformEvaluator;

impl<S, A> NodeEvaluator<S, A> for UniformEvaluator {
    type Score = i64;

    fn evaluate(
        &self,
        _path: &NodePath<S, A>,
        _ctx: &EvaluationContext,
    ) -> Result<Evaluation<i64>, EvaluationError> {
        Ok(Evaluation::Score(0))
    }
}

/// Adapts a closure into a [`NodeEvaluator`].
pub struct FnEvaluator<F, V> {
    f: F,
    _score: PhantomData<fn() -> V>,
}

impl<F, V> FnEvaluator<F, V> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _score: PhantomData,
        }
    }
}

impl<F, V> Debug for FnEvaluator<F, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnEvaluator").finish_non_exhaustive()
    }
}

impl<S, A, F, V> NodeEvaluator<S, A> for FnEvaluator<F, V>
where
    F: Fn(&NodePath<S, A>, &EvaluationContext) -> Result<Evaluation<V>, EvaluationError>
        + Send
        + Sync
        + 'static,
    V: Ord + Clone + Debug + Send + Sync + 'static,
{
    type Score = V;

    fn evaluate(
        &self,
        path: &NodePath<S, A>,
        ctx: &EvaluationContext,
    ) -> Result<Evaluation<V>, EvaluationError> {
        (self.f)(path, ctx)
    }
}
