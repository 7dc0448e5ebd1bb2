//! Node and playout evaluators for the example worlds.

use std::time::Duration;

use wayfinder_search::mcts::{Playout, PlayoutEnd, PlayoutEvaluator};
use wayfinder_search::{Evaluation, EvaluationContext, EvaluationError, NodeEvaluator, NodePath};

use crate::worlds::{Costed, Heuristic};

/// Uniform-cost search: score = cost so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathCost;

impl<S: Costed, A> NodeEvaluator<S, A> for PathCost {
    type Score = u64;

    fn evaluate(
        &self,
        path: &NodePath<S, A>,
        _ctx: &EvaluationContext,
    ) -> Result<Evaluation<u64>, EvaluationError> {
        Ok(Evaluation::Score(path.head().state().cost()))
    }
}

/// A*: score = cost so far + heuristic estimate.
#[derive(Debug, Clone)]
pub struct AStar<H> {
    heuristic: H,
}

impl<H> AStar<H> {
    pub fn new(heuristic: H) -> Self {
        Self { heuristic }
    }
}

impl<S: Costed, A, H: Heuristic<S>> NodeEvaluator<S, A> for AStar<H> {
    type Score = u64;

    fn evaluate(
        &self,
        path: &NodePath<S, A>,
        _ctx: &EvaluationContext,
    ) -> Result<Evaluation<u64>, EvaluationError> {
        let state = path.head().state();
        Ok(Evaluation::Score(state.cost().saturating_add(self.heuristic.estimate(state))))
    }
}

/// Wraps an evaluator with a fixed delay, standing in for an expensive
/// simulation. The delay is slept in short slices so interruption is seen
/// promptly.
#[derive(Debug, Clone)]
pub struct Delayed<E> {
    inner: E,
    delay: Duration,
}

impl<E> Delayed<E> {
    pub fn new(inner: E, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

const SLICE: Duration = Duration::from_millis(2);

impl<S, A, E: NodeEvaluator<S, A>> NodeEvaluator<S, A> for Delayed<E> {
    type Score = E::Score;

    fn evaluate(
        &self,
        path: &NodePath<S, A>,
        ctx: &EvaluationContext,
    ) -> Result<Evaluation<E::Score>, EvaluationError> {
        let mut left = self.delay;
        while !left.is_zero() {
            ctx.check()?;
            let nap = left.min(SLICE);
            std::thread::sleep(nap);
            left -= nap;
        }
        ctx.check()?;
        self.inner.evaluate(path, ctx)
    }
}

/// MCTS reward: `1 / (1 + cost)` for a playout that reached a goal, 0
/// otherwise. Cheaper goals earn more.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalReward;

impl<S: Costed, A> PlayoutEvaluator<S, A> for GoalReward {
    #[allow(clippy::cast_precision_loss)]
    fn evaluate(&self, playout: &Playout<S, A>) -> Result<f64, EvaluationError> {
        Ok(match playout.end {
            PlayoutEnd::Goal => 1.0 / (1.0 + playout.path.head().state().cost() as f64),
            PlayoutEnd::DeadEnd | PlayoutEnd::DepthLimit | PlayoutEnd::Aborted => 0.0,
        })
    }
}
