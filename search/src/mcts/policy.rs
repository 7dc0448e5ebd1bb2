//! Tree policy, default (rollout) policy and playout evaluator contracts.

use std::fmt::Debug;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::tree::RewardStats;
use crate::contract::Expansion;
use crate::error::EvaluationError;
use crate::node::NodePath;

/// Selects which explored child to descend into during the tree phase.
///
/// Only called when every successor of the parent is already in the tree.
pub trait TreePolicy: Send + Sync {
    /// Index into `children`, or `None` if `children` is empty.
    fn select(&self, parent_visits: u64, children: &[RewardStats]) -> Option<usize>;
}

/// UCB1: unvisited children first, then `mean + c * sqrt(ln N / n)`.
/// Ties go to the earliest child.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ucb1 {
    pub exploration: f64,
}

impl Ucb1 {
    #[must_use]
    pub fn new(exploration: f64) -> Self {
        Self { exploration }
    }

    /// UCB1 value of a visited child under a parent with `parent_visits`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value(&self, parent_visits: u64, child: &RewardStats) -> f64 {
        if child.visits() == 0 {
            return f64::INFINITY;
        }
        let n = child.visits() as f64;
        let ln_parent = (parent_visits.max(1) as f64).ln();
        child.mean() + self.exploration * (ln_parent / n).sqrt()
    }
}

impl Default for Ucb1 {
    fn default() -> Self {
        Self::new(std::f64::consts::SQRT_2)
    }
}

impl TreePolicy for Ucb1 {
    fn select(&self, parent_visits: u64, children: &[RewardStats]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, child) in children.iter().enumerate() {
            let value = self.value(parent_visits, child);
            if best.is_none_or(|(_, b)| value > b) {
                best = Some((i, value));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Chooses the next step of a rollout among a state's successors.
pub trait DefaultPolicy<S, A>: Send + Sync {
    /// Index into `options` (never empty).
    fn choose(&self, state: &S, options: &[Expansion<S, A>], rng: &mut StdRng) -> usize;
}

/// Uniformly random rollouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRandomPolicy;

impl<S, A> DefaultPolicy<S, A> for UniformRandomPolicy {
    fn choose(&self, _state: &S, options: &[Expansion<S, A>], rng: &mut StdRng) -> usize {
        rng.random_range(0..options.len())
    }
}

/// Evaluator-guided rollouts: always take the successor with the highest
/// `value`, breaking ties at random.
pub struct GreedyPolicy<F> {
    value: F,
}

impl<F> GreedyPolicy<F> {
    pub fn new(value: F) -> Self {
        Self { value }
    }
}

impl<F> Debug for GreedyPolicy<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GreedyPolicy").finish_non_exhaustive()
    }
}

impl<S, A, F> DefaultPolicy<S, A> for GreedyPolicy<F>
where
    F: Fn(&S, &Expansion<S, A>) -> f64 + Send + Sync,
{
    fn choose(&self, state: &S, options: &[Expansion<S, A>], rng: &mut StdRng) -> usize {
        let values: Vec<f64> = options.iter().map(|o| (self.value)(state, o)).collect();
        let best = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ties: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v >= best)
            .map(|(i, _)| i)
            .collect();
        match ties.len() {
            0 => rng.random_range(0..options.len()),
            1 => ties[0],
            n => ties[rng.random_range(0..n)],
        }
    }
}

/// How a playout ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayoutEnd {
    /// The goal test accepted the last state.
    Goal,
    /// The last state has no successors.
    DeadEnd,
    /// The rollout hit `max_rollout_depth`.
    DepthLimit,
    /// The default policy failed; the playout stops where it was.
    Aborted,
}

/// One complete playout: the tree path to the expanded leaf followed by the
/// rollout below it.
#[derive(Debug, Clone)]
pub struct Playout<S, A> {
    pub path: NodePath<S, A>,
    /// Number of path nodes that belong to the tree (root included).
    pub tree_len: usize,
    pub end: PlayoutEnd,
}

/// Scores a finished playout. Higher rewards are better.
///
/// Failures (an `Err`, a panic, or a non-finite reward) back up the
/// configured failure reward and are reported to observers.
pub trait PlayoutEvaluator<S, A>: Send + Sync + 'static {
    /// # Errors
    ///
    /// A domain failure; see the trait docs.
    fn evaluate(&self, playout: &Playout<S, A>) -> Result<f64, EvaluationError>;
}

impl<S, A, F> PlayoutEvaluator<S, A> for F
where
    F: Fn(&Playout<S, A>) -> Result<f64, EvaluationError> + Send + Sync + 'static,
{
    fn evaluate(&self, playout: &Playout<S, A>) -> Result<f64, EvaluationError> {
        self(playout)
    }
}
