//! Example graphs for the engines.
//!
//! Every world's state carries the cost of the path that produced it, so
//! path-cost and A* evaluators need nothing but the head state.

pub mod balanced;
pub mod explicit;
pub mod grid;

use std::sync::Arc;

/// A state that knows the accumulated cost of reaching it.
pub trait Costed {
    fn cost(&self) -> u64;
}

/// Lower bound on the remaining cost from a state to the nearest goal.
///
/// A* with an admissible and consistent heuristic returns solutions in
/// nondecreasing cost order.
pub trait Heuristic<S>: Send + Sync + 'static {
    fn estimate(&self, state: &S) -> u64;
}

impl<S, H: Heuristic<S>> Heuristic<S> for Arc<H> {
    fn estimate(&self, state: &S) -> u64 {
        (**self).estimate(state)
    }
}

/// The zero heuristic: A* degenerates to uniform-cost search.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEstimate;

impl<S> Heuristic<S> for NoEstimate {
    fn estimate(&self, _state: &S) -> u64 {
        0
    }
}
