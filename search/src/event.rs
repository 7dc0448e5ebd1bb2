//! Search events and the observer registry.
//!
//! Every state change of an engine is pushed, synchronously and in order, to
//! the registered observers. Observers are fire-and-forget: a panicking
//! observer is logged and skipped, never propagated into the search.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::contract::NodeKind;
use crate::error::{panic_message, PruneReason};
use crate::node::{NodeId, NodePath};

/// Why a best-first search became inactive without being canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// No node left to expand. No further solution exists.
    FrontierExhausted,
    /// The global timeout elapsed.
    Timeout,
    /// `max_expansions` nodes have been expanded.
    ExpansionBudgetExhausted,
    /// The graph generator failed; the error was returned to the caller.
    GeneratorContractViolation,
}

/// A goal-reaching path and its score.
#[derive(Debug)]
pub struct Solution<S, A, V> {
    pub path: NodePath<S, A>,
    /// The head node's score, or the score the evaluator gave a reported path.
    pub score: V,
    /// The node whose evaluation reported this path; `None` for a goal node
    /// popped off the frontier. Nodes below it are not part of the
    /// traversal tree.
    pub reported_by: Option<NodeId>,
}

impl<S, A, V: Clone> Clone for Solution<S, A, V> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            score: self.score.clone(),
            reported_by: self.reported_by,
        }
    }
}

/// Event emitted by [`crate::search::BestFirstSearch`].
#[derive(Debug)]
pub enum SearchEvent<S, A, V> {
    /// Roots were materialized, scored and enqueued.
    Initialized { roots: Vec<NodeId> },
    /// A node was created (root or child). `is_goal` is the goal test verdict.
    NodeReached {
        node: NodeId,
        parent: Option<NodeId>,
        depth: u32,
        kind: NodeKind,
        is_goal: bool,
    },
    /// A node was scored and entered the frontier.
    NodeScored { node: NodeId, score: V },
    /// A node was discarded without entering the frontier.
    NodePruned { node: NodeId, reason: PruneReason },
    /// A popped node had its successors generated and evaluated.
    NodeExpanded { node: NodeId, successors: usize },
    /// A solution was handed to the caller: a popped goal node, or a path
    /// reported by the evaluator.
    SolutionFound(Solution<S, A, V>),
    /// The engine became inactive on its own.
    Finished(TerminationReason),
    /// The engine became inactive because it was canceled.
    Canceled,
}

/// Receiver of engine events.
///
/// Any `FnMut(&E) + Send` closure is an observer.
pub trait Observer<E>: Send {
    fn on_event(&mut self, event: &E);
}

impl<E, F> Observer<E> for F
where
    F: FnMut(&E) + Send,
{
    fn on_event(&mut self, event: &E) {
        self(event);
    }
}

/// Ordered list of observers with a catch-and-log boundary around each call.
pub struct ObserverRegistry<E> {
    observers: Vec<Box<dyn Observer<E>>>,
    failures: u64,
}

impl<E> Default for ObserverRegistry<E> {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
            failures: 0,
        }
    }
}

impl<E> std::fmt::Debug for ObserverRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .field("failures", &self.failures)
            .finish()
    }
}

impl<E> ObserverRegistry<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: impl Observer<E> + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Deliver `event` to every observer in registration order.
    pub fn dispatch(&mut self, event: &E) {
        for (index, observer) in self.observers.iter_mut().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_event(event)));
            if let Err(payload) = outcome {
                self.failures += 1;
                tracing::warn!(
                    observer = index,
                    panic = %panic_message(payload.as_ref()),
                    "observer panicked; event dropped for this observer"
                );
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Number of observer calls that panicked.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }
}
