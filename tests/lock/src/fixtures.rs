//! Shared fixtures: small named graphs, a ring-shaped grid and an event
//! tally observer.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use wayfinder_harness::worlds::explicit::{ExplicitGraph, Waypoint};
use wayfinder_search::{
    EvaluationContext, EvaluationError, NodeId, Observer, PruneReason, SearchEvent, Solution,
    TerminationReason,
};

/// Eight open cells around a wall. Going east first costs 5, going south
/// first costs 6.
pub const RING: &str = "
    S.2
    .#.
    3.G
";

/// `R` with children `A` (cost 5) and `B` (cost 3, goal).
#[must_use]
pub fn lower_goal_sibling() -> ExplicitGraph {
    ExplicitGraph::builder("lower-goal-sibling")
        .root("R")
        .edge("R", "A", 5)
        .edge("R", "B", 3)
        .goal("B")
        .build()
}

/// `R` with children `A` and `C`, each leading to its own goal.
#[must_use]
pub fn two_routes() -> ExplicitGraph {
    ExplicitGraph::builder("two-routes")
        .root("R")
        .edge("R", "A", 1)
        .edge("R", "C", 1)
        .edge("A", "GA", 4)
        .edge("C", "GC", 1)
        .goal("GA")
        .goal("GC")
        .build()
}

/// `R` with `fanout` children, none of them goals.
#[must_use]
pub fn star(fanout: u32) -> ExplicitGraph {
    (0..fanout)
        .fold(ExplicitGraph::builder("star").root("R"), |b, i| {
            b.edge("R", &format!("L{i}"), 1)
        })
        .build()
}

/// Node names along a solution path.
#[must_use]
pub fn names<V>(graph: &ExplicitGraph, solution: &Solution<Waypoint, u32, V>) -> Vec<String> {
    graph.names(solution.path.states())
}

/// Sleep for `total` in short naps, giving up as soon as `ctx` is
/// interrupted.
///
/// # Errors
///
/// [`EvaluationError::Interrupted`] once the scheduler abandons the task.
pub fn nap(ctx: &EvaluationContext, total: Duration) -> Result<(), EvaluationError> {
    let until = Instant::now() + total;
    while Instant::now() < until {
        ctx.check()?;
        std::thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Counts {
    reached: u64,
    scored: u64,
    expanded: Vec<NodeId>,
    pruned: BTreeMap<NodeId, PruneReason>,
    solutions: u64,
    finished: Option<TerminationReason>,
    canceled: bool,
}

/// Observer that keeps per-kind counts and the pruned and expanded node sets.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    counts: Arc<Mutex<Counts>>,
}

impl Tally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reached(&self) -> u64 {
        self.counts.lock().reached
    }

    #[must_use]
    pub fn scored(&self) -> u64 {
        self.counts.lock().scored
    }

    #[must_use]
    pub fn expanded(&self) -> Vec<NodeId> {
        self.counts.lock().expanded.clone()
    }

    #[must_use]
    pub fn pruned(&self) -> BTreeMap<NodeId, PruneReason> {
        self.counts.lock().pruned.clone()
    }

    #[must_use]
    pub fn solutions(&self) -> u64 {
        self.counts.lock().solutions
    }

    #[must_use]
    pub fn finished(&self) -> Option<TerminationReason> {
        self.counts.lock().finished
    }

    #[must_use]
    pub fn canceled(&self) -> bool {
        self.counts.lock().canceled
    }
}

impl<S, A, V> Observer<SearchEvent<S, A, V>> for Tally {
    fn on_event(&mut self, event: &SearchEvent<S, A, V>) {
        let mut counts = self.counts.lock();
        match event {
            SearchEvent::Initialized { .. } => {}
            SearchEvent::NodeReached { .. } => counts.reached += 1,
            SearchEvent::NodeScored { .. } => counts.scored += 1,
            SearchEvent::NodePruned { node, reason } => {
                counts.pruned.insert(*node, reason.clone());
            }
            SearchEvent::NodeExpanded { node, .. } => counts.expanded.push(*node),
            SearchEvent::SolutionFound(_) => counts.solutions += 1,
            SearchEvent::Finished(reason) => counts.finished = Some(*reason),
            SearchEvent::Canceled => counts.canceled = true,
        }
    }
}
