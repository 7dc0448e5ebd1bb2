//! Best-first search engine.
//!
//! [`BestFirstSearch`] is a resumable state machine
//! (`Created → Active → Inactive`). It can be driven one step at a time with
//! [`BestFirstSearch::step`], or run to the next solution with
//! [`BestFirstSearch::next_solution`]. Finding a solution never terminates
//! the engine; the caller decides when to stop pulling.
//!
//! Solutions come from two places: goal nodes popped off the frontier, and
//! complete paths an evaluator reports while scoring a node (see
//! [`NodeEvaluator::evaluate_reporting`]). Reported solutions are queued and
//! handed out before the next node is popped.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cancel::CancelHandle;
use crate::contract::GraphGenerator;
use crate::error::{panic_message, GeneratorStage, PruneReason, SearchError};
use crate::event::{Observer, ObserverRegistry, SearchEvent, Solution, TerminationReason};
use crate::frontier::{FrontierEntry, SharedFrontier};
use crate::node::{NodeId, NodePath, NodeStatus, TraversalTree};
use crate::policy::{duration_to_millis, SearchPolicy};
use crate::scheduler::{BatchReport, EvalOutcome, EvalRequest, Scheduler};
use crate::scorer::NodeEvaluator;

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Configurable; nothing generated yet.
    Created,
    /// Roots materialized; steps pop and expand nodes.
    Active,
    /// Finished, canceled, or stopped by a generator failure. Permanent.
    Inactive,
}

/// What a single [`BestFirstSearch::step`] did.
#[derive(Debug)]
pub enum StepOutcome<S, A, V> {
    /// The engine left `Created`: roots were generated, scored and enqueued.
    Initialized { roots: usize },
    /// A non-goal node was expanded.
    Expanded { node: NodeId, successors: usize },
    /// A goal node was popped, or a reported solution was handed out.
    Solution(Solution<S, A, V>),
    /// The engine stopped on its own during this step.
    Finished(TerminationReason),
    /// The engine observed cancellation during this step.
    Canceled,
    /// The engine was already inactive. Nothing happened.
    Inactive,
}

/// Counters maintained over the lifetime of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub nodes_created: u64,
    pub nodes_expanded: u64,
    pub nodes_scored: u64,
    pub nodes_pruned: u64,
    pub pruned_evaluator_failed: u64,
    pub pruned_timed_out: u64,
    pub pruned_no_opinion: u64,
    pub pruned_worker_failure: u64,
    pub pruned_depth_limit: u64,
    pub pruned_canceled: u64,
    pub dead_ends: u64,
    pub solutions_found: u64,
    pub frontier_high_water: u64,
    /// Results of abandoned evaluations that arrived after their deadline.
    /// Keeps counting after the engine becomes inactive.
    pub late_results: u64,
    /// Solutions reported by the evaluator and accepted into the queue.
    pub solutions_reported: u64,
}

impl SearchStats {
    fn record_prune(&mut self, reason: &PruneReason) {
        self.nodes_pruned += 1;
        let counter = match reason {
            PruneReason::EvaluatorFailed(_) => &mut self.pruned_evaluator_failed,
            PruneReason::TimedOut { .. } => &mut self.pruned_timed_out,
            PruneReason::NoOpinion => &mut self.pruned_no_opinion,
            PruneReason::WorkerFailure(_) => &mut self.pruned_worker_failure,
            PruneReason::DepthLimit => &mut self.pruned_depth_limit,
            PruneReason::Canceled => &mut self.pruned_canceled,
        };
        *counter += 1;
    }
}

type Event<G, E> = SearchEvent<
    <G as GraphGenerator>::State,
    <G as GraphGenerator>::Action,
    <E as NodeEvaluator<<G as GraphGenerator>::State, <G as GraphGenerator>::Action>>::Score,
>;

type FallbackEvaluator<G, E> = dyn NodeEvaluator<
    <G as GraphGenerator>::State,
    <G as GraphGenerator>::Action,
    Score = <E as NodeEvaluator<<G as GraphGenerator>::State, <G as GraphGenerator>::Action>>::Score,
>;

/// Online best-first (A*-style) search over a lazily generated graph.
///
/// Nodes are scored by `E`; the lowest score is expanded first. A goal node
/// is reported as a solution when it is popped, so with an admissible and
/// consistent evaluator the first solution is optimal.
///
/// The search is a tree search. A state reached through two different
/// parents becomes two nodes and may be expanded twice.
pub struct BestFirstSearch<G, E>
where
    G: GraphGenerator,
    E: NodeEvaluator<G::State, G::Action>,
{
    generator: G,
    evaluator: Arc<E>,
    timeout_evaluator: Option<Box<FallbackEvaluator<G, E>>>,
    policy: SearchPolicy,
    state: EngineState,
    tree: TraversalTree<G::State, G::Action, E::Score>,
    frontier: SharedFrontier<E::Score>,
    scheduler: Option<Scheduler<G::State, G::Action, E>>,
    observers: ObserverRegistry<Event<G, E>>,
    cancel: CancelHandle,
    stats: SearchStats,
    late_results: Arc<AtomicU64>,
    reported: VecDeque<Solution<G::State, G::Action, E::Score>>,
    started_at: Option<Instant>,
    termination: Option<TerminationReason>,
    canceled: bool,
    error: Option<SearchError>,
}

impl<G, E> std::fmt::Debug for BestFirstSearch<G, E>
where
    G: GraphGenerator,
    E: NodeEvaluator<G::State, G::Action>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestFirstSearch")
            .field("generator", &self.generator.generator_id())
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<G, E> BestFirstSearch<G, E>
where
    G: GraphGenerator,
    E: NodeEvaluator<G::State, G::Action>,
{
    /// A search with the default (sequential, unbounded) policy.
    pub fn new(generator: G, evaluator: E) -> Self {
        Self {
            generator,
            evaluator: Arc::new(evaluator),
            timeout_evaluator: None,
            policy: SearchPolicy::default(),
            state: EngineState::Created,
            tree: TraversalTree::new(),
            frontier: SharedFrontier::new(),
            scheduler: None,
            observers: ObserverRegistry::new(),
            cancel: CancelHandle::new(),
            stats: SearchStats::default(),
            late_results: Arc::new(AtomicU64::new(0)),
            reported: VecDeque::new(),
            started_at: None,
            termination: None,
            canceled: false,
            error: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] if `policy` fails validation.
    pub fn with_policy(generator: G, evaluator: E, policy: SearchPolicy) -> Result<Self, SearchError> {
        policy.validate()?;
        let mut search = Self::new(generator, evaluator);
        search.policy = policy;
        Ok(search)
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Set the scheduler worker count.
    ///
    /// # Errors
    ///
    /// [`SearchError::AlreadyStarted`] once the engine has left `Created`;
    /// [`SearchError::InvalidPolicy`] for `k == 0`.
    pub fn set_parallelism(&mut self, k: usize) -> Result<(), SearchError> {
        self.ensure_created()?;
        if k == 0 {
            return Err(SearchError::InvalidPolicy {
                detail: "parallelism must be at least 1".into(),
            });
        }
        self.policy.parallelism = k;
        Ok(())
    }

    /// Set (or clear) the per-node evaluation budget. Applies to evaluations
    /// dispatched from now on, also while the engine is active.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvalidPolicy`] for a zero budget. The previous budget
    /// stays in force.
    pub fn set_node_evaluation_timeout(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<(), SearchError> {
        self.policy.node_evaluation_timeout_ms = timeout
            .map(|t| duration_to_millis(t, "node_evaluation_timeout_ms"))
            .transpose()?;
        if let Some(scheduler) = &mut self.scheduler {
            scheduler.set_timeout(self.policy.node_evaluation_timeout());
        }
        Ok(())
    }

    /// Set (or clear) the global timeout checked at the top of every step.
    /// Measured from activation.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvalidPolicy`] for a zero timeout.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), SearchError> {
        self.policy.timeout_ms = timeout
            .map(|t| duration_to_millis(t, "timeout_ms"))
            .transpose()?;
        Ok(())
    }

    /// Evaluator consulted when the primary evaluator times out on a node.
    /// It runs on the control thread and should be cheap.
    pub fn set_timeout_evaluator(
        &mut self,
        evaluator: impl NodeEvaluator<G::State, G::Action, Score = E::Score>,
    ) {
        self.timeout_evaluator = Some(Box::new(evaluator));
    }

    pub fn register_observer(&mut self, observer: impl Observer<Event<G, E>> + 'static) {
        self.observers.register(observer);
    }

    /// A handle that cancels this search from any thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel the search. Idempotent.
    ///
    /// Returns with the engine `Inactive`. Calls from other threads go through
    /// [`Self::cancel_handle`] and take effect at the next step or within one
    /// scheduler drain cycle.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if self.state != EngineState::Inactive {
            self.finish_canceled();
        }
    }

    fn ensure_created(&self) -> Result<(), SearchError> {
        if self.state == EngineState::Created {
            Ok(())
        } else {
            Err(SearchError::AlreadyStarted)
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    #[must_use]
    pub fn policy(&self) -> &SearchPolicy {
        &self.policy
    }

    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    #[must_use]
    pub fn stats(&self) -> SearchStats {
        let mut stats = self.stats.clone();
        stats.frontier_high_water = self.frontier.high_water();
        stats.late_results = self.late_results.load(Ordering::Relaxed);
        stats
    }

    /// Every node created so far.
    #[must_use]
    pub fn tree(&self) -> &TraversalTree<G::State, G::Action, E::Score> {
        &self.tree
    }

    /// Current frontier contents, in pop order.
    #[must_use]
    pub fn frontier_snapshot(&self) -> Vec<FrontierEntry<E::Score>> {
        self.frontier.snapshot()
    }

    /// Why the engine stopped, unless it is still running or was canceled.
    #[must_use]
    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    #[must_use]
    pub fn was_canceled(&self) -> bool {
        self.canceled
    }

    /// The generator failure that stopped the engine, if any.
    #[must_use]
    pub fn error(&self) -> Option<&SearchError> {
        self.error.as_ref()
    }

    // ------------------------------------------------------------------
    // Driving
    // ------------------------------------------------------------------

    /// Run until the next solution.
    ///
    /// Returns `Ok(None)` once the engine is inactive, and on every call
    /// after that.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::GeneratorContractViolation`] (once) if the
    /// graph generator fails, and [`SearchError::WorkerSpawn`] if the
    /// scheduler cannot start.
    pub fn next_solution(
        &mut self,
    ) -> Result<Option<Solution<G::State, G::Action, E::Score>>, SearchError> {
        loop {
            match self.step()? {
                StepOutcome::Solution(solution) => return Ok(Some(solution)),
                StepOutcome::Finished(_) | StepOutcome::Canceled | StepOutcome::Inactive => {
                    return Ok(None)
                }
                StepOutcome::Initialized { .. } | StepOutcome::Expanded { .. } => {}
            }
        }
    }

    /// Pull solutions until the best one seen so far scores no worse than
    /// anything still open, and return that best one.
    ///
    /// "Open" covers the frontier head and reported solutions not yet handed
    /// out. With an admissible evaluator the result is optimal among all
    /// solutions. Solutions pulled on the way are consumed. Returns `Ok(None)`
    /// if the engine is exhausted before yielding any solution.
    ///
    /// # Errors
    ///
    /// See [`Self::next_solution`].
    pub fn next_solution_dominating_open(
        &mut self,
    ) -> Result<Option<Solution<G::State, G::Action, E::Score>>, SearchError> {
        let mut best: Option<Solution<G::State, G::Action, E::Score>> = None;
        while let Some(solution) = self.next_solution()? {
            match &best {
                Some(incumbent) if incumbent.score <= solution.score => {}
                _ => best = Some(solution),
            }
            let Some(incumbent) = &best else {
                continue;
            };
            if !self.open_beats(&incumbent.score) {
                break;
            }
        }
        Ok(best)
    }

    /// Whether something still open scores strictly better than `score`.
    fn open_beats(&self, score: &E::Score) -> bool {
        let frontier_head_better = self
            .frontier
            .with(|f| f.peek().is_some_and(|(_, head)| head < score));
        frontier_head_better || self.reported.iter().any(|r| r.score < *score)
    }

    /// Iterate over the remaining solutions.
    pub fn solutions(&mut self) -> Solutions<'_, G, E> {
        Solutions {
            search: self,
            done: false,
        }
    }

    /// Advance the engine by one step.
    ///
    /// In `Created` the step activates the engine. In `Active` it pops one
    /// node and either reports it as a solution or expands it.
    ///
    /// # Errors
    ///
    /// See [`Self::next_solution`].
    pub fn step(
        &mut self,
    ) -> Result<StepOutcome<G::State, G::Action, E::Score>, SearchError> {
        match self.state {
            EngineState::Inactive => Ok(StepOutcome::Inactive),
            EngineState::Created => self.activate(),
            EngineState::Active => self.advance(),
        }
    }

    fn activate(
        &mut self,
    ) -> Result<StepOutcome<G::State, G::Action, E::Score>, SearchError> {
        if self.cancel.is_canceled() {
            self.finish_canceled();
            return Ok(StepOutcome::Canceled);
        }
        self.state = EngineState::Active;
        self.started_at = Some(Instant::now());
        tracing::info!(
            generator = self.generator.generator_id(),
            parallelism = self.policy.parallelism,
            "best-first search activated"
        );

        let scheduler = match Scheduler::new(
            self.policy.parallelism,
            self.policy.node_evaluation_timeout(),
            self.policy.cancel_poll_interval(),
            Arc::clone(&self.evaluator),
            self.frontier.clone(),
            Arc::clone(&self.late_results),
        ) {
            Ok(s) => s,
            Err(e) => {
                self.state = EngineState::Inactive;
                self.error = Some(e.clone());
                return Err(e);
            }
        };
        self.scheduler = Some(scheduler);

        let roots = match catch_unwind(AssertUnwindSafe(|| self.generator.roots())) {
            Ok(Ok(roots)) => roots,
            Ok(Err(e)) => return Err(self.contract_violation(GeneratorStage::Roots, e.message)),
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                return Err(self.contract_violation(GeneratorStage::Roots, detail));
            }
        };

        let mut root_ids = Vec::with_capacity(roots.len());
        let mut requests = Vec::with_capacity(roots.len());
        for state in roots {
            let id = self.tree.add_root(state);
            self.stats.nodes_created += 1;
            let path = self.reach(id)?;
            root_ids.push(id);
            requests.push(EvalRequest { node: id, path });
        }

        let report = self.evaluate(requests);
        let canceled = report.canceled;
        self.settle(report);
        self.emit(SearchEvent::Initialized {
            roots: root_ids.clone(),
        });
        if canceled {
            self.finish_canceled();
            return Ok(StepOutcome::Canceled);
        }
        Ok(StepOutcome::Initialized {
            roots: root_ids.len(),
        })
    }

    fn advance(
        &mut self,
    ) -> Result<StepOutcome<G::State, G::Action, E::Score>, SearchError> {
        if self.cancel.is_canceled() {
            self.finish_canceled();
            return Ok(StepOutcome::Canceled);
        }
        if let Some(solution) = self.reported.pop_front() {
            self.stats.solutions_found += 1;
            self.emit(SearchEvent::SolutionFound(solution.clone()));
            return Ok(StepOutcome::Solution(solution));
        }
        if let (Some(limit), Some(started)) = (self.policy.timeout(), self.started_at) {
            if started.elapsed() >= limit {
                return Ok(self.finish(TerminationReason::Timeout));
            }
        }
        if let Some(max) = self.policy.max_expansions {
            if self.stats.nodes_expanded >= max {
                return Ok(self.finish(TerminationReason::ExpansionBudgetExhausted));
            }
        }
        let Some(FrontierEntry { node, score }) = self.frontier.pop() else {
            return Ok(self.finish(TerminationReason::FrontierExhausted));
        };

        let Some(path) = self.tree.path_to(node) else {
            return Ok(StepOutcome::Expanded {
                node,
                successors: 0,
            });
        };
        if path.head().is_goal() {
            self.tree.set_status(node, NodeStatus::Solution);
            self.stats.solutions_found += 1;
            tracing::debug!(node = %node, depth = path.head().depth(), "solution found");
            let solution = Solution {
                path,
                score,
                reported_by: None,
            };
            self.emit(SearchEvent::SolutionFound(solution.clone()));
            return Ok(StepOutcome::Solution(solution));
        }

        self.tree.set_status(node, NodeStatus::Expanded);
        let state = path.head().state();
        let expansions =
            match catch_unwind(AssertUnwindSafe(|| self.generator.successors(state))) {
                Ok(Ok(expansions)) => expansions,
                Ok(Err(e)) => {
                    return Err(self.contract_violation(GeneratorStage::Successors, e.message))
                }
                Err(payload) => {
                    let detail = panic_message(payload.as_ref());
                    return Err(self.contract_violation(GeneratorStage::Successors, detail));
                }
            };
        let successors = expansions.len();
        if successors == 0 {
            self.stats.dead_ends += 1;
        }

        let mut requests = Vec::with_capacity(successors);
        for expansion in expansions {
            let Some(child) = self.tree.add_child(node, expansion) else {
                continue;
            };
            self.stats.nodes_created += 1;
            let child_path = self.reach(child)?;
            let too_deep = self
                .policy
                .max_depth
                .is_some_and(|max| child_path.head().depth() > max);
            if too_deep {
                self.prune(child, PruneReason::DepthLimit);
            } else {
                requests.push(EvalRequest {
                    node: child,
                    path: child_path,
                });
            }
        }

        let report = self.evaluate(requests);
        let canceled = report.canceled;
        self.settle(report);
        self.stats.nodes_expanded += 1;
        tracing::debug!(node = %node, successors, "node expanded");
        self.emit(SearchEvent::NodeExpanded { node, successors });

        if canceled {
            self.finish_canceled();
            return Ok(StepOutcome::Canceled);
        }
        Ok(StepOutcome::Expanded { node, successors })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run the goal test on a freshly created node and announce it.
    fn reach(&mut self, id: NodeId) -> Result<NodePath<G::State, G::Action>, SearchError> {
        let Some(path) = self.tree.path_to(id) else {
            return Err(self.contract_violation(
                GeneratorStage::GoalTest,
                format!("node {id} is missing from the traversal tree"),
            ));
        };
        let is_goal = match catch_unwind(AssertUnwindSafe(|| self.generator.is_goal_path(&path))) {
            Ok(goal) => goal,
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                return Err(self.contract_violation(GeneratorStage::GoalTest, detail));
            }
        };
        let head = path.head();
        head.mark_goal(is_goal);
        let event = SearchEvent::NodeReached {
            node: id,
            parent: head.parent(),
            depth: head.depth(),
            kind: head.kind(),
            is_goal,
        };
        self.emit(event);
        Ok(path)
    }

    fn evaluate(
        &mut self,
        requests: Vec<EvalRequest<G::State, G::Action>>,
    ) -> BatchReport<G::State, G::Action, E::Score> {
        if requests.is_empty() {
            return BatchReport::empty();
        }
        let fallback = self.timeout_evaluator.as_deref();
        match &mut self.scheduler {
            Some(scheduler) => scheduler.run_batch(requests, &self.cancel, fallback),
            None => BatchReport {
                outcomes: requests
                    .into_iter()
                    .map(|r| {
                        (
                            r.node,
                            EvalOutcome::Pruned(PruneReason::WorkerFailure(
                                "scheduler not running".into(),
                            )),
                        )
                    })
                    .collect(),
                reported: Vec::new(),
                canceled: false,
            },
        }
    }

    fn settle(&mut self, report: BatchReport<G::State, G::Action, E::Score>) {
        for (node, path, score) in report.reported {
            self.accept_reported(node, path, score);
        }
        for (node, outcome) in report.outcomes {
            match outcome {
                EvalOutcome::Scored(score) => {
                    self.stats.nodes_scored += 1;
                    self.tree.set_score(node, score.clone());
                    self.tree.set_status(node, NodeStatus::Open);
                    self.emit(SearchEvent::NodeScored { node, score });
                }
                EvalOutcome::Pruned(reason) => self.prune(node, reason),
            }
        }
    }

    /// Queue a solution reported while `node` was evaluated. The path must
    /// run through `node` to a goal below it.
    fn accept_reported(
        &mut self,
        node: NodeId,
        path: NodePath<G::State, G::Action>,
        score: E::Score,
    ) {
        let at_node = self
            .tree
            .node(node)
            .and_then(|n| usize::try_from(n.depth()).ok())
            .and_then(|depth| path.nodes().nth(depth).map(|n| (depth, n.id())));
        let extends = matches!(at_node, Some((depth, id)) if id == node && path.len() > depth + 1);
        if !extends {
            tracing::warn!(node = %node, "reported solution does not extend the evaluated node; ignored");
            return;
        }
        let reaches_goal =
            match catch_unwind(AssertUnwindSafe(|| self.generator.is_goal_path(&path))) {
                Ok(goal) => goal,
                Err(payload) => {
                    tracing::warn!(
                        node = %node,
                        panic = %panic_message(payload.as_ref()),
                        "goal test panicked on a reported solution; ignored"
                    );
                    false
                }
            };
        if !reaches_goal {
            tracing::warn!(node = %node, "reported solution does not reach a goal; ignored");
            return;
        }
        path.head().mark_goal(true);
        self.stats.solutions_reported += 1;
        tracing::debug!(node = %node, length = path.len(), "evaluator reported a solution");
        self.reported.push_back(Solution {
            path,
            score,
            reported_by: Some(node),
        });
    }

    fn prune(&mut self, node: NodeId, reason: PruneReason) {
        tracing::debug!(node = %node, reason = %reason, "node pruned");
        self.stats.record_prune(&reason);
        self.tree.set_status(node, NodeStatus::Pruned(reason.clone()));
        self.emit(SearchEvent::NodePruned { node, reason });
    }

    fn emit(&mut self, event: Event<G, E>) {
        self.observers.dispatch(&event);
    }

    fn finish(&mut self, reason: TerminationReason) -> StepOutcome<G::State, G::Action, E::Score> {
        self.state = EngineState::Inactive;
        self.termination = Some(reason);
        self.scheduler = None;
        tracing::info!(
            generator = self.generator.generator_id(),
            ?reason,
            expanded = self.stats.nodes_expanded,
            solutions = self.stats.solutions_found,
            "best-first search finished"
        );
        self.emit(SearchEvent::Finished(reason));
        StepOutcome::Finished(reason)
    }

    fn finish_canceled(&mut self) {
        self.state = EngineState::Inactive;
        self.canceled = true;
        self.scheduler = None;
        tracing::info!(
            generator = self.generator.generator_id(),
            expanded = self.stats.nodes_expanded,
            "best-first search canceled"
        );
        self.emit(SearchEvent::Canceled);
    }

    fn contract_violation(&mut self, stage: GeneratorStage, detail: String) -> SearchError {
        let err = SearchError::GeneratorContractViolation { stage, detail };
        tracing::warn!(
            generator = self.generator.generator_id(),
            error = %err,
            "graph generator contract violated"
        );
        self.error = Some(err.clone());
        self.finish(TerminationReason::GeneratorContractViolation);
        err
    }
}

/// Iterator over the solutions of a [`BestFirstSearch`].
///
/// Yields `Err` at most once, then ends.
pub struct Solutions<'a, G, E>
where
    G: GraphGenerator,
    E: NodeEvaluator<G::State, G::Action>,
{
    search: &'a mut BestFirstSearch<G, E>,
    done: bool,
}

impl<G, E> Iterator for Solutions<'_, G, E>
where
    G: GraphGenerator,
    E: NodeEvaluator<G::State, G::Action>,
{
    type Item = Result<Solution<G::State, G::Action, E::Score>, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.search.next_solution() {
            Ok(Some(solution)) => Some(Ok(solution)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
