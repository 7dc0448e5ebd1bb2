//! The MCTS engine: selection, expansion, rollout, backpropagation.
//!
//! Selection and expansion run on the caller's thread with exclusive access
//! to the tree. Rollouts of a batch may run on scoped threads; each one
//! backpropagates under the tree's write lock, so a root-to-leaf update is
//! never interleaved with another.

use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::thread;

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::config::MctsConfig;
use super::policy::{
    DefaultPolicy, Playout, PlayoutEnd, PlayoutEvaluator, TreePolicy, Ucb1, UniformRandomPolicy,
};
use super::tree::{MctsTree, RewardStats, TreeNode};
use crate::cancel::CancelHandle;
use crate::contract::{Expansion, GraphGenerator};
use crate::error::{panic_message, GeneratorStage, PruneReason, SearchError};
use crate::event::{Observer, ObserverRegistry};
use crate::node::{NodeId, NodePath};
use crate::search::EngineState;

/// Why an MCTS engine became inactive without being canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MctsTermination {
    /// Every path below the root is in the tree.
    TreeExhausted,
    /// The graph generator failed; the error was returned to the caller.
    GeneratorContractViolation,
    /// A rollout thread could not be started.
    WorkerSpawnFailed,
}

/// Event emitted by [`MctsSearch`].
#[derive(Debug, Clone, PartialEq)]
pub enum MctsEvent {
    /// The single root was generated and goal-tested.
    Initialized { root_goal: bool },
    /// A playout was scored and backed up. Playout 0 is the root's own.
    PlayoutCompleted {
        playout: u64,
        leaf: NodeId,
        leaf_depth: u32,
        rollout_steps: usize,
        end: PlayoutEnd,
        reward: f64,
        /// Set when the playout evaluator or default policy failed and the
        /// failure reward was backed up instead.
        failure: Option<PruneReason>,
    },
    /// A goal-reaching playout beat every earlier one.
    NewBestGoal { playout: u64, reward: f64 },
    Finished(MctsTermination),
    Canceled,
}

/// A playout together with its backed-up reward.
#[derive(Debug, Clone)]
pub struct ScoredPlayout<S, A> {
    pub playout: Playout<S, A>,
    pub reward: f64,
    /// Index of the playout (0 is the root's own).
    pub index: u64,
}

/// Statistics of one root child.
#[derive(Debug, Clone)]
pub struct ChildReport<A> {
    pub node: NodeId,
    pub action: A,
    pub visits: u64,
    pub mean: f64,
    pub variance: f64,
    pub exhausted: bool,
}

/// Summary of an MCTS run so far.
#[derive(Debug, Clone)]
pub struct MctsReport<A> {
    /// Playouts after the root's first visit.
    pub iterations: u64,
    pub tree_size: usize,
    pub root_visits: u64,
    /// Actions along the path of highest-mean children (ties go to visits).
    pub best_actions: Vec<A>,
    /// Mean reward of the last node on `best_actions`.
    pub best_mean: Option<f64>,
    pub children: Vec<ChildReport<A>>,
    pub exhausted: bool,
    /// Playouts that backed up the failure reward.
    pub failures: u64,
}

/// Monte-Carlo tree search over a single-rooted [`GraphGenerator`].
pub struct MctsSearch<G, P>
where
    G: GraphGenerator,
    P: PlayoutEvaluator<G::State, G::Action>,
{
    generator: G,
    evaluator: P,
    config: MctsConfig,
    tree_policy: Box<dyn TreePolicy>,
    default_policy: Box<dyn DefaultPolicy<G::State, G::Action>>,
    tree: Option<RwLock<MctsTree<G::State, G::Action>>>,
    state: EngineState,
    rng: StdRng,
    playouts: u64,
    failures: u64,
    best_goal: Option<ScoredPlayout<G::State, G::Action>>,
    observers: ObserverRegistry<MctsEvent>,
    cancel: CancelHandle,
    canceled: bool,
    termination: Option<MctsTermination>,
    error: Option<SearchError>,
}

impl<G, P> std::fmt::Debug for MctsSearch<G, P>
where
    G: GraphGenerator,
    P: PlayoutEvaluator<G::State, G::Action>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MctsSearch")
            .field("generator", &self.generator.generator_id())
            .field("state", &self.state)
            .field("playouts", &self.playouts)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<G, P> MctsSearch<G, P>
where
    G: GraphGenerator,
    P: PlayoutEvaluator<G::State, G::Action>,
{
    /// Engine with the default [`MctsConfig`], UCB1 and uniform rollouts.
    #[must_use]
    pub fn new(generator: G, evaluator: P) -> Self {
        let config = MctsConfig::default();
        Self {
            generator,
            evaluator,
            tree_policy: Box::new(Ucb1::new(config.exploration_constant)),
            default_policy: Box::new(UniformRandomPolicy),
            tree: None,
            state: EngineState::Created,
            rng: StdRng::seed_from_u64(config.seed),
            playouts: 0,
            failures: 0,
            best_goal: None,
            observers: ObserverRegistry::new(),
            cancel: CancelHandle::new(),
            canceled: false,
            termination: None,
            error: None,
            config,
        }
    }

    /// # Errors
    ///
    /// [`SearchError::InvalidPolicy`] if `config` fails validation.
    pub fn with_config(generator: G, evaluator: P, config: MctsConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let mut search = Self::new(generator, evaluator);
        search.tree_policy = Box::new(Ucb1::new(config.exploration_constant));
        search.rng = StdRng::seed_from_u64(config.seed);
        search.config = config;
        Ok(search)
    }

    /// # Errors
    ///
    /// [`SearchError::AlreadyStarted`] once the engine has left `Created`.
    pub fn set_tree_policy(&mut self, policy: impl TreePolicy + 'static) -> Result<(), SearchError> {
        self.ensure_created()?;
        self.tree_policy = Box::new(policy);
        Ok(())
    }

    /// # Errors
    ///
    /// [`SearchError::AlreadyStarted`] once the engine has left `Created`.
    pub fn set_default_policy(
        &mut self,
        policy: impl DefaultPolicy<G::State, G::Action> + 'static,
    ) -> Result<(), SearchError> {
        self.ensure_created()?;
        self.default_policy = Box::new(policy);
        Ok(())
    }

    pub fn register_observer(&mut self, observer: impl Observer<MctsEvent> + 'static) {
        self.observers.register(observer);
    }

    /// Handle that cancels this engine from any thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel the search. Idempotent.
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

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Playouts after the root's first visit.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.playouts.saturating_sub(1)
    }

    #[must_use]
    pub fn termination(&self) -> Option<MctsTermination> {
        self.termination
    }

    #[must_use]
    pub fn was_canceled(&self) -> bool {
        self.canceled
    }

    #[must_use]
    pub fn error(&self) -> Option<&SearchError> {
        self.error.as_ref()
    }

    /// Best goal-reaching playout whose evaluation succeeded.
    #[must_use]
    pub fn best_goal_playout(&self) -> Option<&ScoredPlayout<G::State, G::Action>> {
        self.best_goal.as_ref()
    }

    /// Read access to the tree; `None` before activation.
    pub fn with_tree<R>(&self, f: impl FnOnce(&MctsTree<G::State, G::Action>) -> R) -> Option<R> {
        self.tree.as_ref().map(|lock| f(&lock.read()))
    }

    /// Run `iterations_per_call` playouts (fewer if the engine stops).
    ///
    /// # Errors
    ///
    /// See [`Self::run_iterations`].
    pub fn run(&mut self) -> Result<MctsReport<G::Action>, SearchError> {
        self.run_iterations(self.config.iterations_per_call)
    }

    /// Run up to `iterations` playouts. The first call also generates the
    /// root and performs its own playout, which is not counted.
    ///
    /// Returns early when the tree is exhausted or the engine is canceled;
    /// on an inactive engine it only reports.
    ///
    /// # Errors
    ///
    /// [`SearchError::GeneratorContractViolation`] if the generator does not
    /// produce exactly one root, or fails or panics. The error is returned
    /// once; the engine is `Inactive` afterwards.
    pub fn run_iterations(&mut self, iterations: u64) -> Result<MctsReport<G::Action>, SearchError> {
        if self.state == EngineState::Created {
            self.activate()?;
        }
        let mut done = 0;
        while done < iterations && self.state == EngineState::Active {
            if self.cancel.is_canceled() {
                self.finish_canceled();
                break;
            }
            let remaining = usize::try_from(iterations - done).unwrap_or(usize::MAX);
            let completed = self.iterate(remaining.min(self.config.rollout_parallelism))?;
            done += completed as u64;
        }
        Ok(self.report())
    }

    /// Snapshot of the statistics gathered so far.
    #[must_use]
    pub fn report(&self) -> MctsReport<G::Action> {
        let mut report = MctsReport {
            iterations: self.iterations(),
            tree_size: 0,
            root_visits: 0,
            best_actions: Vec::new(),
            best_mean: None,
            children: Vec::new(),
            exhausted: false,
            failures: self.failures,
        };
        let Some(lock) = &self.tree else {
            return report;
        };
        let tree = lock.read();
        let root = tree.root();
        let Some(root_node) = tree.get(root) else {
            return report;
        };
        report.tree_size = tree.len();
        report.root_visits = root_node.stats().visits();
        report.exhausted = root_node.is_exhausted();
        report.children = root_node
            .children()
            .iter()
            .filter_map(|id| {
                let node = tree.get(*id)?;
                Some(ChildReport {
                    node: *id,
                    action: node.action()?.clone(),
                    visits: node.stats().visits(),
                    mean: node.stats().mean(),
                    variance: node.stats().variance(),
                    exhausted: node.is_exhausted(),
                })
            })
            .collect();

        let mut current = root_node;
        while let Some(next) = best_child(&tree, current) {
            let Some(action) = next.action() else { break };
            report.best_actions.push(action.clone());
            report.best_mean = Some(next.stats().mean());
            current = next;
        }
        report
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    fn activate(&mut self) -> Result<(), SearchError> {
        if self.cancel.is_canceled() {
            self.finish_canceled();
            return Ok(());
        }
        self.state = EngineState::Active;
        tracing::info!(
            generator = self.generator.generator_id(),
            rollout_parallelism = self.config.rollout_parallelism,
            seed = self.config.seed,
            "mcts search activated"
        );

        let mut roots = match catch_unwind(AssertUnwindSafe(|| self.generator.roots())) {
            Ok(Ok(roots)) => roots,
            Ok(Err(e)) => return Err(self.fail(violation(GeneratorStage::Roots, e.message))),
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                return Err(self.fail(violation(GeneratorStage::Roots, detail)));
            }
        };
        let count = roots.len();
        let (Some(root), 1) = (roots.pop(), count) else {
            let detail = format!("mcts needs exactly one root, got {count}");
            return Err(self.fail(violation(GeneratorStage::Roots, detail)));
        };

        let goal = goal_test(&self.generator, &NodePath::from_root(root.clone()))
            .map_err(|e| self.fail(e))?;
        let tree = MctsTree::new(root, goal);
        let root_id = tree.root();
        self.tree = Some(RwLock::new(tree));
        self.emit(MctsEvent::Initialized { root_goal: goal });

        self.play(vec![root_id])?;
        if self.root_exhausted() {
            self.finish(MctsTermination::TreeExhausted);
        }
        Ok(())
    }

    /// Select up to `batch` leaves and play them out. Returns the number of
    /// playouts performed; 0 means the tree is exhausted.
    fn iterate(&mut self, batch: usize) -> Result<usize, SearchError> {
        let mut leaves = Vec::with_capacity(batch);
        if let Some(lock) = self.tree.as_mut() {
            let tree = lock.get_mut();
            for _ in 0..batch {
                let selected = select_leaf(
                    tree,
                    &self.generator,
                    self.tree_policy.as_ref(),
                    &mut self.rng,
                    self.config.taboo_exhausted,
                );
                match selected {
                    Ok(Some(leaf)) => leaves.push(leaf),
                    Ok(None) => break,
                    Err(e) => return Err(self.fail(e)),
                }
            }
        }
        if leaves.is_empty() {
            self.finish(MctsTermination::TreeExhausted);
            return Ok(0);
        }
        let count = leaves.len();
        self.play(leaves)?;
        if self.root_exhausted() {
            self.finish(MctsTermination::TreeExhausted);
        }
        Ok(count)
    }

    /// Roll out, score and backpropagate one playout per leaf.
    fn play(&mut self, leaves: Vec<NodeId>) -> Result<(), SearchError> {
        let Some(lock) = self.tree.as_ref() else {
            return Ok(());
        };
        let jobs: Vec<Job<G::State, G::Action>> = {
            let tree = lock.read();
            leaves
                .into_iter()
                .zip(self.playouts..)
                .filter_map(|(leaf, index)| {
                    Some(Job {
                        index,
                        leaf,
                        goal: tree.get(leaf)?.is_goal(),
                        path: tree.path(leaf)?,
                        seed: rollout_seed(self.config.seed, index),
                    })
                })
                .collect()
        };
        let rollouts = Rollouts {
            generator: &self.generator,
            evaluator: &self.evaluator,
            policy: self.default_policy.as_ref(),
            tree: lock,
            max_depth: self.config.max_rollout_depth,
            failure_reward: self.config.failure_reward,
        };

        let results: Vec<Result<Completed<G::State, G::Action>, SearchError>> =
            if jobs.len() <= 1 || self.config.rollout_parallelism <= 1 {
                jobs.into_iter().map(|job| rollouts.run(job)).collect()
            } else {
                run_scoped(&rollouts, jobs)
            };

        let mut first_error = None;
        for result in results {
            match result {
                Ok(done) => self.record(done),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(self.fail(e)),
            None => Ok(()),
        }
    }

    fn record(&mut self, done: Completed<G::State, G::Action>) {
        let Completed {
            index,
            leaf,
            playout,
            reward,
            failure,
        } = done;
        self.playouts += 1;
        if let Some(reason) = &failure {
            self.failures += 1;
            tracing::debug!(playout = index, leaf = %leaf, %reason, "playout failed");
        }

        let mut leaf_depth = 0;
        if let Some(lock) = self.tree.as_mut() {
            let tree = lock.get_mut();
            // A rollout that found no successors at the leaf itself proves
            // the leaf is a dead end.
            if playout.end == PlayoutEnd::DeadEnd && playout.path.len() == playout.tree_len {
                tree.set_untried(leaf, Vec::new());
            }
            if self.config.taboo_exhausted && tree.get(leaf).is_some_and(TreeNode::is_terminal) {
                tree.propagate_exhaustion(leaf);
            }
            leaf_depth = tree.get(leaf).map_or(0, TreeNode::depth);
        }

        self.emit(MctsEvent::PlayoutCompleted {
            playout: index,
            leaf,
            leaf_depth,
            rollout_steps: playout.path.len().saturating_sub(playout.tree_len),
            end: playout.end,
            reward,
            failure: failure.clone(),
        });

        let improves = playout.end == PlayoutEnd::Goal
            && failure.is_none()
            && self.best_goal.as_ref().is_none_or(|best| reward > best.reward);
        if improves {
            tracing::debug!(playout = index, reward, "new best goal playout");
            self.best_goal = Some(ScoredPlayout {
                playout,
                reward,
                index,
            });
            self.emit(MctsEvent::NewBestGoal {
                playout: index,
                reward,
            });
        }
    }

    fn root_exhausted(&self) -> bool {
        self.config.taboo_exhausted
            && self.with_tree(|t| t.get(t.root()).is_some_and(TreeNode::is_exhausted)) == Some(true)
    }

    fn emit(&mut self, event: MctsEvent) {
        self.observers.dispatch(&event);
    }

    fn finish(&mut self, reason: MctsTermination) {
        self.state = EngineState::Inactive;
        self.termination = Some(reason);
        tracing::info!(
            generator = self.generator.generator_id(),
            ?reason,
            iterations = self.iterations(),
            "mcts search finished"
        );
        self.emit(MctsEvent::Finished(reason));
    }

    fn finish_canceled(&mut self) {
        self.state = EngineState::Inactive;
        self.canceled = true;
        tracing::info!(
            generator = self.generator.generator_id(),
            iterations = self.iterations(),
            "mcts search canceled"
        );
        self.emit(MctsEvent::Canceled);
    }

    fn fail(&mut self, err: SearchError) -> SearchError {
        tracing::warn!(
            generator = self.generator.generator_id(),
            error = %err,
            "mcts search stopped by an error"
        );
        let reason = match err {
            SearchError::WorkerSpawn { .. } => MctsTermination::WorkerSpawnFailed,
            _ => MctsTermination::GeneratorContractViolation,
        };
        self.error = Some(err.clone());
        self.finish(reason);
        err
    }
}

// ----------------------------------------------------------------------
// Tree phase
// ----------------------------------------------------------------------

/// Descend from the root to the node that receives the next playout.
///
/// Untried successors are expanded before any explored child is revisited,
/// in random order. With `taboo`, exhausted children are skipped and a
/// node whose children are all exhausted is marked exhausted itself; the
/// descent then restarts from the root. `None` means the root is exhausted.
fn select_leaf<G: GraphGenerator>(
    tree: &mut MctsTree<G::State, G::Action>,
    generator: &G,
    tree_policy: &dyn TreePolicy,
    rng: &mut StdRng,
    taboo: bool,
) -> Result<Option<NodeId>, SearchError> {
    let root = tree.root();
    let mut current = root;
    loop {
        let Some(node) = tree.get(current) else {
            return Ok(None);
        };
        if taboo && node.is_exhausted() {
            return Ok(None);
        }
        if !node.is_generated() {
            let successors = generate(generator, node.state())?;
            tree.set_untried(current, successors);
        }
        let Some(node) = tree.get(current) else {
            return Ok(None);
        };

        let untried = node.untried_len();
        if untried > 0 {
            let pick = rng.random_range(0..untried);
            let Some(child) = tree.expand(current, pick, false) else {
                return Ok(None);
            };
            let Some(path) = tree.path(child) else {
                return Ok(None);
            };
            if goal_test(generator, &path)? {
                tree.mark_goal(child);
                if taboo {
                    tree.propagate_exhaustion(child);
                }
            }
            return Ok(Some(child));
        }

        let parent_visits = node.stats().visits();
        let candidates: Vec<(NodeId, RewardStats)> = node
            .children()
            .iter()
            .filter_map(|id| tree.get(*id).map(|child| (*id, child)))
            .filter(|(_, child)| !taboo || !child.is_exhausted())
            .map(|(id, child)| (id, *child.stats()))
            .collect();
        if candidates.is_empty() {
            if !taboo {
                return Ok(Some(current));
            }
            if tree.propagate_exhaustion(current) {
                return Ok(None);
            }
            current = root;
            continue;
        }

        let stats: Vec<RewardStats> = candidates.iter().map(|(_, s)| *s).collect();
        let choice = catch_unwind(AssertUnwindSafe(|| tree_policy.select(parent_visits, &stats)));
        let index = match choice {
            Ok(Some(i)) if i < candidates.len() => i,
            Ok(other) => {
                tracing::warn!(choice = ?other, candidates = candidates.len(), "tree policy choice out of range");
                0
            }
            Err(payload) => {
                tracing::warn!(panic = %panic_message(payload.as_ref()), "tree policy panicked");
                0
            }
        };
        current = candidates[index].0;
    }
}

/// Child with the highest mean reward, ties broken by visits. Unvisited
/// children are ignored.
fn best_child<'t, S, A>(tree: &'t MctsTree<S, A>, node: &TreeNode<S, A>) -> Option<&'t TreeNode<S, A>> {
    node.children()
        .iter()
        .filter_map(|id| tree.get(*id))
        .filter(|child| child.stats().visits() > 0)
        .max_by(|a, b| {
            a.stats()
                .mean()
                .total_cmp(&b.stats().mean())
                .then(a.stats().visits().cmp(&b.stats().visits()))
        })
}

// ----------------------------------------------------------------------
// Rollouts
// ----------------------------------------------------------------------

struct Job<S, A> {
    index: u64,
    leaf: NodeId,
    goal: bool,
    path: NodePath<S, A>,
    seed: u64,
}

struct Completed<S, A> {
    index: u64,
    leaf: NodeId,
    playout: Playout<S, A>,
    reward: f64,
    failure: Option<PruneReason>,
}

/// Everything a rollout needs, shared by reference across rollout threads.
struct Rollouts<'a, G: GraphGenerator, P> {
    generator: &'a G,
    evaluator: &'a P,
    policy: &'a dyn DefaultPolicy<G::State, G::Action>,
    tree: &'a RwLock<MctsTree<G::State, G::Action>>,
    max_depth: Option<u32>,
    failure_reward: f64,
}

impl<G, P> Rollouts<'_, G, P>
where
    G: GraphGenerator,
    P: PlayoutEvaluator<G::State, G::Action>,
{
    fn run(&self, job: Job<G::State, G::Action>) -> Result<Completed<G::State, G::Action>, SearchError> {
        let mut rng = StdRng::seed_from_u64(job.seed);
        let (playout, aborted) = self.play_out(job.path, job.goal, &mut rng)?;
        let (reward, failure) = match aborted {
            Some(reason) => (self.failure_reward, Some(reason)),
            None => self.score(&playout),
        };
        self.tree.write().backpropagate(job.leaf, reward);
        Ok(Completed {
            index: job.index,
            leaf: job.leaf,
            playout,
            reward,
            failure,
        })
    }

    /// Extend `path` with default-policy choices until a goal, a dead end or
    /// the depth limit.
    fn play_out(
        &self,
        mut path: NodePath<G::State, G::Action>,
        goal: bool,
        rng: &mut StdRng,
    ) -> Result<(Playout<G::State, G::Action>, Option<PruneReason>), SearchError> {
        let tree_len = path.len();
        let finish = |path, end| Playout {
            path,
            tree_len,
            end,
        };
        if goal {
            return Ok((finish(path, PlayoutEnd::Goal), None));
        }
        let mut steps = 0u32;
        loop {
            if self.max_depth.is_some_and(|max| steps >= max) {
                return Ok((finish(path, PlayoutEnd::DepthLimit), None));
            }
            let mut options = generate(self.generator, path.head().state())?;
            if options.is_empty() {
                return Ok((finish(path, PlayoutEnd::DeadEnd), None));
            }
            let state = path.head().state();
            let choice = catch_unwind(AssertUnwindSafe(|| self.policy.choose(state, &options, rng)));
            let pick = match choice {
                Ok(i) if i < options.len() => i,
                Ok(i) => {
                    let detail = format!("default policy chose option {i} of {}", options.len());
                    return Ok((finish(path, PlayoutEnd::Aborted), Some(PruneReason::WorkerFailure(detail))));
                }
                Err(payload) => {
                    let detail = panic_message(payload.as_ref());
                    return Ok((finish(path, PlayoutEnd::Aborted), Some(PruneReason::WorkerFailure(detail))));
                }
            };
            let next = options.swap_remove(pick);
            path.push(next.state, next.action);
            steps += 1;
            if goal_test(self.generator, &path)? {
                return Ok((finish(path, PlayoutEnd::Goal), None));
            }
        }
    }

    fn score(&self, playout: &Playout<G::State, G::Action>) -> (f64, Option<PruneReason>) {
        match catch_unwind(AssertUnwindSafe(|| self.evaluator.evaluate(playout))) {
            Ok(Ok(reward)) if reward.is_finite() => (reward, None),
            Ok(Ok(reward)) => (
                self.failure_reward,
                Some(PruneReason::EvaluatorFailed(format!("non-finite reward {reward}"))),
            ),
            Ok(Err(e)) => (self.failure_reward, Some(PruneReason::EvaluatorFailed(e.to_string()))),
            Err(payload) => (
                self.failure_reward,
                Some(PruneReason::WorkerFailure(panic_message(payload.as_ref()))),
            ),
        }
    }
}

/// Run a batch of rollouts on named scoped threads. Results come back in
/// job order.
fn run_scoped<G, P>(
    rollouts: &Rollouts<'_, G, P>,
    jobs: Vec<Job<G::State, G::Action>>,
) -> Vec<Result<Completed<G::State, G::Action>, SearchError>>
where
    G: GraphGenerator,
    P: PlayoutEvaluator<G::State, G::Action>,
{
    thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let index = job.index;
                thread::Builder::new()
                    .name(format!("wayfinder-rollout-{index}"))
                    .spawn_scoped(scope, move || rollouts.run(job))
                    .map_err(|e| SearchError::WorkerSpawn {
                        detail: format!("rollout {index}: {e}"),
                    })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle {
                Ok(handle) => handle.join().unwrap_or_else(|payload| resume_unwind(payload)),
                Err(e) => Err(e),
            })
            .collect()
    })
}

// ----------------------------------------------------------------------
// Generator calls
// ----------------------------------------------------------------------

fn violation(stage: GeneratorStage, detail: String) -> SearchError {
    SearchError::GeneratorContractViolation { stage, detail }
}

fn generate<G: GraphGenerator>(
    generator: &G,
    state: &G::State,
) -> Result<Vec<Expansion<G::State, G::Action>>, SearchError> {
    match catch_unwind(AssertUnwindSafe(|| generator.successors(state))) {
        Ok(Ok(successors)) => Ok(successors),
        Ok(Err(e)) => Err(violation(GeneratorStage::Successors, e.message)),
        Err(payload) => Err(violation(GeneratorStage::Successors, panic_message(payload.as_ref()))),
    }
}

fn goal_test<G: GraphGenerator>(
    generator: &G,
    path: &NodePath<G::State, G::Action>,
) -> Result<bool, SearchError> {
    catch_unwind(AssertUnwindSafe(|| generator.is_goal_path(path)))
        .map_err(|payload| violation(GeneratorStage::GoalTest, panic_message(payload.as_ref())))
}

/// Per-playout seed: independent of which thread runs the rollout.
fn rollout_seed(seed: u64, playout: u64) -> u64 {
    seed ^ playout.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
