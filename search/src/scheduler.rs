//! Node-evaluation scheduler: a bounded pool of worker threads.
//!
//! The control thread submits one batch of children at a time and waits for
//! the whole batch. Workers evaluate children concurrently and insert scored
//! children straight into the [`SharedFrontier`] as they finish, so insertion
//! order under `k > 1` follows completion order and is not reproducible. The
//! set of inserted children does not depend on `k`.
//!
//! Each task carries a small state word settled by compare-and-swap:
//!
//! ```text
//! QUEUED ──worker──▶ RUNNING ──worker──▶ FINISHED   (result kept)
//!    │                  │
//!    └──control──▶ ABANDONED ◀──control──┘          (result discarded)
//! ```
//!
//! Whoever wins the swap owns the outcome. A worker that loses (its task
//! timed out or was canceled mid-evaluation) logs the late result and
//! retires. On a timeout the control thread spawns a replacement so the
//! pool stays at `k`.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::cancel::CancelHandle;
use crate::error::{panic_message, PruneReason, SearchError};
use crate::frontier::SharedFrontier;
use crate::node::{NodeId, NodePath};
use crate::scorer::{Evaluation, EvaluationContext, NodeEvaluator, SolutionReports};

const QUEUED: u8 = 0;
const RUNNING: u8 = 1;
const FINISHED: u8 = 2;
const ABANDONED: u8 = 3;

/// Worker threads are named `{WORKER_NAME_PREFIX}-{id}`.
pub const WORKER_NAME_PREFIX: &str = "wayfinder-eval";

/// Result of evaluating one child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EvalOutcome<V> {
    /// Scored and already inserted into the frontier.
    Scored(V),
    Pruned(PruneReason),
}

/// One child to evaluate.
pub(crate) struct EvalRequest<S, A> {
    pub node: NodeId,
    pub path: NodePath<S, A>,
}

/// Outcomes of a batch, in the order they were settled.
pub(crate) struct BatchReport<S, A, V> {
    pub outcomes: Vec<(NodeId, EvalOutcome<V>)>,
    /// Solutions reported by evaluations that ended with a score, tagged
    /// with the node whose evaluation reported them.
    pub reported: Vec<(NodeId, NodePath<S, A>, V)>,
    pub canceled: bool,
}

impl<S, A, V> BatchReport<S, A, V> {
    pub(crate) fn empty() -> Self {
        Self {
            outcomes: Vec::new(),
            reported: Vec::new(),
            canceled: false,
        }
    }
}

struct Task<S, A> {
    id: u64,
    node: NodeId,
    path: NodePath<S, A>,
    state: Arc<AtomicU8>,
    interrupt: Arc<AtomicBool>,
    timeout: Option<Duration>,
}

enum WorkerMessage<S, A, V> {
    Started {
        task: u64,
        at: Instant,
    },
    Finished {
        task: u64,
        outcome: EvalOutcome<V>,
        reports: Vec<(NodePath<S, A>, V)>,
    },
}

/// Control-thread view of a submitted task.
struct Pending<S, A> {
    node: NodeId,
    path: NodePath<S, A>,
    state: Arc<AtomicU8>,
    interrupt: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

/// Fixed-size worker pool evaluating children for one search.
pub(crate) struct Scheduler<S, A, E: NodeEvaluator<S, A>> {
    parallelism: usize,
    timeout: Option<Duration>,
    poll_interval: Duration,
    evaluator: Arc<E>,
    frontier: SharedFrontier<E::Score>,
    task_tx: Option<Sender<Task<S, A>>>,
    task_rx: Receiver<Task<S, A>>,
    done_tx: Sender<WorkerMessage<S, A, E::Score>>,
    done_rx: Receiver<WorkerMessage<S, A, E::Score>>,
    workers: Vec<JoinHandle<()>>,
    next_worker_id: usize,
    live_workers: usize,
    next_task_id: u64,
    late_results: Arc<AtomicU64>,
}

impl<S, A, E> Scheduler<S, A, E>
where
    S: Send + Sync + 'static,
    A: Send + Sync + 'static,
    E: NodeEvaluator<S, A>,
{
    /// Start `parallelism` workers. Results of abandoned evaluations are
    /// counted in `late_results`, which outlives the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::WorkerSpawn`] if a worker thread cannot be
    /// started.
    pub(crate) fn new(
        parallelism: usize,
        timeout: Option<Duration>,
        poll_interval: Duration,
        evaluator: Arc<E>,
        frontier: SharedFrontier<E::Score>,
        late_results: Arc<AtomicU64>,
    ) -> Result<Self, SearchError> {
        let (task_tx, task_rx) = channel::unbounded();
        let (done_tx, done_rx) = channel::unbounded();
        let mut scheduler = Self {
            parallelism,
            timeout,
            poll_interval,
            evaluator,
            frontier,
            task_tx: Some(task_tx),
            task_rx,
            done_tx,
            done_rx,
            workers: Vec::with_capacity(parallelism),
            next_worker_id: 0,
            live_workers: 0,
            next_task_id: 0,
            late_results,
        };
        for _ in 0..parallelism {
            scheduler
                .spawn_worker()
                .map_err(|e| SearchError::WorkerSpawn {
                    detail: e.to_string(),
                })?;
        }
        tracing::debug!(parallelism, "scheduler started");
        Ok(scheduler)
    }

    fn spawn_worker(&mut self) -> std::io::Result<()> {
        let id = self.next_worker_id;
        self.next_worker_id += 1;
        let tasks = self.task_rx.clone();
        let done = self.done_tx.clone();
        let evaluator = Arc::clone(&self.evaluator);
        let frontier = self.frontier.clone();
        let late = Arc::clone(&self.late_results);

        let handle = thread::Builder::new()
            .name(format!("{WORKER_NAME_PREFIX}-{id}"))
            .spawn(move || worker_loop(id, &tasks, &done, evaluator.as_ref(), &frontier, &late))?;

        // Reap retired workers that have already exited.
        let (finished, running): (Vec<_>, Vec<_>) =
            self.workers.drain(..).partition(JoinHandle::is_finished);
        for h in finished {
            let _ = h.join();
        }
        self.workers = running;
        self.workers.push(handle);
        self.live_workers += 1;
        Ok(())
    }

    /// Budget for tasks dispatched from now on.
    pub(crate) fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    #[cfg(test)]
    fn late_results(&self) -> u64 {
        self.late_results.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn live_workers(&self) -> usize {
        self.live_workers
    }

    /// Evaluate a batch of children and wait until every one is settled.
    ///
    /// `fallback` is consulted on the control thread for children whose
    /// evaluation timed out. If it yields a score, the child is inserted with
    /// it instead of being pruned.
    pub(crate) fn run_batch(
        &mut self,
        requests: Vec<EvalRequest<S, A>>,
        cancel: &CancelHandle,
        fallback: Option<&dyn NodeEvaluator<S, A, Score = E::Score>>,
    ) -> BatchReport<S, A, E::Score> {
        let mut report = BatchReport {
            outcomes: Vec::with_capacity(requests.len()),
            reported: Vec::new(),
            canceled: false,
        };
        let mut pending: BTreeMap<u64, Pending<S, A>> = BTreeMap::new();

        for req in requests {
            if cancel.is_canceled() {
                report.canceled = true;
                report
                    .outcomes
                    .push((req.node, EvalOutcome::Pruned(PruneReason::Canceled)));
                continue;
            }
            let id = self.next_task_id;
            self.next_task_id += 1;
            let state = Arc::new(AtomicU8::new(QUEUED));
            let interrupt = Arc::new(AtomicBool::new(false));
            let task = Task {
                id,
                node: req.node,
                path: req.path.clone(),
                state: Arc::clone(&state),
                interrupt: Arc::clone(&interrupt),
                timeout: self.timeout,
            };
            let sent = self.task_tx.as_ref().is_some_and(|tx| tx.send(task).is_ok());
            if sent {
                pending.insert(
                    id,
                    Pending {
                        node: req.node,
                        path: req.path,
                        state,
                        interrupt,
                        deadline: None,
                    },
                );
            } else {
                report.outcomes.push((
                    req.node,
                    EvalOutcome::Pruned(PruneReason::WorkerFailure(
                        "scheduler is shut down".into(),
                    )),
                ));
            }
        }
        tracing::trace!(submitted = pending.len(), "batch dispatched");

        let mut draining = false;
        while !pending.is_empty() {
            if !draining && cancel.is_canceled() {
                draining = true;
                report.canceled = true;
                self.abandon_all(&mut pending, &mut report);
                continue;
            }
            if !draining {
                self.expire_overdue(&mut pending, &mut report, fallback);
                if pending.is_empty() {
                    break;
                }
            }

            match self.done_rx.recv_timeout(self.next_wait(&pending)) {
                Ok(WorkerMessage::Started { task, at }) => {
                    if let Some(p) = pending.get_mut(&task) {
                        p.deadline = self.timeout.map(|t| at + t);
                    }
                }
                Ok(WorkerMessage::Finished {
                    task,
                    outcome,
                    reports,
                }) => {
                    let Some(p) = pending.remove(&task) else {
                        continue;
                    };
                    if !draining {
                        report
                            .reported
                            .extend(reports.into_iter().map(|(path, score)| (p.node, path, score)));
                    }
                    let outcome = match outcome {
                        EvalOutcome::Pruned(PruneReason::TimedOut { budget }) if !draining => {
                            self.fallback_or_prune(p.node, &p.path, budget, fallback)
                        }
                        other => other,
                    };
                    report.outcomes.push((p.node, outcome));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // Unreachable while `done_tx` is held; settle defensively.
                    for (_, p) in std::mem::take(&mut pending) {
                        report.outcomes.push((
                            p.node,
                            EvalOutcome::Pruned(PruneReason::WorkerFailure(
                                "completion channel closed".into(),
                            )),
                        ));
                    }
                }
            }
        }
        report
    }

    /// How long to block before the next cancel check or deadline.
    fn next_wait(&self, pending: &BTreeMap<u64, Pending<S, A>>) -> Duration {
        let now = Instant::now();
        pending
            .values()
            .filter_map(|p| p.deadline)
            .map(|d| d.saturating_duration_since(now))
            .fold(self.poll_interval, Duration::min)
    }

    fn expire_overdue(
        &mut self,
        pending: &mut BTreeMap<u64, Pending<S, A>>,
        report: &mut BatchReport<S, A, E::Score>,
        fallback: Option<&dyn NodeEvaluator<S, A, Score = E::Score>>,
    ) {
        let Some(budget) = self.timeout else {
            return;
        };
        let now = Instant::now();
        let overdue: Vec<u64> = pending
            .iter()
            .filter(|(_, p)| p.deadline.is_some_and(|d| now >= d))
            .map(|(id, _)| *id)
            .collect();

        for id in overdue {
            let abandoned = pending.get(&id).is_some_and(|p| {
                p.state
                    .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            });
            if !abandoned {
                // The worker finished first; its completion is on the way.
                continue;
            }
            let Some(p) = pending.remove(&id) else {
                continue;
            };
            p.interrupt.store(true, Ordering::Release);
            tracing::debug!(node = %p.node, budget = ?budget, "evaluation timed out");
            let outcome = self.fallback_or_prune(p.node, &p.path, budget, fallback);
            report.outcomes.push((p.node, outcome));

            self.live_workers = self.live_workers.saturating_sub(1);
            if let Err(e) = self.spawn_worker() {
                tracing::warn!(error = %e, "could not replace timed-out worker");
                if self.live_workers == 0 {
                    self.fail_queued(pending, report);
                }
            }
        }
    }

    /// Settle every queued task when no worker is left to run it.
    fn fail_queued(
        &mut self,
        pending: &mut BTreeMap<u64, Pending<S, A>>,
        report: &mut BatchReport<S, A, E::Score>,
    ) {
        let queued: Vec<u64> = pending
            .iter()
            .filter(|(_, p)| {
                p.state
                    .compare_exchange(QUEUED, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            })
            .map(|(id, _)| *id)
            .collect();
        for id in queued {
            if let Some(p) = pending.remove(&id) {
                report.outcomes.push((
                    p.node,
                    EvalOutcome::Pruned(PruneReason::WorkerFailure(
                        "no scheduler worker available".into(),
                    )),
                ));
            }
        }
    }

    /// Interrupt running tasks and drop queued ones. Tasks that already
    /// finished stay pending until their completion message is drained.
    fn abandon_all(
        &mut self,
        pending: &mut BTreeMap<u64, Pending<S, A>>,
        report: &mut BatchReport<S, A, E::Score>,
    ) {
        let ids: Vec<u64> = pending.keys().copied().collect();
        let mut interrupted = 0usize;
        for id in ids {
            let Some(p) = pending.get(&id) else {
                continue;
            };
            let was_queued = p
                .state
                .compare_exchange(QUEUED, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
            let was_running = !was_queued
                && p.state
                    .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
            if !was_queued && !was_running {
                continue;
            }
            p.interrupt.store(true, Ordering::Release);
            if was_running {
                interrupted += 1;
                self.live_workers = self.live_workers.saturating_sub(1);
            }
            if let Some(p) = pending.remove(&id) {
                report
                    .outcomes
                    .push((p.node, EvalOutcome::Pruned(PruneReason::Canceled)));
            }
        }
        tracing::debug!(
            interrupted,
            awaiting = pending.len(),
            "batch canceled; draining completed evaluations"
        );
    }

    fn fallback_or_prune(
        &self,
        node: NodeId,
        path: &NodePath<S, A>,
        budget: Duration,
        fallback: Option<&dyn NodeEvaluator<S, A, Score = E::Score>>,
    ) -> EvalOutcome<E::Score> {
        let timed_out = EvalOutcome::Pruned(PruneReason::TimedOut { budget });
        let Some(fallback) = fallback else {
            return timed_out;
        };
        let ctx = EvaluationContext::detached();
        match catch_unwind(AssertUnwindSafe(|| fallback.evaluate(path, &ctx))) {
            Ok(Ok(Evaluation::Score(score))) => {
                tracing::debug!(node = %node, "timeout fallback evaluator supplied a score");
                self.frontier.push(node, score.clone());
                EvalOutcome::Scored(score)
            }
            Ok(Ok(Evaluation::NoOpinion) | Err(_)) => timed_out,
            Err(payload) => {
                tracing::warn!(
                    node = %node,
                    panic = %panic_message(payload.as_ref()),
                    "timeout fallback evaluator panicked"
                );
                timed_out
            }
        }
    }

    #[must_use]
    pub(crate) fn parallelism(&self) -> usize {
        self.parallelism
    }
}

impl<S, A, E: NodeEvaluator<S, A>> Drop for Scheduler<S, A, E> {
    fn drop(&mut self) {
        // Closing the task channel stops idle workers. Workers still stuck in
        // an abandoned evaluation are detached; they exit once it returns.
        self.task_tx.take();
        for handle in self.workers.drain(..) {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

fn worker_loop<S, A, E>(
    worker: usize,
    tasks: &Receiver<Task<S, A>>,
    done: &Sender<WorkerMessage<S, A, E::Score>>,
    evaluator: &E,
    frontier: &SharedFrontier<E::Score>,
    late: &AtomicU64,
) where
    E: NodeEvaluator<S, A>,
{
    while let Ok(task) = tasks.recv() {
        if task
            .state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!(worker, node = %task.node, "skipping abandoned task");
            continue;
        }
        let started = Instant::now();
        if done
            .send(WorkerMessage::Started {
                task: task.id,
                at: started,
            })
            .is_err()
        {
            return;
        }

        let ctx = EvaluationContext::new(
            Arc::clone(&task.interrupt),
            task.timeout.map(|t| started + t),
        );
        let mut reports = SolutionReports::new();
        let mut outcome = match catch_unwind(AssertUnwindSafe(|| {
            evaluator.evaluate_reporting(&task.path, &ctx, &mut reports)
        })) {
            Ok(Ok(Evaluation::Score(score))) => EvalOutcome::Scored(score),
            Ok(Ok(Evaluation::NoOpinion)) => EvalOutcome::Pruned(PruneReason::NoOpinion),
            Ok(Err(e)) => EvalOutcome::Pruned(PruneReason::EvaluatorFailed(e.to_string())),
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                tracing::warn!(worker, node = %task.node, panic = %detail, "evaluation panicked");
                EvalOutcome::Pruned(PruneReason::WorkerFailure(detail))
            }
        };
        if let Some(budget) = task.timeout {
            if started.elapsed() > budget {
                outcome = EvalOutcome::Pruned(PruneReason::TimedOut { budget });
            }
        }

        if task
            .state
            .compare_exchange(RUNNING, FINISHED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            // A pruned node takes the solutions it reported with it.
            let reports = if let EvalOutcome::Scored(score) = &outcome {
                frontier.push(task.node, score.clone());
                reports.into_inner()
            } else {
                Vec::new()
            };
            if done
                .send(WorkerMessage::Finished {
                    task: task.id,
                    outcome,
                    reports,
                })
                .is_err()
            {
                return;
            }
        } else {
            late.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                worker,
                node = %task.node,
                late_outcome = ?outcome,
                elapsed = ?started.elapsed(),
                "discarding result of abandoned evaluation; worker retiring"
            );
            return;
        }
    }
    tracing::trace!(worker, "task channel closed; worker exiting");
}
