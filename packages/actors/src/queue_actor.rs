//! Queue actor: the single owner of pending jobs, waiting workers and leases.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use ractor::{Actor, ActorCell, ActorProcessingErr, ActorRef, RpcReplyPort};
use spool_core::{Discipline, Job, JobError, JobStatus, Priority, QueueEntry, QueuedJob};
use tokio::task::JoinHandle;

use crate::messages::{QueueMessage, SpoolerResult, call_result};
use crate::pending::PendingQueue;
use crate::shared::SharedState;

const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// A worker blocked in `Dequeue`.
struct Waiter {
    worker_id: String,
    reply: RpcReplyPort<(Job, Priority)>,
}

/// State for the queue actor.
pub struct QueueActorState {
    pending: PendingQueue,
    /// Served in the order they started waiting.
    waiters: VecDeque<Waiter>,
    /// Job held by each busy worker.
    leases: HashMap<String, Job>,
    failed: Vec<Job>,
    next_seq: u64,
    shared: Arc<SharedState>,
}

impl QueueActorState {
    pub fn new(shared: Arc<SharedState>) -> Self {
        Self {
            pending: PendingQueue::new(shared.discipline()),
            waiters: VecDeque::new(),
            leases: HashMap::new(),
            failed: Vec::new(),
            next_seq: 0,
            shared,
        }
    }

    fn enqueue(&mut self, mut job: Job, priority: Priority) {
        job.priority = priority;
        let seq = self.next_seq;
        self.next_seq += 1;

        self.shared.push_queued(job.id);
        self.pending.push(QueueEntry::new(priority, seq, job));
    }

    /// Hand pending jobs to waiting workers until one side runs out.
    fn dispatch_pending(&mut self) {
        while !self.pending.is_empty() {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            if waiter.reply.is_closed() {
                tracing::debug!("Skipping abandoned dequeue from {}", waiter.worker_id);
                continue;
            }
            let Some(entry) = self.pending.pop() else {
                self.waiters.push_front(waiter);
                break;
            };

            let mut job = entry.job.clone();
            if let Err(e) = job.start(&waiter.worker_id) {
                tracing::warn!("Dropping undispatchable job {}: {}", job.id, e);
                self.shared.remove_queued(job.id);
                self.waiters.push_front(waiter);
                continue;
            }

            let worker_id = waiter.worker_id;
            match waiter.reply.send((job.clone(), entry.priority)) {
                Ok(()) => {
                    tracing::debug!("Dispatched job {} to {}", job.id, worker_id);
                    self.leases.insert(worker_id, job);
                }
                Err(_) => {
                    tracing::debug!("Worker {} went away, keeping job {}", worker_id, job.id);
                    self.pending.restore(entry);
                }
            }
        }
    }

    fn set_discipline(&mut self, discipline: Discipline) {
        if self.pending.set_discipline(discipline) {
            tracing::info!(
                "Queue discipline set to {} ({} pending)",
                discipline,
                self.pending.len()
            );
        }
        self.shared.set_discipline(discipline);
    }

    fn record_progress(&mut self, worker_id: &str, units_done: u32) {
        let Some(job) = self.leases.get_mut(worker_id) else {
            tracing::warn!("Progress from {} without a lease", worker_id);
            return;
        };
        if let Err(e) = job.record_progress(units_done) {
            tracing::warn!("Ignoring progress from {}: {}", worker_id, e);
        }
    }

    fn finish(&mut self, worker_id: &str, job: Job) {
        match self.leases.remove(worker_id) {
            Some(leased) if leased.id == job.id => {}
            Some(leased) => {
                tracing::warn!(
                    "Worker {} finished {} but held a lease on {}",
                    worker_id,
                    job.id,
                    leased.id
                );
            }
            None => tracing::warn!("Worker {} finished {} without a lease", worker_id, job.id),
        }

        if job.status == JobStatus::Failed {
            self.failed.push(job);
        }
    }

    fn worker_lost(&mut self, worker_id: &str, reason: &str) -> Option<Job> {
        let mut job = self.leases.remove(worker_id)?;
        if let Err(e) = job.fail(format!("Worker {} lost: {}", worker_id, reason)) {
            tracing::warn!("Could not fail job {}: {}", job.id, e);
            return None;
        }
        self.failed.push(job.clone());
        Some(job)
    }
}

/// Queue actor that orders and dispatches jobs.
pub struct QueueActor;

impl Actor for QueueActor {
    type Msg = QueueMessage;
    type State = QueueActorState;
    type Arguments = QueueActorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting queue actor ({})", args.pending.discipline());
        Ok(args)
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            QueueMessage::Enqueue { job, priority } => {
                tracing::debug!("Enqueued job {} with priority {}", job.id, priority);
                state.enqueue(*job, priority);
                state.dispatch_pending();
            }

            QueueMessage::Dequeue { worker_id, reply } => {
                state.waiters.push_back(Waiter { worker_id, reply });
                state.dispatch_pending();
            }

            QueueMessage::Snapshot { reply } => {
                let _ = reply.send(state.pending.snapshot());
            }

            QueueMessage::SetDiscipline { discipline, reply } => {
                state.set_discipline(discipline);
                let _ = reply.send(discipline);
            }

            QueueMessage::Progress {
                worker_id,
                units_done,
            } => {
                state.record_progress(&worker_id, units_done);
            }

            QueueMessage::Finish { worker_id, job } => {
                state.finish(&worker_id, *job);
            }

            QueueMessage::WorkerLost {
                worker_id,
                reason,
                reply,
            } => {
                let _ = reply.send(state.worker_lost(&worker_id, &reason));
            }

            QueueMessage::FailedJobs { reply } => {
                let _ = reply.send(state.failed.clone());
            }

            QueueMessage::ClearFailed { reply } => {
                let cleared = state.failed.len();
                state.failed.clear();
                let _ = reply.send(cleared);
            }
        }

        Ok(())
    }
}

/// Handle to a running queue actor.
#[derive(Debug, Clone)]
pub struct JobQueue {
    actor: ActorRef<QueueMessage>,
}

impl JobQueue {
    /// Start a standalone queue actor.
    pub async fn spawn(shared: Arc<SharedState>) -> SpoolerResult<(Self, JoinHandle<()>)> {
        let (actor, handle) = Actor::spawn(None, QueueActor, QueueActorState::new(shared)).await?;
        Ok((Self { actor }, handle))
    }

    pub(crate) async fn spawn_linked(
        shared: Arc<SharedState>,
        supervisor: ActorCell,
    ) -> SpoolerResult<Self> {
        let (actor, _handle) =
            Actor::spawn_linked(None, QueueActor, QueueActorState::new(shared), supervisor)
                .await?;
        Ok(Self { actor })
    }

    pub fn actor(&self) -> &ActorRef<QueueMessage> {
        &self.actor
    }

    /// Add a queued job. Returns without waiting for the queue.
    pub fn enqueue(&self, job: Job, priority: impl Into<Priority>) -> SpoolerResult<()> {
        if job.status != JobStatus::Queued {
            return Err(JobError::InvalidTransition {
                job_id: job.id,
                from: job.status,
                to: JobStatus::Queued,
            }
            .into());
        }

        self.actor.send_message(QueueMessage::Enqueue {
            job: Box::new(job),
            priority: priority.into(),
        })?;
        Ok(())
    }

    /// Wait for the next job. The returned job is already `Printing` and
    /// leased to `worker_id`.
    pub async fn dequeue(&self, worker_id: &str) -> SpoolerResult<(Job, Priority)> {
        call_result(
            ractor::rpc::call(
                &self.actor,
                |reply| QueueMessage::Dequeue {
                    worker_id: worker_id.to_string(),
                    reply,
                },
                None,
            )
            .await,
        )
    }

    pub async fn snapshot(&self) -> SpoolerResult<Vec<QueuedJob>> {
        call_result(
            ractor::rpc::call(
                &self.actor,
                |reply| QueueMessage::Snapshot { reply },
                Some(RPC_TIMEOUT),
            )
            .await,
        )
    }

    /// Switch discipline. Every queue call made after this returns sees it.
    pub async fn set_discipline(&self, discipline: Discipline) -> SpoolerResult<Discipline> {
        call_result(
            ractor::rpc::call(
                &self.actor,
                |reply| QueueMessage::SetDiscipline { discipline, reply },
                Some(RPC_TIMEOUT),
            )
            .await,
        )
    }

    /// Record pages printed on the job leased to `worker_id`.
    pub fn record_progress(&self, worker_id: &str, units_done: u32) -> SpoolerResult<()> {
        self.actor.send_message(QueueMessage::Progress {
            worker_id: worker_id.to_string(),
            units_done,
        })?;
        Ok(())
    }

    /// Return a lease.
    pub fn finish(&self, worker_id: &str, job: Job) -> SpoolerResult<()> {
        self.actor.send_message(QueueMessage::Finish {
            worker_id: worker_id.to_string(),
            job: Box::new(job),
        })?;
        Ok(())
    }

    pub async fn worker_lost(&self, worker_id: &str, reason: &str) -> SpoolerResult<Option<Job>> {
        call_result(
            ractor::rpc::call(
                &self.actor,
                |reply| QueueMessage::WorkerLost {
                    worker_id: worker_id.to_string(),
                    reason: reason.to_string(),
                    reply,
                },
                Some(RPC_TIMEOUT),
            )
            .await,
        )
    }

    pub async fn failed_jobs(&self) -> SpoolerResult<Vec<Job>> {
        call_result(
            ractor::rpc::call(
                &self.actor,
                |reply| QueueMessage::FailedJobs { reply },
                Some(RPC_TIMEOUT),
            )
            .await,
        )
    }

    /// Drop the failed job list, returning how many jobs it held.
    pub async fn clear_failed(&self) -> SpoolerResult<usize> {
        call_result(
            ractor::rpc::call(
                &self.actor,
                |reply| QueueMessage::ClearFailed { reply },
                Some(RPC_TIMEOUT),
            )
            .await,
        )
    }

    pub fn stop(&self) {
        self.actor.stop(None);
    }
}
