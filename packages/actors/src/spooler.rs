//! The `Spooler` facade: one handle over queue, hub, workers and registry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use db::CompletionRegistry;
use ractor::ActorRef;
use spool_core::{Discipline, Event, Job, JobId, MonitorSnapshot, Priority, QueuedJob};
use tokio::task::JoinHandle;

use crate::config::SpoolerConfig;
use crate::event_hub::{EventHub, SubscriberId, Subscription};
use crate::executor::PageExecutor;
use crate::messages::{SpoolerError, SpoolerResult, SupervisorMessage, call_result};
use crate::queue_actor::JobQueue;
use crate::shared::SharedState;
use crate::supervisor::{SupervisorArgs, start_supervisor};

/// A running print spooler.
///
/// ```ignore
/// let registry = CompletionRegistry::new(db::init(DbConfig::memory()).await?);
/// let printer = Arc::new(SimulatedPrinter::new(config.page_duration()));
/// let spooler = Spooler::start(&config, registry, printer).await?;
///
/// spooler.submit_job(job, 1)?;
/// let mut events = spooler.subscribe_job(job_id).await?;
/// ```
pub struct Spooler {
    supervisor: ActorRef<SupervisorMessage>,
    handle: JoinHandle<()>,
    queue: JobQueue,
    hub: EventHub,
    shared: Arc<SharedState>,
    registry: CompletionRegistry,
}

impl Spooler {
    /// Start the supervisor, queue, hub and `config.workers` workers.
    pub async fn start(
        config: &SpoolerConfig,
        registry: CompletionRegistry,
        executor: Arc<dyn PageExecutor>,
    ) -> SpoolerResult<Self> {
        config.validate()?;

        let shared = Arc::new(SharedState::new(config.discipline));
        let (supervisor, handle) = start_supervisor(SupervisorArgs {
            workers: config.workers,
            shared: shared.clone(),
            executor,
            registry: registry.clone(),
        })
        .await?;

        let (queue, hub) = call_result(
            ractor::rpc::call(
                &supervisor,
                |reply| SupervisorMessage::GetHandles { reply },
                Some(Duration::from_secs(5)),
            )
            .await,
        )?;

        tracing::info!(
            "Spooler started: {} worker(s), {} discipline",
            config.workers,
            config.discipline
        );

        Ok(Self {
            supervisor,
            handle,
            queue,
            hub,
            shared,
            registry,
        })
    }

    /// Queue a job. Returns as soon as the job is handed to the queue.
    pub fn submit_job(&self, job: Job, priority: impl Into<Priority>) -> SpoolerResult<()> {
        let priority = priority.into();
        tracing::info!("Submitting job {} ({}, priority {})", job.id, job.filename, priority);
        self.queue.enqueue(job, priority)
    }

    /// Switch the discipline and push a fresh snapshot to monitors.
    pub async fn set_discipline(&self, discipline: Discipline) -> SpoolerResult<Discipline> {
        let discipline = self.queue.set_discipline(discipline).await?;
        self.hub.refresh_monitor()?;
        Ok(discipline)
    }

    /// Switch by name. An unknown name leaves the discipline unchanged.
    pub async fn set_discipline_named(&self, name: &str) -> SpoolerResult<Discipline> {
        let discipline: Discipline = name.parse()?;
        self.set_discipline(discipline).await
    }

    pub fn discipline(&self) -> Discipline {
        self.shared.discipline()
    }

    /// Pending jobs in the order they would be dequeued.
    pub async fn snapshot(&self) -> SpoolerResult<Vec<QueuedJob>> {
        self.queue.snapshot().await
    }

    pub async fn subscribe_job(&self, job_id: JobId) -> SpoolerResult<Subscription<Event>> {
        self.hub.subscribe_job(job_id).await
    }

    pub fn unsubscribe_job(&self, job_id: JobId, subscriber: SubscriberId) -> SpoolerResult<()> {
        self.hub.unsubscribe_job(job_id, subscriber)
    }

    pub async fn subscribe_monitor(&self) -> SpoolerResult<Subscription<MonitorSnapshot>> {
        self.hub.subscribe_monitor().await
    }

    pub fn unsubscribe_monitor(&self, subscriber: SubscriberId) -> SpoolerResult<()> {
        self.hub.unsubscribe_monitor(subscriber)
    }

    /// Display status per worker, e.g. `printer-1 => printing <id>`.
    pub fn worker_states(&self) -> BTreeMap<String, String> {
        self.shared.worker_states()
    }

    /// Submitted jobs no worker has announced yet.
    pub fn queued_job_ids(&self) -> Vec<JobId> {
        self.shared.queued()
    }

    pub async fn failed_jobs(&self) -> SpoolerResult<Vec<Job>> {
        self.queue.failed_jobs().await
    }

    /// Forget the failed jobs kept in memory.
    pub async fn clear_failed_jobs(&self) -> SpoolerResult<usize> {
        self.queue.clear_failed().await
    }

    pub fn registry(&self) -> &CompletionRegistry {
        &self.registry
    }

    /// Stop all workers and wait for the supervisor to exit. Jobs still
    /// queued or printing are dropped.
    pub async fn shutdown(self) -> SpoolerResult<()> {
        self.supervisor
            .send_message(SupervisorMessage::Shutdown)?;
        self.handle
            .await
            .map_err(|e| SpoolerError::Actor(e.to_string()))?;
        tracing::info!("Spooler stopped");
        Ok(())
    }
}
