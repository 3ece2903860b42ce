//! Worker actor for printing jobs.

use std::sync::Arc;

use chrono::Utc;
use db::{CompletionRegistry, DbError};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use spool_core::{Event, Job, RegistryRecord, WorkerState};

use crate::event_hub::EventHub;
use crate::executor::PageExecutor;
use crate::messages::WorkerMessage;
use crate::queue_actor::JobQueue;
use crate::shared::SharedState;

/// Worker actor arguments. Kept by the supervisor to restart a lost worker.
#[derive(Clone)]
pub struct WorkerArgs {
    pub worker_id: String,
    pub queue: JobQueue,
    pub hub: EventHub,
    pub shared: Arc<SharedState>,
    pub executor: Arc<dyn PageExecutor>,
    pub registry: CompletionRegistry,
}

/// State for the worker actor.
pub struct WorkerActorState {
    args: WorkerArgs,
    /// Jobs this worker has finished, completed or failed.
    finished: u64,
}

impl WorkerActorState {
    fn worker_id(&self) -> &str {
        &self.args.worker_id
    }

    fn set_state(&self, state: WorkerState) {
        self.args.shared.set_worker_state(&self.args.worker_id, state);
    }

    /// Print a dequeued job page by page, then hand it back to the queue.
    async fn print(&mut self, mut job: Job) -> Result<(), ActorProcessingErr> {
        let worker_id = self.args.worker_id.clone();
        let hub = self.args.hub.clone();

        self.set_state(WorkerState::Printing(job.id));
        hub.publish(Event::printing(&worker_id, job.id))?;

        for page in 1..=job.total_units {
            if let Err(reason) = self.args.executor.print_page(&job, page).await {
                tracing::warn!(
                    "Worker {} failed job {} on page {}: {}",
                    worker_id,
                    job.id,
                    page,
                    reason
                );
                job.fail(reason.clone())?;
                hub.publish(Event::failed(&worker_id, job.id, reason))?;
                hub.publish(Event::idle(&worker_id, job.id))?;
                self.set_state(WorkerState::Idle);
                self.args.queue.finish(&worker_id, job)?;
                self.finished += 1;
                return Ok(());
            }

            job.record_progress(page)?;
            self.args.queue.record_progress(&worker_id, page)?;
            hub.publish(Event::progress(&worker_id, job.id, page, job.total_units))?;
        }

        hub.publish(Event::idle(&worker_id, job.id))?;
        self.set_state(WorkerState::Idle);

        job.complete(Utc::now())?;
        let record = RegistryRecord::from_job(&job)?;
        self.args.queue.finish(&worker_id, job)?;
        self.finished += 1;

        match self.args.registry.register(&record).await {
            Ok(()) => tracing::info!("Worker {} completed job {}", worker_id, record.job_id),
            Err(DbError::DuplicateJob(job_id)) => {
                tracing::warn!("Job {} was already registered", job_id);
            }
            Err(e) => tracing::warn!("Failed to register job {}: {}", record.job_id, e),
        }

        Ok(())
    }
}

/// Worker actor that prints one job at a time.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting worker: {}", args.worker_id);

        let state = WorkerActorState { args, finished: 0 };
        state.set_state(WorkerState::Idle);
        Ok(state)
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        myself.send_message(WorkerMessage::Next)?;
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Next => {
                let (job, priority) = match state.args.queue.dequeue(state.worker_id()).await {
                    Ok(next) => next,
                    Err(e) => {
                        tracing::info!("Worker {} stopping: {}", state.worker_id(), e);
                        myself.stop(None);
                        return Ok(());
                    }
                };

                tracing::info!(
                    "Worker {} printing {} ({} pages, priority {})",
                    state.worker_id(),
                    job.filename,
                    job.total_units,
                    priority
                );
                state.print(job).await?;
                myself.send_message(WorkerMessage::Next)?;
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!(
            "Worker {} stopped after {} job(s)",
            state.worker_id(),
            state.finished
        );
        Ok(())
    }
}
