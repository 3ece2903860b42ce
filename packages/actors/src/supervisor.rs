//! Supervisor actor owning the queue, the event hub and the worker pool.

use std::collections::HashMap;
use std::sync::Arc;

use db::CompletionRegistry;
use ractor::{Actor, ActorId, ActorProcessingErr, ActorRef, SpawnErr, SupervisionEvent};
use spool_core::{Event, WorkerState};
use tokio::task::JoinHandle;

use crate::event_hub::EventHub;
use crate::executor::PageExecutor;
use crate::messages::{SupervisorMessage, WorkerMessage};
use crate::queue_actor::JobQueue;
use crate::shared::SharedState;
use crate::worker_actor::{WorkerActor, WorkerArgs};

/// Supervisor arguments.
pub struct SupervisorArgs {
    /// Number of workers, named `printer-1` upwards.
    pub workers: usize,
    pub shared: Arc<SharedState>,
    pub executor: Arc<dyn PageExecutor>,
    pub registry: CompletionRegistry,
}

/// State for the supervisor actor.
pub struct SupervisorState {
    queue: JobQueue,
    hub: EventHub,
    /// Live workers and the arguments to restart them with.
    workers: HashMap<ActorId, (ActorRef<WorkerMessage>, WorkerArgs)>,
    shutting_down: bool,
}

impl SupervisorState {
    fn stop_children(&mut self) {
        self.shutting_down = true;
        for (worker, _) in self.workers.values() {
            worker.kill();
        }
        self.queue.stop();
        self.hub.stop();
    }

    /// Fail the lost worker's job and put a fresh worker in its place.
    async fn replace_worker(
        &mut self,
        myself: &ActorRef<SupervisorMessage>,
        args: WorkerArgs,
        reason: String,
    ) -> Result<(), ActorProcessingErr> {
        tracing::error!("Worker {} lost: {}", args.worker_id, reason);

        match self.queue.worker_lost(&args.worker_id, &reason).await {
            Ok(Some(job)) => {
                tracing::warn!("Job {} failed with worker {}", job.id, args.worker_id);
                let failure = job.failure.clone().unwrap_or(reason);
                self.hub
                    .publish(Event::failed(&args.worker_id, job.id, failure))?;
                self.hub.publish(Event::idle(&args.worker_id, job.id))?;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not release lease of {}: {}", args.worker_id, e),
        }
        args.shared
            .set_worker_state(&args.worker_id, WorkerState::Idle);

        let worker = spawn_worker(myself, args.clone()).await?;
        self.workers.insert(worker.get_id(), (worker, args));
        Ok(())
    }
}

async fn spawn_worker(
    myself: &ActorRef<SupervisorMessage>,
    args: WorkerArgs,
) -> Result<ActorRef<WorkerMessage>, SpawnErr> {
    let (worker, _handle) =
        Actor::spawn_linked(None, WorkerActor, args, myself.get_cell()).await?;
    Ok(worker)
}

/// Supervisor actor for one spooler.
pub struct Supervisor;

impl Actor for Supervisor {
    type Msg = SupervisorMessage;
    type State = SupervisorState;
    type Arguments = SupervisorArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting spooler supervisor with {} worker(s)", args.workers);

        let queue = JobQueue::spawn_linked(args.shared.clone(), myself.get_cell()).await?;
        let hub =
            EventHub::spawn_linked(queue.clone(), args.shared.clone(), myself.get_cell()).await?;

        let mut workers = HashMap::new();
        for n in 1..=args.workers {
            let worker_args = WorkerArgs {
                worker_id: format!("printer-{}", n),
                queue: queue.clone(),
                hub: hub.clone(),
                shared: args.shared.clone(),
                executor: args.executor.clone(),
                registry: args.registry.clone(),
            };
            let worker = spawn_worker(&myself, worker_args.clone()).await?;
            workers.insert(worker.get_id(), (worker, worker_args));
        }

        Ok(SupervisorState {
            queue,
            hub,
            workers,
            shutting_down: false,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisorMessage::GetHandles { reply } => {
                let _ = reply.send((state.queue.clone(), state.hub.clone()));
            }

            SupervisorMessage::Shutdown => {
                tracing::info!("Shutting down spooler");
                state.stop_children();
                myself.stop(None);
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisionEvent::ActorFailed(cell, err) => {
                match state.workers.remove(&cell.get_id()) {
                    Some(_) if state.shutting_down => {}
                    Some((_, args)) => {
                        state.replace_worker(&myself, args, err.to_string()).await?;
                    }
                    None => {
                        tracing::error!("Spooler actor {} failed: {}", cell.get_id(), err);
                        state.stop_children();
                        myself.stop(Some(err.to_string()));
                    }
                }
            }

            SupervisionEvent::ActorTerminated(cell, _, reason) => {
                if let Some((_, args)) = state.workers.remove(&cell.get_id()) {
                    tracing::info!("Worker {} terminated: {:?}", args.worker_id, reason);
                } else if !state.shutting_down {
                    tracing::error!("Spooler actor {} terminated: {:?}", cell.get_id(), reason);
                    state.stop_children();
                    myself.stop(reason);
                }
            }

            _ => {}
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if !state.shutting_down {
            state.stop_children();
        }
        tracing::info!("Spooler supervisor stopped");
        Ok(())
    }
}

/// Start a supervisor with its queue, hub and workers.
pub async fn start_supervisor(
    args: SupervisorArgs,
) -> Result<(ActorRef<SupervisorMessage>, JoinHandle<()>), SpawnErr> {
    Actor::spawn(None, Supervisor, args).await
}
