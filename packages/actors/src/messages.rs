//! Message types for actor communication.

use db::DbError;
use ractor::rpc::CallResult;
use ractor::{MessagingErr, RpcReplyPort, SpawnErr};
use spool_core::{
    Discipline, Event, InvalidDiscipline, Job, JobError, JobId, MonitorSnapshot, Priority,
    QueuedJob,
};

use crate::config::ConfigError;
use crate::event_hub::{EventHub, SubscriberId, Subscription};
use crate::queue_actor::JobQueue;

/// Messages for the QueueActor.
#[derive(Debug)]
pub enum QueueMessage {
    /// Add a job. Fire and forget.
    Enqueue { job: Box<Job>, priority: Priority },

    /// Wait for the next job. The reply is held until a job is available.
    Dequeue {
        worker_id: String,
        reply: RpcReplyPort<(Job, Priority)>,
    },

    /// Pending jobs in dequeue order.
    Snapshot { reply: RpcReplyPort<Vec<QueuedJob>> },

    /// Switch the ordering discipline.
    SetDiscipline {
        discipline: Discipline,
        reply: RpcReplyPort<Discipline>,
    },

    /// Pages printed so far on a leased job.
    Progress { worker_id: String, units_done: u32 },

    /// A worker is done with its leased job, completed or failed.
    Finish { worker_id: String, job: Box<Job> },

    /// A worker died. Its leased job, if any, is failed and returned.
    WorkerLost {
        worker_id: String,
        reason: String,
        reply: RpcReplyPort<Option<Job>>,
    },

    /// Jobs that ended in `Failed`.
    FailedJobs { reply: RpcReplyPort<Vec<Job>> },

    /// Forget failed jobs. Replies with how many were dropped.
    ClearFailed { reply: RpcReplyPort<usize> },
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Take the next job from the queue and print it.
    Next,
}

/// Messages for the EventHubActor.
#[derive(Debug)]
pub enum HubMessage {
    /// An event emitted by a worker.
    Publish(Box<Event>),

    SubscribeJob {
        job_id: JobId,
        reply: RpcReplyPort<Subscription<Event>>,
    },

    UnsubscribeJob {
        job_id: JobId,
        subscriber: SubscriberId,
    },

    SubscribeMonitor {
        reply: RpcReplyPort<Subscription<MonitorSnapshot>>,
    },

    UnsubscribeMonitor { subscriber: SubscriberId },

    /// Push a fresh snapshot to every monitor.
    RefreshMonitor,
}

/// Messages for the Supervisor.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Handles to the queue and hub owned by this supervisor.
    GetHandles {
        reply: RpcReplyPort<(JobQueue, EventHub)>,
    },

    /// Stop every worker, then the queue and hub.
    Shutdown,
}

/// Result type for spooler operations.
pub type SpoolerResult<T> = Result<T, SpoolerError>;

/// Error type for spooler operations.
#[derive(Debug, thiserror::Error)]
pub enum SpoolerError {
    #[error(transparent)]
    InvalidDiscipline(#[from] InvalidDiscipline),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Actor error: {0}")]
    Actor(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Failed to spawn actor: {0}")]
    Spawn(#[from] SpawnErr),

    #[error("Timeout")]
    Timeout,
}

impl<T: std::fmt::Debug> From<MessagingErr<T>> for SpoolerError {
    fn from(err: MessagingErr<T>) -> Self {
        SpoolerError::Actor(err.to_string())
    }
}

/// Unwrap the outcome of `ractor::rpc::call`.
pub(crate) fn call_result<T, M: std::fmt::Debug>(
    result: Result<CallResult<T>, MessagingErr<M>>,
) -> SpoolerResult<T> {
    match result? {
        CallResult::Success(value) => Ok(value),
        CallResult::Timeout => Err(SpoolerError::Timeout),
        CallResult::SenderError => Err(SpoolerError::Actor("Reply channel closed".into())),
    }
}
