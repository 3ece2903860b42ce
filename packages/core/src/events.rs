//! Event types for real-time updates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Discipline, JobId, QueuedJob};

/// What a worker reports about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerActivity {
    Printing,
    Idle,
}

/// Events emitted by workers, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A worker picked up a job or finished with it.
    WorkerStatus {
        worker_id: String,
        status: WorkerActivity,
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },
    /// A page of a job was printed.
    Progress {
        job_id: JobId,
        worker_id: String,
        units_done: u32,
        units_total: u32,
        timestamp: DateTime<Utc>,
    },
    /// A job will not complete.
    JobFailed {
        job_id: JobId,
        worker_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn printing(worker_id: impl Into<String>, job_id: JobId) -> Self {
        Event::WorkerStatus {
            worker_id: worker_id.into(),
            status: WorkerActivity::Printing,
            job_id,
            timestamp: Utc::now(),
        }
    }

    pub fn idle(worker_id: impl Into<String>, job_id: JobId) -> Self {
        Event::WorkerStatus {
            worker_id: worker_id.into(),
            status: WorkerActivity::Idle,
            job_id,
            timestamp: Utc::now(),
        }
    }

    pub fn progress(
        worker_id: impl Into<String>,
        job_id: JobId,
        units_done: u32,
        units_total: u32,
    ) -> Self {
        Event::Progress {
            job_id,
            worker_id: worker_id.into(),
            units_done,
            units_total,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(worker_id: impl Into<String>, job_id: JobId, reason: impl Into<String>) -> Self {
        Event::JobFailed {
            job_id,
            worker_id: worker_id.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::WorkerStatus { timestamp, .. } => *timestamp,
            Event::Progress { timestamp, .. } => *timestamp,
            Event::JobFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event.
    pub fn job_id(&self) -> JobId {
        match self {
            Event::WorkerStatus { job_id, .. } => *job_id,
            Event::Progress { job_id, .. } => *job_id,
            Event::JobFailed { job_id, .. } => *job_id,
        }
    }

    pub fn worker_id(&self) -> &str {
        match self {
            Event::WorkerStatus { worker_id, .. } => worker_id,
            Event::Progress { worker_id, .. } => worker_id,
            Event::JobFailed { worker_id, .. } => worker_id,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            Event::WorkerStatus {
                worker_id,
                status: WorkerActivity::Printing,
                job_id,
                ..
            } => format!("Worker {} printing {}", worker_id, job_id),
            Event::WorkerStatus {
                worker_id,
                status: WorkerActivity::Idle,
                job_id,
                ..
            } => format!("Worker {} idle after {}", worker_id, job_id),
            Event::Progress {
                job_id,
                units_done,
                units_total,
                ..
            } => format!("Job {} page {}/{}", job_id, units_done, units_total),
            Event::JobFailed { job_id, reason, .. } => {
                format!("Job {} failed: {}", job_id, reason)
            }
        }
    }
}

/// Per-worker status shown on the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Idle,
    Printing(JobId),
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Idle => write!(f, "idle"),
            WorkerState::Printing(job_id) => write!(f, "printing {}", job_id),
        }
    }
}

/// Payload delivered to monitor subscribers after every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub queue: Vec<QueuedJob>,
    pub workers: BTreeMap<String, String>,
    pub discipline: Discipline,
}
