//! Completion registry records and aggregates.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{Job, JobError, JobId, JobStatus};

/// A finished job as stored in the completion registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub job_id: JobId,
    pub filename: String,
    pub arrived_at: DateTime<Utc>,
    pub worker_id: String,
    pub units: u32,
    pub completed_at: DateTime<Utc>,
    pub output_path: String,
    /// Stored as integer microseconds so the registry can order by it.
    /// Sub-microsecond precision is not preserved.
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub created_at: DateTime<Utc>,
}

impl RegistryRecord {
    /// Build the record for a completed job.
    pub fn from_job(job: &Job) -> Result<Self, JobError> {
        let (Some(worker_id), Some(completed_at)) = (&job.worker_id, job.completed_at) else {
            return Err(JobError::NotCompleted(job.id));
        };
        if job.status != JobStatus::Completed {
            return Err(JobError::NotCompleted(job.id));
        }

        Ok(Self {
            job_id: job.id,
            filename: job.filename.clone(),
            arrived_at: job.arrived_at,
            worker_id: worker_id.clone(),
            units: job.total_units,
            completed_at,
            output_path: job.output_path.clone(),
            created_at: Utc::now().trunc_subsecs(6),
        })
    }
}

/// Aggregates for one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatistics {
    pub worker_id: String,
    pub job_count: u64,
    pub total_units: u64,
}

/// Aggregates over the whole registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStatistics {
    pub total_jobs: u64,
    pub total_units: u64,
    pub workers: Vec<WorkerStatistics>,
}

impl RegistryStatistics {
    /// Build totals from per-worker rows so the rows always partition the totals.
    pub fn from_workers(mut workers: Vec<WorkerStatistics>) -> Self {
        workers.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        Self {
            total_jobs: workers.iter().map(|w| w.job_count).sum(),
            total_units: workers.iter().map(|w| w.total_units).sum(),
            workers,
        }
    }
}
