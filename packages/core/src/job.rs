//! Print job domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling priority. Lower values are served first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub const DEFAULT: Priority = Priority(1);
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current status of a job in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue.
    #[default]
    Queued,
    /// Owned by a worker and being printed.
    Printing,
    /// All pages printed.
    Completed,
    /// The worker lost the job or a page could not be printed.
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `next` is a legal forward step from this status.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Printing)
                | (JobStatus::Printing, JobStatus::Completed)
                | (JobStatus::Printing, JobStatus::Failed)
        )
    }

    /// Get a simple status string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Printing => "printing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by job state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {job_id} cannot report {units_done} of {units_total} pages")]
    InvalidProgress {
        job_id: JobId,
        units_done: u32,
        units_total: u32,
    },

    #[error("Job {0} has not completed")]
    NotCompleted(JobId),
}

/// A print job: one uploaded document, printed page by page by one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Identifier assigned by the front end before submission.
    pub id: JobId,
    /// Original file name, used for display.
    pub filename: String,
    /// Where the uploaded artifact is stored.
    pub source_path: String,
    /// Execution priority.
    pub priority: Priority,
    /// Number of pages to print.
    pub total_units: u32,
    /// Pages printed so far.
    #[serde(default)]
    pub units_done: u32,
    /// Current status.
    pub status: JobStatus,
    /// When the job was accepted.
    pub arrived_at: DateTime<Utc>,
    /// Worker that owns the job, set on dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Where the printed artifact can be retrieved.
    pub output_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Job {
    /// Create a new queued job. A page count of zero is treated as one page.
    pub fn new(
        id: JobId,
        filename: impl Into<String>,
        source_path: impl Into<String>,
        total_units: u32,
    ) -> Self {
        let source_path = source_path.into();
        Self {
            id,
            filename: filename.into(),
            output_path: source_path.clone(),
            source_path,
            priority: Priority::default(),
            total_units: total_units.max(1),
            units_done: 0,
            status: JobStatus::Queued,
            arrived_at: Utc::now(),
            worker_id: None,
            started_at: None,
            completed_at: None,
            failure: None,
        }
    }

    /// Set the priority for this job.
    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Set where the printed artifact will be available.
    pub fn with_output_path(mut self, output_path: impl Into<String>) -> Self {
        self.output_path = output_path.into();
        self
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                job_id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Hand the job to a worker.
    pub fn start(&mut self, worker_id: &str) -> Result<(), JobError> {
        self.transition(JobStatus::Printing)?;
        self.worker_id = Some(worker_id.to_string());
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Record that `units_done` pages are printed. Progress never goes backwards.
    pub fn record_progress(&mut self, units_done: u32) -> Result<(), JobError> {
        if self.status != JobStatus::Printing
            || units_done < self.units_done
            || units_done > self.total_units
        {
            return Err(JobError::InvalidProgress {
                job_id: self.id,
                units_done,
                units_total: self.total_units,
            });
        }
        self.units_done = units_done;
        Ok(())
    }

    /// Mark the job as fully printed.
    pub fn complete(&mut self, completed_at: DateTime<Utc>) -> Result<(), JobError> {
        self.transition(JobStatus::Completed)?;
        self.units_done = self.total_units;
        self.completed_at = Some(completed_at);
        Ok(())
    }

    /// Mark the job as failed.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), JobError> {
        self.transition(JobStatus::Failed)?;
        self.failure = Some(reason.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}
