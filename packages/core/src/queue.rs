//! Queue domain types: ordering discipline and queue entries.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Job, JobId, Priority};

/// Ordering policy for dequeue and snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    /// Strict arrival order, priority ignored.
    #[default]
    Fifo,
    /// Ascending priority value, ties broken by arrival.
    Priority,
}

impl Discipline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Discipline::Fifo => "fifo",
            Discipline::Priority => "priority",
        }
    }
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a discipline name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid discipline '{0}', expected 'fifo' or 'priority'")]
pub struct InvalidDiscipline(pub String);

impl FromStr for Discipline {
    type Err = InvalidDiscipline;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fifo" => Ok(Discipline::Fifo),
            "priority" => Ok(Discipline::Priority),
            _ => Err(InvalidDiscipline(s.to_string())),
        }
    }
}

/// A job waiting in the queue.
///
/// `seq` is a logical arrival counter assigned by the queue. It is only a
/// tie-break and is never shown to observers.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub priority: Priority,
    pub seq: u64,
    pub job: Job,
}

impl QueueEntry {
    pub fn new(priority: Priority, seq: u64, job: Job) -> Self {
        Self { priority, seq, job }
    }

    /// Display view of this entry.
    pub fn view(&self) -> QueuedJob {
        QueuedJob {
            job_id: self.job.id,
            priority: self.priority,
            arrived_at: self.job.arrived_at,
            filename: self.job.filename.clone(),
        }
    }
}

// Entries compare by (priority, seq); seq is unique per queue.
impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// One row of a queue snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub priority: Priority,
    pub arrived_at: DateTime<Utc>,
    pub filename: String,
}
