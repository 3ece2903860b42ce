//! Core domain types for the print spooler.
//!
//! This crate contains shared types used across all packages:
//! - Job and JobStatus for print jobs
//! - Discipline and QueueEntry for the job queue
//! - Events and monitor snapshots for real-time updates
//! - Registry records and statistics for finished jobs

mod events;
mod job;
mod queue;
mod record;

pub use events::{Event, MonitorSnapshot, WorkerActivity, WorkerState};
pub use job::{Job, JobError, JobId, JobStatus, Priority};
pub use queue::{Discipline, InvalidDiscipline, QueueEntry, QueuedJob};
pub use record::{RegistryRecord, RegistryStatistics, WorkerStatistics};
