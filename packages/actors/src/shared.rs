//! State shared between the queue owner, the workers and the event hub.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use spool_core::{Discipline, JobId, WorkerState};

/// Discipline, per-worker status and the "still queued" view.
///
/// Each method is one locked operation. The discipline is written only by
/// the queue actor while it applies a switch.
#[derive(Debug, Default)]
pub struct SharedState {
    discipline: RwLock<Discipline>,
    workers: RwLock<BTreeMap<String, WorkerState>>,
    queued: RwLock<Vec<JobId>>,
}

impl SharedState {
    pub fn new(discipline: Discipline) -> Self {
        Self {
            discipline: RwLock::new(discipline),
            ..Default::default()
        }
    }

    /// Active discipline.
    pub fn discipline(&self) -> Discipline {
        *self
            .discipline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_discipline(&self, discipline: Discipline) {
        *self
            .discipline
            .write()
            .unwrap_or_else(PoisonError::into_inner) = discipline;
    }

    /// Display status of every known worker.
    pub fn worker_states(&self) -> BTreeMap<String, String> {
        self.workers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, state)| (id.clone(), state.to_string()))
            .collect()
    }

    pub fn worker_state(&self, worker_id: &str) -> Option<WorkerState> {
        self.workers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(worker_id)
            .copied()
    }

    pub(crate) fn set_worker_state(&self, worker_id: &str, state: WorkerState) {
        self.workers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(worker_id.to_string(), state);
    }

    pub(crate) fn push_queued(&self, job_id: JobId) {
        self.queued
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job_id);
    }

    /// Drop a job from the queued view. Removing an absent id is a no-op.
    pub(crate) fn remove_queued(&self, job_id: JobId) -> bool {
        let mut queued = self.queued.write().unwrap_or_else(PoisonError::into_inner);
        match queued.iter().position(|id| *id == job_id) {
            Some(index) => {
                queued.remove(index);
                true
            }
            None => false,
        }
    }

    /// Ids submitted but not yet picked up, in submission order.
    pub fn queued(&self) -> Vec<JobId> {
        self.queued
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
