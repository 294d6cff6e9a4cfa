//! Volatile in-memory job store.
//!
//! The store is the only resource shared between request-handling tasks and
//! worker tasks, so every operation must be atomic with respect to the job
//! id it touches. All reads hand out clones; writers replace the whole job
//! record (copy-on-update) rather than mutating shared state in place.

use crate::types::Job;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

/// Keyed collection of extraction jobs. Contents do not survive a restart.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: DashMap<Uuid, Job>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job. Returns `false` without mutation when a job with
    /// the same id already exists.
    pub fn insert(&self, job: Job) -> bool {
        match self.jobs.entry(job.id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(job);
                true
            }
        }
    }

    /// Replace an existing job. Returns `false` when no job with that id
    /// exists.
    pub fn update(&self, job: Job) -> bool {
        match self.jobs.entry(job.id()) {
            Entry::Occupied(mut slot) => {
                slot.insert(job);
                true
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Snapshot of a single job.
    pub fn find_by_id(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|entry| entry.value().clone())
    }

    /// Remove a job. Returns `false` when there was nothing to remove, which
    /// makes repeated removal idempotent rather than an error.
    pub fn remove_by_id(&self, id: Uuid) -> bool {
        self.jobs.remove(&id).is_some()
    }

    /// Snapshot of all jobs, in no particular order.
    pub fn find_all(&self) -> Vec<Job> {
        self.jobs.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Drop every job.
    pub fn remove_all(&self) {
        self.jobs.clear();
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
