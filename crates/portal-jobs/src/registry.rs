// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent job registry with a background retention sweep.
//!
//! Each job is written only by the operation that created it, plus the sweep
//! which only removes terminal, expired entries. A [`DashMap`] gives per-entry
//! locking, so there is no global lock across distinct job ids and the sweep
//! never blocks callers for longer than a shard scan.
//!
//! Every mutator is a best-effort upsert: an unknown id is a silent no-op,
//! because progress callbacks may race with a caller that already dropped its
//! handle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use portal_core::UserId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::job::{Job, JobId, JobProgress, JobStatus};

/// Default retention window for terminal jobs.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Default interval between retention sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// In-process store of asynchronous job records.
///
/// Constructed once at process start and shared by handle (`Arc<JobRegistry>`)
/// with the operations that report progress and the inspection surface.
pub struct JobRegistry {
    jobs: DashMap<JobId, Job>,
    retention: chrono::Duration,
}

impl JobRegistry {
    /// Creates a registry with the default one-hour retention.
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Creates a registry that keeps terminal jobs for `retention`.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            retention: chrono::Duration::from_std(retention)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
        }
    }

    /// Registers a new `pending` job and returns its id.
    pub fn create(&self, kind: impl Into<String>, owner_id: Option<UserId>) -> JobId {
        let job = Job::new(kind, owner_id, Utc::now());
        let id = job.id.clone();
        debug!(job_id = %id, kind = %job.kind, "job created");
        self.jobs.insert(id.clone(), job);
        id
    }

    /// Moves a job to `status`. Terminal jobs never go back to
    /// `pending`/`running`.
    pub fn set_status(&self, id: &JobId, status: JobStatus) {
        if let Some(mut job) = self.jobs.get_mut(id) {
            let from = job.status;
            if !job.transition(status, Utc::now()) {
                debug!(job_id = %id, %from, to = %status, "ignoring transition out of terminal state");
            }
        }
    }

    /// Overwrites the job's progress counters.
    pub fn set_progress(&self, id: &JobId, current: u64, total: u64) {
        if let Some(mut job) = self.jobs.get_mut(id) {
            job.progress = Some(JobProgress::new(current, total));
        }
    }

    /// Stores the result payload and forces the job to `completed`.
    pub fn set_result(&self, id: &JobId, result: serde_json::Value) {
        if let Some(mut job) = self.jobs.get_mut(id) {
            job.result = Some(result);
            job.transition(JobStatus::Completed, Utc::now());
        }
    }

    /// Stores the error message and forces the job to `failed`.
    pub fn set_error(&self, id: &JobId, message: impl Into<String>) {
        if let Some(mut job) = self.jobs.get_mut(id) {
            job.error = Some(message.into());
            job.transition(JobStatus::Failed, Utc::now());
        }
    }

    /// Returns a copy of the job, if it is still registered.
    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.get(id).map(|job| job.value().clone())
    }

    /// Snapshot of every registered job, newest first.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|e| e.value().clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Number of registered jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the registry holds no jobs.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Removes terminal jobs completed more than the retention window before
    /// `now`. Returns how many were removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.jobs.len();
        let retention = self.retention;
        self.jobs.retain(|_, job| !job.is_expired(now, retention));
        before.saturating_sub(self.jobs.len())
    }

    /// Spawns the periodic retention sweep. Runs until `cancel` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            info!(interval_secs = interval.as_secs(), "job sweeper started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("job sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = registry.sweep_expired(Utc::now());
                        if removed > 0 {
                            info!(removed, remaining = registry.len(), "expired jobs swept");
                        }
                    }
                }
            }
        })
    }

    #[cfg(test)]
    fn backdate_completion(&self, id: &JobId, by: chrono::Duration) {
        if let Some(mut job) = self.jobs.get_mut(id)
            && let Some(done) = job.completed_at
        {
            job.completed_at = Some(done - by);
        }
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
