// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job record types and their lifecycle rules.

use chrono::{DateTime, Utc};
use portal_core::UserId;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque, immutable job identifier (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        JobId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Progress counters with the derived percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub current: u64,
    pub total: u64,
    pub percentage: u32,
}

impl JobProgress {
    /// Builds progress, deriving `percentage = round(current / total * 100)`,
    /// or 0 when `total` is 0.
    pub fn new(current: u64, total: u64) -> Self {
        Self {
            current,
            total,
            percentage: percentage(current, total),
        }
    }
}

fn percentage(current: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = (current as f64 / total as f64 * 100.0).round();
    pct.min(u32::MAX as f64) as u32
}

/// A tracked asynchronous operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub kind: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
}

impl Job {
    /// A fresh job in `pending`.
    pub fn new(kind: impl Into<String>, owner_id: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            kind: kind.into(),
            status: JobStatus::Pending,
            progress: None,
            result: None,
            error: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            owner_id,
        }
    }

    /// Moves the job to `status`, stamping `started_at` / `completed_at` on the
    /// first entry into `running` / a terminal state.
    ///
    /// Returns `false` (and leaves the job untouched) when the move would take
    /// a terminal job back to `pending` or `running`.
    pub fn transition(&mut self, status: JobStatus, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() && !status.is_terminal() {
            return false;
        }
        self.status = status;
        match status {
            JobStatus::Running => {
                self.started_at.get_or_insert(now);
            }
            JobStatus::Completed | JobStatus::Failed => {
                self.completed_at.get_or_insert(now);
            }
            JobStatus::Pending => {}
        }
        true
    }

    /// Whether the job is terminal and finished more than `retention` before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        if !self.status.is_terminal() {
            return false;
        }
        match self.completed_at {
            Some(done) => now - done > retention,
            None => false,
        }
    }
}
