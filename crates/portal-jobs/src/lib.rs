// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job registry for long-running asynchronous operations.
//!
//! Operations that start background work register a job, report progress
//! through the registry, and finish it with a result or an error. The
//! inspection surface (the gateway's status-polling endpoints) reads
//! snapshots. Terminal jobs are swept after a retention window.

pub mod job;
pub mod registry;

pub use job::{Job, JobId, JobProgress, JobStatus};
pub use registry::{JobRegistry, DEFAULT_RETENTION, DEFAULT_SWEEP_INTERVAL};
