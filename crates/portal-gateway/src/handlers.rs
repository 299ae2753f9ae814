// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles GET /health, GET /v1/jobs, GET /v1/jobs/{id}.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use portal_jobs::{Job, JobId};
use serde::Serialize;

use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
    /// Seconds since the gateway started.
    pub uptime_secs: u64,
    /// Number of jobs currently held by the registry.
    pub jobs: usize,
}

/// Response body for GET /v1/jobs.
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    /// Jobs, newest first.
    pub jobs: Vec<Job>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// GET /health
///
/// Unauthenticated liveness endpoint for systemd and load balancers.
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        jobs: state.registry.len(),
    })
}

/// GET /v1/jobs
pub async fn list_jobs(State(state): State<GatewayState>) -> Json<JobListResponse> {
    Json(JobListResponse {
        jobs: state.registry.list(),
    })
}

/// GET /v1/jobs/{id}
pub async fn get_job(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    match state.registry.get(&JobId(id.clone())) {
        Some(job) => (StatusCode::OK, Json(job)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("job {id} not found"),
            }),
        )
            .into_response(),
    }
}
