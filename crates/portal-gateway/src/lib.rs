// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Job Registry inspection.
//!
//! Long-running operations register jobs in a shared [`portal_jobs::JobRegistry`];
//! clients poll their status through this gateway. Inspection routes live
//! under `/v1` behind bearer auth, and `/health` stays public.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{GatewayState, HealthState, ServerConfig, router, start_server};
