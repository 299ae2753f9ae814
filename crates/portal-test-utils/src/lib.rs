// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Portal integration tests.
//!
//! Provides mock adapters and fixtures for fast, deterministic, CI-runnable
//! tests without a sync server.
//!
//! # Components
//!
//! - [`MockTransport`] - Scripted real-time transport with event injection and capture
//! - [`MockApi`] - Mock request/response API with canned notifications and call recording
//! - [`fixtures`] - Sample notifications and a fast-reconnect configuration

pub mod fixtures;
pub mod mock_api;
pub mod mock_transport;

pub use mock_api::MockApi;
pub use mock_transport::{AuthReply, MockTransport};
