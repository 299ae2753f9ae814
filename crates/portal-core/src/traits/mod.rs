// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Portal sync core.
//!
//! The connection manager and liveness fallback only ever talk to the outside
//! world through these traits, so tests can inject deterministic fakes.

pub mod adapter;
pub mod api;
pub mod transport;

pub use adapter::PluginAdapter;
pub use api::PortalApi;
pub use transport::RealtimeTransport;
