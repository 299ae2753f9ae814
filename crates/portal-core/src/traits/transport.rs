// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time transport trait (WebSocket in production, mocks in tests).

use async_trait::async_trait;

use crate::error::PortalError;
use crate::events::{ClientEvent, ServerEvent};
use crate::traits::adapter::PluginAdapter;

/// A bidirectional event channel to the sync server.
///
/// A transport may be connected, dropped and connected again any number of
/// times; the connection manager owns exactly one transport per session.
#[async_trait]
pub trait RealtimeTransport: PluginAdapter {
    /// Establishes the underlying connection. Replaces any previous one.
    async fn connect(&mut self) -> Result<(), PortalError>;

    /// Sends one event to the server.
    async fn send(&mut self, event: ClientEvent) -> Result<(), PortalError>;

    /// Waits for the next server event.
    ///
    /// Returns `Err` when the connection drops. Must be cancel-safe: the
    /// connection manager polls it inside `tokio::select!`.
    async fn recv(&mut self) -> Result<ServerEvent, PortalError>;

    /// Closes the connection. Closing a closed transport is a no-op.
    async fn close(&mut self) -> Result<(), PortalError>;

    /// Whether a connection is currently established.
    fn is_connected(&self) -> bool;
}
