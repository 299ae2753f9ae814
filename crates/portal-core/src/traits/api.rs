// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response API used for bulk fetches and out-of-band commands.

use async_trait::async_trait;

use crate::error::PortalError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Notification, NotificationId};

/// Authenticated request/response endpoints of the portal backend.
///
/// All calls carry the session's bearer token. Callers treat every method as
/// best-effort.
#[async_trait]
pub trait PortalApi: PluginAdapter {
    /// Lists the most recent notifications, at most `limit` entries.
    async fn fetch_notifications(&self, limit: usize) -> Result<Vec<Notification>, PortalError>;

    /// Marks one notification as read on the server.
    async fn acknowledge(&self, id: NotificationId) -> Result<(), PortalError>;

    /// Marks every notification of the user as read on the server.
    async fn acknowledge_all(&self) -> Result<(), PortalError>;

    /// Out-of-band liveness ping, used while the real-time connection is down.
    async fn ping(&self) -> Result<(), PortalError>;
}
