// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Portal sync core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Numeric identifier of a portal user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned to a notification by the originating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub u64);

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of the single logical real-time connection of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionState {
    #[strum(serialize = "disconnected")]
    Disconnected,
    #[strum(serialize = "connecting")]
    Connecting,
    #[strum(serialize = "connected-unauthenticated")]
    ConnectedUnauthenticated,
    #[strum(serialize = "connected-authenticated")]
    ConnectedAuthenticated,
}

impl ConnectionState {
    /// Whether a transport is currently established, authenticated or not.
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            ConnectionState::ConnectedUnauthenticated | ConnectionState::ConnectedAuthenticated
        )
    }
}

/// Online/offline flag carried by incremental presence updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PresenceState {
    Online,
    Offline,
}

/// A notification record as delivered by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    /// Type tag, e.g. `task_assigned`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<u64>,
    pub message: String,
    /// Free-form metadata; may carry `link`, `title` and `description`.
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Whether the notification has been acknowledged.
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Navigation target stored in metadata, if any.
    pub fn link(&self) -> Option<&str> {
        self.metadata_str("link")
    }

    /// Presentational title, falling back to the message.
    pub fn title(&self) -> &str {
        self.metadata_str("title").unwrap_or(&self.message)
    }

    /// Presentational description stored in metadata, if any.
    pub fn description(&self) -> Option<&str> {
        self.metadata_str("description")
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}
