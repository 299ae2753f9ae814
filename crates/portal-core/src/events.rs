// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed real-time events exchanged with the sync server.
//!
//! Every frame is a JSON envelope:
//! ```json
//! {"event": "presence:update", "data": {"userId": 3, "state": "online"}}
//! ```
//!
//! Server -> client: `auth:ok`, `auth:error`, `presence:update`,
//! `presence:snapshot`, `notification:new`.
//! Client -> server: `auth:init`, `presence:ping`.

use serde::{Deserialize, Serialize};

use crate::error::PortalError;
use crate::types::{Notification, PresenceState, UserId};

/// An event pushed by the server over the real-time transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// The authentication handshake was accepted.
    #[serde(rename = "auth:ok")]
    AuthOk,

    /// The authentication handshake was rejected.
    #[serde(rename = "auth:error")]
    AuthError { message: String },

    /// A single user's presence changed.
    #[serde(rename = "presence:update")]
    PresenceUpdate {
        #[serde(rename = "userId")]
        user_id: UserId,
        state: PresenceState,
    },

    /// Full enumeration of currently-online users.
    #[serde(rename = "presence:snapshot")]
    PresenceSnapshot { users: Vec<UserId> },

    /// A notification was created for the session's user.
    #[serde(rename = "notification:new")]
    NotificationNew(Notification),
}

impl ServerEvent {
    /// Parse a text frame into a typed event.
    pub fn from_frame(frame: &str) -> Result<Self, PortalError> {
        Ok(serde_json::from_str(frame)?)
    }

    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::AuthOk => "auth:ok",
            ServerEvent::AuthError { .. } => "auth:error",
            ServerEvent::PresenceUpdate { .. } => "presence:update",
            ServerEvent::PresenceSnapshot { .. } => "presence:snapshot",
            ServerEvent::NotificationNew(_) => "notification:new",
        }
    }
}

/// An event emitted by the client over the real-time transport.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Authentication handshake carrying the bearer token.
    #[serde(rename = "auth:init")]
    AuthInit { token: String },

    /// Liveness probe.
    #[serde(rename = "presence:ping")]
    PresencePing,
}

impl ClientEvent {
    /// Encode the event as a text frame.
    pub fn to_frame(&self) -> Result<String, PortalError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl std::fmt::Debug for ClientEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientEvent::AuthInit { .. } => f
                .debug_struct("AuthInit")
                .field("token", &"[redacted]")
                .finish(),
            ClientEvent::PresencePing => f.write_str("PresencePing"),
        }
    }
}
