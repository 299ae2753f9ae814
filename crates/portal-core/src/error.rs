// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Portal sync core.

use thiserror::Error;

/// The primary error type used across all Portal adapter traits and core operations.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Real-time transport errors (connect failure, dropped socket, send failure).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The server rejected the authentication handshake for the current token.
    #[error("authentication rejected: {reason}")]
    AuthRejected { reason: String },

    /// Reconnect attempts were exhausted; the session is degraded.
    #[error("reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },

    /// Request/response API errors (HTTP failure, unexpected status, bad body).
    #[error("api error: {message}")]
    Api {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A frame arrived that does not match the event protocol.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },
}

impl PortalError {
    /// Build a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        PortalError::Transport {
            message: message.into(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Protocol {
            message: err.to_string(),
        }
    }
}
