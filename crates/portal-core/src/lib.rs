// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Portal real-time sync core.
//!
//! This crate provides the error type, shared identifiers, the typed wire
//! events, and the adapter traits through which the sync core reaches the
//! network. Transports and API clients implement traits defined here.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PortalError;
pub use events::{ClientEvent, ServerEvent};
pub use types::{ConnectionState, Notification, NotificationId, PresenceState, UserId};

pub use traits::{PluginAdapter, PortalApi, RealtimeTransport};
