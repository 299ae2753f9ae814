// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time synchronization for the Portal client.
//!
//! One session keeps a single WebSocket connection to the sync server,
//! authenticates it with the session token, and reconnects with bounded
//! backoff when it drops. Server events feed two pieces of state:
//!
//! - [`PresenceAggregator`]: which users are online.
//! - [`NotificationChannel`]: a capped, deduplicated notification buffer.
//!
//! A liveness fallback keeps the user marked present over plain HTTP while
//! the connection is down. [`SyncClient`] guarantees at most one session runs
//! at a time.

pub mod connection;
pub mod http;
mod liveness;
pub mod notifications;
pub mod presence;
pub mod session;
pub mod ws;

pub use connection::{ReconnectPolicy, SessionEvent};
pub use http::HttpPortalApi;
pub use notifications::{NotificationChannel, ToastDedup};
pub use presence::{PresenceAggregator, PresenceEntry};
pub use session::{SessionHandle, SyncClient, SyncSession};
pub use ws::WsTransport;
