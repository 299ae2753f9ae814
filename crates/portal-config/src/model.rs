// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Portal sync core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Portal configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PortalConfig {
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Endpoints of the portal backend.
    #[serde(default)]
    pub server: ServerConfig,

    /// Real-time connection timeouts and reconnect backoff.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Liveness heartbeat intervals.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Notification buffer settings.
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Job registry retention settings.
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Job inspection gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Portal backend endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Base URL of the request/response API (bulk fetch, acknowledge, ping).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// URL of the real-time WebSocket endpoint.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            ws_url: default_ws_url(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:8080/ws".to_string()
}

/// Real-time connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Timeout for establishing the transport.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Time allowed for the server to accept the auth handshake.
    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,

    /// Base reconnect delay; doubled on every failed attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Upper bound on the reconnect delay.
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Attempts before the session is marked degraded.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            auth_timeout_secs: default_auth_timeout_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_auth_timeout_secs() -> u64 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

/// Liveness heartbeat configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatConfig {
    /// Primary heartbeat over the live connection, in seconds.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub interval_secs: u64,

    /// Out-of-band fallback heartbeat while disconnected, in seconds.
    #[serde(default = "default_fallback_interval_secs")]
    pub fallback_interval_secs: u64,
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fallback_interval(&self) -> Duration {
        Duration::from_secs(self.fallback_interval_secs)
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_heartbeat_interval_secs(),
            fallback_interval_secs: default_fallback_interval_secs(),
        }
    }
}

fn default_heartbeat_interval_secs() -> u64 {
    10
}

fn default_fallback_interval_secs() -> u64 {
    15
}

/// Notification buffer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationsConfig {
    /// Maximum entries kept in the buffer (oldest evicted first).
    #[serde(default = "default_notification_capacity")]
    pub capacity: usize,

    /// Maximum entries requested by the bulk fetch on connect.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            capacity: default_notification_capacity(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

fn default_notification_capacity() -> usize {
    100
}

fn default_fetch_limit() -> usize {
    100
}

/// Job registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    /// How long terminal jobs stay visible, in seconds.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Interval between retention sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl JobsConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_retention_secs() -> u64 {
    3_600 // 1 hour
}

fn default_sweep_interval_secs() -> u64 {
    600 // 10 minutes
}

/// Job inspection gateway configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `/v1` routes. `None` rejects every request.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3100
}
