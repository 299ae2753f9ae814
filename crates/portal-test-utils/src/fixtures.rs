// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures: sample records and a configuration tuned for fast tests.

use chrono::{DateTime, Duration, Utc};
use portal_config::PortalConfig;
use portal_core::{Notification, NotificationId, UserId};

/// Fixed reference instant used by fixtures.
pub fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_772_355_600, 0).unwrap_or_default()
}

/// An unread notification for user 1 created `minutes` after [`base_time`].
pub fn notification(id: u64, minutes: i64) -> Notification {
    Notification {
        id: NotificationId(id),
        user_id: UserId(1),
        kind: "task_assigned".to_string(),
        entity_type: Some("task".to_string()),
        entity_id: Some(id),
        message: format!("Task {id} was assigned to you"),
        metadata: serde_json::json!({ "link": format!("/tasks/{id}") }),
        created_at: base_time() + Duration::minutes(minutes),
        read_at: None,
    }
}

/// Default configuration with short reconnect delays and a small attempt
/// budget. Heartbeat intervals keep their documented defaults.
pub fn fast_config() -> PortalConfig {
    let mut config = PortalConfig::default();
    config.connection.reconnect_delay_ms = 100;
    config.connection.max_reconnect_delay_ms = 1_000;
    config.connection.max_reconnect_attempts = 3;
    config.connection.connect_timeout_secs = 1;
    config.connection.auth_timeout_secs = 1;
    config
}
