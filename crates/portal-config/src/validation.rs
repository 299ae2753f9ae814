// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes, non-zero intervals, and a sane backoff range.

use crate::diagnostic::ConfigError;
use crate::model::PortalConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PortalConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::invalid(
            "logging.level",
            format!(
                "`{}` is not one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    check_url(
        &mut errors,
        "server.api_base_url",
        &config.server.api_base_url,
        &["http://", "https://"],
    );
    check_url(
        &mut errors,
        "server.ws_url",
        &config.server.ws_url,
        &["ws://", "wss://"],
    );

    let conn = &config.connection;
    check_non_zero(&mut errors, "connection.connect_timeout_secs", conn.connect_timeout_secs);
    check_non_zero(&mut errors, "connection.auth_timeout_secs", conn.auth_timeout_secs);
    check_non_zero(&mut errors, "connection.reconnect_delay_ms", conn.reconnect_delay_ms);
    if conn.max_reconnect_delay_ms < conn.reconnect_delay_ms {
        errors.push(ConfigError::invalid(
            "connection.max_reconnect_delay_ms",
            format!(
                "{} is below connection.reconnect_delay_ms ({})",
                conn.max_reconnect_delay_ms, conn.reconnect_delay_ms
            ),
        ));
    }

    check_non_zero(&mut errors, "heartbeat.interval_secs", config.heartbeat.interval_secs);
    check_non_zero(
        &mut errors,
        "heartbeat.fallback_interval_secs",
        config.heartbeat.fallback_interval_secs,
    );

    check_non_zero(
        &mut errors,
        "notifications.capacity",
        config.notifications.capacity as u64,
    );
    check_non_zero(
        &mut errors,
        "notifications.fetch_limit",
        config.notifications.fetch_limit as u64,
    );

    check_non_zero(&mut errors, "jobs.sweep_interval_secs", config.jobs.sweep_interval_secs);

    // Validate gateway host looks like a valid IP or hostname
    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::invalid("gateway.host", "must not be empty"));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::invalid(
                "gateway.host",
                format!("`{host}` is not a valid IP address or hostname"),
            ));
        }
    }

    if let Some(token) = &config.gateway.bearer_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::invalid(
            "gateway.bearer_token",
            "must not be empty when set",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_non_zero(errors: &mut Vec<ConfigError>, key: &str, value: u64) {
    if value == 0 {
        errors.push(ConfigError::invalid(key, "must be greater than zero"));
    }
}

fn check_url(errors: &mut Vec<ConfigError>, key: &str, value: &str, schemes: &[&str]) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(ConfigError::invalid(key, "must not be empty"));
    } else if !schemes.iter().any(|s| value.starts_with(s)) {
        errors.push(ConfigError::invalid(
            key,
            format!("`{value}` must start with one of: {}", schemes.join(", ")),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], wanted: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidValue { key, .. } if key == wanted))
    }

    #[test]
    fn default_config_validates() {
        let config = PortalConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn wrong_ws_scheme_fails_validation() {
        let mut config = PortalConfig::default();
        config.server.ws_url = "http://example.com/ws".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "server.ws_url"));
    }

    #[test]
    fn inverted_backoff_range_fails_validation() {
        let mut config = PortalConfig::default();
        config.connection.reconnect_delay_ms = 5_000;
        config.connection.max_reconnect_delay_ms = 1_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "connection.max_reconnect_delay_ms"));
    }

    #[test]
    fn zero_intervals_collect_every_error() {
        let mut config = PortalConfig::default();
        config.heartbeat.interval_secs = 0;
        config.heartbeat.fallback_interval_secs = 0;
        config.notifications.capacity = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_error(&errors, "heartbeat.interval_secs"));
        assert!(has_error(&errors, "heartbeat.fallback_interval_secs"));
        assert!(has_error(&errors, "notifications.capacity"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = PortalConfig::default();
        config.logging.level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "logging.level"));
    }

    #[test]
    fn blank_bearer_token_fails_validation() {
        let mut config = PortalConfig::default();
        config.gateway.bearer_token = Some("  ".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "gateway.bearer_token"));
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = PortalConfig::default();
        config.gateway.host = "0.0.0.0".to_string();
        config.server.api_base_url = "https://portal.example.com/api".to_string();
        config.server.ws_url = "wss://portal.example.com/ws".to_string();
        config.gateway.bearer_token = Some("secret".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
