// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the portal's request/response endpoints.
//!
//! Provides [`HttpPortalApi`], used for the notification bulk fetch, the
//! acknowledge commands and the out-of-band liveness ping. Every request
//! carries the session's bearer token.

use std::time::Duration;

use async_trait::async_trait;
use portal_core::{Notification, NotificationId, PluginAdapter, PortalApi, PortalError};
use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `reqwest`-backed implementation of [`PortalApi`].
#[derive(Clone)]
pub struct HttpPortalApi {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl std::fmt::Debug for HttpPortalApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPortalApi")
            .field("base_url", &self.base_url)
            .field("token", &"[redacted]")
            .finish()
    }
}

impl HttpPortalApi {
    /// Creates a client for `base_url` (e.g. `https://portal.example.com/api`).
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Result<Self, PortalError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PortalError::Api {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn post(&self, path: &str) -> Result<(), PortalError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(request_failed)?;
        check_status(response).await.map(|_| ())
    }
}

fn request_failed(e: reqwest::Error) -> PortalError {
    PortalError::Api {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

async fn check_status(response: Response) -> Result<Response, PortalError> {
    let status = response.status();
    debug!(status = %status, url = %response.url(), "api response received");
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PortalError::Api {
        message: format!("API returned {status}: {body}"),
        source: None,
    })
}

impl PluginAdapter for HttpPortalApi {
    fn name(&self) -> &str {
        "portal-http"
    }
}

#[async_trait]
impl PortalApi for HttpPortalApi {
    async fn fetch_notifications(&self, limit: usize) -> Result<Vec<Notification>, PortalError> {
        let response = self
            .client
            .get(self.url(&format!("notifications?limit={limit}")))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(request_failed)?;
        let response = check_status(response).await?;
        response
            .json::<Vec<Notification>>()
            .await
            .map_err(|e| PortalError::Api {
                message: format!("failed to parse notification list: {e}"),
                source: Some(Box::new(e)),
            })
    }

    async fn acknowledge(&self, id: NotificationId) -> Result<(), PortalError> {
        self.post(&format!("notifications/{id}/read")).await
    }

    async fn acknowledge_all(&self) -> Result<(), PortalError> {
        self.post("notifications/read-all").await
    }

    async fn ping(&self) -> Result<(), PortalError> {
        self.post("presence/ping").await
    }
}
