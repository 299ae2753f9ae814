// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock request/response API for deterministic testing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use portal_core::traits::adapter::PluginAdapter;
use portal_core::traits::api::PortalApi;
use portal_core::{Notification, NotificationId, PortalError};

#[derive(Default)]
struct Inner {
    notifications: Mutex<Vec<Notification>>,
    acknowledged: Mutex<Vec<NotificationId>>,
    acknowledge_all_calls: AtomicUsize,
    pings: AtomicUsize,
    fetches: AtomicUsize,
    fetch_delay_ms: AtomicU64,
    failing: AtomicBool,
}

/// A mock portal API returning canned notifications and recording calls.
///
/// Clones share state. When set to fail, every call is still recorded.
#[derive(Clone, Default)]
pub struct MockApi {
    inner: Arc<Inner>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose bulk fetch returns `notifications`.
    pub fn with_notifications(notifications: Vec<Notification>) -> Self {
        Self {
            inner: Arc::new(Inner {
                notifications: Mutex::new(notifications),
                ..Inner::default()
            }),
        }
    }

    /// Replace the list served by the bulk fetch.
    pub async fn set_notifications(&self, notifications: Vec<Notification>) {
        *self.inner.notifications.lock().await = notifications;
    }

    /// Make every call fail with an API error.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Make the bulk fetch wait `delay` before answering.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.inner
            .fetch_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Ids passed to `acknowledge()`, in call order.
    pub async fn acknowledged(&self) -> Vec<NotificationId> {
        self.inner.acknowledged.lock().await.clone()
    }

    pub fn acknowledge_all_calls(&self) -> usize {
        self.inner.acknowledge_all_calls.load(Ordering::SeqCst)
    }

    pub fn ping_count(&self) -> usize {
        self.inner.pings.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), PortalError> {
        if self.inner.failing.load(Ordering::SeqCst) {
            Err(PortalError::Api {
                message: "mock api failure".to_string(),
                source: None,
            })
        } else {
            Ok(())
        }
    }
}

impl PluginAdapter for MockApi {
    fn name(&self) -> &str {
        "mock-api"
    }
}

#[async_trait]
impl PortalApi for MockApi {
    async fn fetch_notifications(&self, limit: usize) -> Result<Vec<Notification>, PortalError> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = self.inner.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check()?;
        let list = self.inner.notifications.lock().await;
        Ok(list.iter().take(limit).cloned().collect())
    }

    async fn acknowledge(&self, id: NotificationId) -> Result<(), PortalError> {
        self.inner.acknowledged.lock().await.push(id);
        self.check()
    }

    async fn acknowledge_all(&self) -> Result<(), PortalError> {
        self.inner
            .acknowledge_all_calls
            .fetch_add(1, Ordering::SeqCst);
        self.check()
    }

    async fn ping(&self) -> Result<(), PortalError> {
        self.inner.pings.fetch_add(1, Ordering::SeqCst);
        self.check()
    }
}
