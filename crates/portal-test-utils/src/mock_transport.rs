// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock real-time transport for deterministic testing.
//!
//! `MockTransport` implements `RealtimeTransport` with injectable server
//! events, scripted connect outcomes and captured client events. Clones share
//! state, so a test keeps one clone for assertions and hands another to the
//! session.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use portal_core::traits::adapter::PluginAdapter;
use portal_core::traits::transport::RealtimeTransport;
use portal_core::{ClientEvent, PortalError, ServerEvent};

/// How the mock answers `auth:init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthReply {
    /// Reply with `auth:ok`.
    Accept,
    /// Reply with `auth:error` carrying the message.
    Reject(String),
    /// Never reply; the handshake times out.
    Silent,
}

enum Frame {
    Event(ServerEvent),
    Drop,
}

struct Inner {
    inbound: Mutex<VecDeque<Frame>>,
    sent: Mutex<Vec<ClientEvent>>,
    notify: Notify,
    connect_script: Mutex<VecDeque<bool>>,
    fail_connects: AtomicBool,
    auth_reply: Mutex<AuthReply>,
    connected: AtomicBool,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

/// A scripted real-time transport for testing.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

impl MockTransport {
    /// A transport whose connects succeed and whose auth is accepted.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                inbound: Mutex::new(VecDeque::new()),
                sent: Mutex::new(Vec::new()),
                notify: Notify::new(),
                connect_script: Mutex::new(VecDeque::new()),
                fail_connects: AtomicBool::new(false),
                auth_reply: Mutex::new(AuthReply::Accept),
                connected: AtomicBool::new(false),
                connects: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
            }),
        }
    }

    /// Every connect attempt fails unless a scripted outcome says otherwise.
    pub fn failing_connects(self) -> Self {
        self.inner.fail_connects.store(true, Ordering::SeqCst);
        self
    }

    /// Sets how `auth:init` is answered.
    pub async fn set_auth_reply(&self, reply: AuthReply) {
        *self.inner.auth_reply.lock().await = reply;
    }

    /// Queues connect outcomes, consumed one per attempt before the default.
    pub async fn script_connects(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.inner.connect_script.lock().await.extend(outcomes);
    }

    /// Inject a server event. The next `recv()` returns it.
    pub async fn inject(&self, event: ServerEvent) {
        self.inner.inbound.lock().await.push_back(Frame::Event(event));
        self.inner.notify.notify_one();
    }

    /// Simulates the server dropping the connection.
    pub async fn drop_connection(&self) {
        self.inner.inbound.lock().await.push_back(Frame::Drop);
        self.inner.notify.notify_one();
    }

    /// Get all events sent by the client.
    pub async fn sent_events(&self) -> Vec<ClientEvent> {
        self.inner.sent.lock().await.clone()
    }

    /// Number of `presence:ping` events sent over the connection.
    pub async fn ping_count(&self) -> usize {
        self.inner
            .sent
            .lock()
            .await
            .iter()
            .filter(|e| matches!(e, ClientEvent::PresencePing))
            .count()
    }

    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    pub fn connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    async fn push_reply(&self, event: ServerEvent) {
        self.inner.inbound.lock().await.push_back(Frame::Event(event));
        self.inner.notify.notify_one();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }
}

#[async_trait]
impl RealtimeTransport for MockTransport {
    async fn connect(&mut self) -> Result<(), PortalError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        let scripted = self.inner.connect_script.lock().await.pop_front();
        let succeed = scripted.unwrap_or(!self.inner.fail_connects.load(Ordering::SeqCst));
        if !succeed {
            return Err(PortalError::transport("mock connect refused"));
        }

        // Drops aimed at an earlier connection do not carry over.
        self.inner
            .inbound
            .lock()
            .await
            .retain(|f| !matches!(f, Frame::Drop));
        self.inner.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&mut self, event: ClientEvent) -> Result<(), PortalError> {
        if !self.connected() {
            return Err(PortalError::transport("mock transport not connected"));
        }
        let is_auth = matches!(event, ClientEvent::AuthInit { .. });
        self.inner.sent.lock().await.push(event);

        if is_auth {
            let reply = self.inner.auth_reply.lock().await.clone();
            match reply {
                AuthReply::Accept => self.push_reply(ServerEvent::AuthOk).await,
                AuthReply::Reject(message) => {
                    self.push_reply(ServerEvent::AuthError { message }).await
                }
                AuthReply::Silent => {}
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<ServerEvent, PortalError> {
        loop {
            {
                let mut queue = self.inner.inbound.lock().await;
                match queue.pop_front() {
                    Some(Frame::Event(event)) => return Ok(event),
                    Some(Frame::Drop) => {
                        self.inner.connected.store(false, Ordering::SeqCst);
                        return Err(PortalError::transport("mock connection dropped"));
                    }
                    None => {}
                }
            }
            self.inner.notify.notified().await;
        }
    }

    async fn close(&mut self) -> Result<(), PortalError> {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_auth_by_default() {
        let mut transport = MockTransport::new();
        transport.connect().await.unwrap();
        transport
            .send(ClientEvent::AuthInit {
                token: "tok".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(transport.recv().await.unwrap(), ServerEvent::AuthOk);
        assert_eq!(transport.sent_events().await.len(), 1);
    }

    #[tokio::test]
    async fn scripted_connects_take_priority() {
        let mut transport = MockTransport::new().failing_connects();
        transport.script_connects([true]).await;

        assert!(transport.connect().await.is_ok());
        assert!(transport.connect().await.is_err());
        assert_eq!(transport.connect_count(), 2);
    }

    #[tokio::test]
    async fn drop_ends_recv_with_error() {
        let mut transport = MockTransport::new();
        transport.connect().await.unwrap();
        let handle = transport.clone();

        let recv = tokio::spawn(async move { transport.recv().await });
        handle.drop_connection().await;

        assert!(recv.await.unwrap().is_err());
        assert!(!handle.connected());
    }

    #[tokio::test]
    async fn send_requires_connection() {
        let mut transport = MockTransport::new();
        assert!(transport.send(ClientEvent::PresencePing).await.is_err());
    }
}
