// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket transport over `tokio-tungstenite`.
//!
//! Frames are JSON text envelopes. Unknown or malformed frames are logged and
//! skipped; close frames and socket errors end the connection.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use portal_core::{ClientEvent, PluginAdapter, PortalError, RealtimeTransport, ServerEvent};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Real-time transport backed by a WebSocket connection.
pub struct WsTransport {
    url: String,
    stream: Option<WsStream>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn stream_mut(&mut self) -> Result<&mut WsStream, PortalError> {
        self.stream
            .as_mut()
            .ok_or_else(|| PortalError::transport("websocket is not connected"))
    }
}

fn ws_error(context: &str, err: tokio_tungstenite::tungstenite::Error) -> PortalError {
    PortalError::Transport {
        message: format!("{context}: {err}"),
        source: Some(Box::new(err)),
    }
}

impl PluginAdapter for WsTransport {
    fn name(&self) -> &str {
        "websocket"
    }
}

#[async_trait]
impl RealtimeTransport for WsTransport {
    async fn connect(&mut self) -> Result<(), PortalError> {
        debug!(url = %self.url, "opening websocket");
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ws_error("websocket connect failed", e))?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, event: ClientEvent) -> Result<(), PortalError> {
        let frame = event.to_frame()?;
        let stream = self.stream_mut()?;
        if let Err(e) = stream.send(Message::Text(frame.into())).await {
            self.stream = None;
            return Err(ws_error("websocket send failed", e));
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<ServerEvent, PortalError> {
        loop {
            let frame = self.stream_mut()?.next().await;
            match frame {
                Some(Ok(Message::Text(text))) => match ServerEvent::from_frame(text.as_str()) {
                    Ok(event) => return Ok(event),
                    Err(e) => warn!(error = %e, "skipping unrecognised frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    self.stream = None;
                    let reason = frame
                        .map(|f| f.reason.as_str().to_string())
                        .unwrap_or_else(|| "no reason".to_string());
                    return Err(PortalError::transport(format!(
                        "server closed connection: {reason}"
                    )));
                }
                // Pings are answered by tungstenite itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Binary(data))) => {
                    debug!(len = data.len(), "skipping binary frame");
                }
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(ws_error("websocket read failed", e));
                }
                None => {
                    self.stream = None;
                    return Err(PortalError::transport("websocket stream ended"));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), PortalError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .close(None)
                .await
                .map_err(|e| ws_error("websocket close failed", e))?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::{PresenceState, UserId};
    use tokio::net::TcpListener;
    use tracing_test::traced_test;

    /// Accepts one websocket client, pushes `frames`, then returns the
    /// first text frame it receives.
    async fn spawn_server(frames: Vec<&'static str>) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            for frame in frames {
                ws.send(Message::Text(frame.into())).await.unwrap();
            }
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => return text.to_string(),
                    Some(Ok(_)) => continue,
                    _ => return String::new(),
                }
            }
        });
        (format!("ws://{addr}"), handle)
    }

    #[tokio::test]
    #[traced_test]
    async fn recv_skips_malformed_frames() {
        let (url, _server) = spawn_server(vec![
            "not json",
            r#"{"event":"chat:typing","data":{}}"#,
            r#"{"event":"presence:update","data":{"userId":8,"state":"offline"}}"#,
        ])
        .await;

        let mut transport = WsTransport::new(url);
        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        let event = transport.recv().await.unwrap();
        assert_eq!(
            event,
            ServerEvent::PresenceUpdate {
                user_id: UserId(8),
                state: PresenceState::Offline,
            }
        );
        assert!(logs_contain("skipping unrecognised frame"));
    }

    #[tokio::test]
    async fn send_writes_json_envelope() {
        let (url, server) = spawn_server(vec![]).await;

        let mut transport = WsTransport::new(url);
        transport.connect().await.unwrap();
        transport.send(ClientEvent::PresencePing).await.unwrap();

        assert_eq!(server.await.unwrap(), r#"{"event":"presence:ping"}"#);
    }

    #[tokio::test]
    async fn server_close_ends_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let mut transport = WsTransport::new(format!("ws://{addr}"));
        transport.connect().await.unwrap();
        let err = transport.recv().await.unwrap_err();
        assert!(matches!(err, PortalError::Transport { .. }));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn operations_fail_when_not_connected() {
        let mut transport = WsTransport::new("ws://127.0.0.1:9");
        assert!(transport.send(ClientEvent::PresencePing).await.is_err());
        assert!(transport.recv().await.is_err());
        assert!(transport.close().await.is_ok());
    }
}
