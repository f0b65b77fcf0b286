//! WebSocket server the host shim connects to.
//!
//! # Connection Flow
//!
//! 1. The sniffer binds to `bind_ip:port` (port 0 picks a free one)
//! 2. The host shim is started with [`BridgeServer::ws_url`]
//! 3. The shim connects and sends READY with its session id
//! 4. Events flow in, badge commands and event replies flow out

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::SnifferConfig;
use crate::error::{Error, Result};

use super::connection::{ReadyData, duration_millis};
use super::Connection;

// ============================================================================
// BridgeServer
// ============================================================================

/// A WebSocket server that is bound but not yet connected.
///
/// # Example
///
/// ```ignore
/// use hls_sniffer::SnifferConfig;
/// use hls_sniffer::transport::BridgeServer;
///
/// let server = BridgeServer::bind(&SnifferConfig::new()).await?;
/// let ws_url = server.ws_url();
///
/// // Start the host shim with ws_url...
///
/// let (connection, ready) = server.accept().await?;
/// ```
#[derive(Debug)]
pub struct BridgeServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Bound address.
    addr: SocketAddr,
    /// Time allowed for connect plus READY.
    connect_timeout: Duration,
}

impl BridgeServer {
    /// Binds a WebSocket server to the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(config: &SnifferConfig) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(config.bind_ip, config.port)).await?;
        let addr = listener.local_addr()?;

        debug!(port = addr.port(), "Bridge server bound");

        Ok(Self {
            listener,
            addr,
            connect_timeout: config.connect_timeout,
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the WebSocket URL for this server.
    #[must_use]
    pub fn ws_url(&self) -> String {
        match self.addr.ip() {
            IpAddr::V6(ip) => format!("ws://[{ip}]:{}", self.addr.port()),
            IpAddr::V4(ip) => format!("ws://{ip}:{}", self.addr.port()),
        }
    }

    /// Accepts the host shim and completes the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the shim doesn't connect in time
    /// - [`Error::Connection`] if the WebSocket upgrade fails
    /// - [`Error::Protocol`] if the READY handshake reports an error
    pub async fn accept(self) -> Result<(Connection, ReadyData)> {
        let (connection, ready, ()) = self.accept_with(|_| ()).await?;
        Ok((connection, ready))
    }

    /// Like [`accept`](Self::accept), running `on_connect` before READY.
    ///
    /// Install event handlers in `on_connect` so no event sent right after
    /// the handshake is missed.
    ///
    /// # Errors
    ///
    /// Same as [`accept`](Self::accept).
    pub async fn accept_with<T>(
        self,
        on_connect: impl FnOnce(&Connection) -> T,
    ) -> Result<(Connection, ReadyData, T)> {
        let (stream, addr) = timeout(self.connect_timeout, self.listener.accept())
            .await
            .map_err(|_| Error::connection_timeout(duration_millis(self.connect_timeout)))??;

        debug!(?addr, "TCP connection accepted");

        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        info!(port = self.addr.port(), "Host shim connected");

        let connection = Connection::new(ws_stream);
        let value = on_connect(&connection);

        match connection.wait_ready(self.connect_timeout).await {
            Ok(ready) => Ok((connection, ready, value)),
            Err(e) => {
                connection.shutdown();
                Err(e)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    use crate::host::{BadgeSink, BadgeUpdate};
    use crate::identifiers::TabId;
    use crate::protocol::{Event, EventReply, Reply};

    const READY: &str = r#"{
        "id": "00000000-0000-0000-0000-000000000000",
        "type": "success",
        "result": { "sessionId": 7 }
    }"#;

    #[tokio::test]
    async fn test_bind_random_port() {
        let server = BridgeServer::bind(&SnifferConfig::new())
            .await
            .expect("bind should succeed");

        assert!(server.port() > 0);
        assert_eq!(server.ws_url(), format!("ws://127.0.0.1:{}", server.port()));
        assert_eq!(server.local_addr().port(), server.port());
    }

    #[tokio::test]
    async fn test_accept_times_out() {
        let config = SnifferConfig::new().with_connect_timeout(Duration::from_millis(50));
        let server = BridgeServer::bind(&config).await.expect("bind");

        let err = server.accept().await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_handshake_events_and_commands() {
        let server = BridgeServer::bind(&SnifferConfig::new()).await.expect("bind");
        let url = server.ws_url();

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<Value>();
        let (go_tx, go_rx) = tokio::sync::oneshot::channel::<()>();
        let client = tokio::spawn(async move {
            let (mut ws, _) = connect_async(url).await.expect("connect");
            ws.send(Message::Text(READY.to_string().into())).await.expect("ready");
            go_rx.await.expect("handler installed");
            ws.send(Message::Text(
                json!({
                    "id": "550e8400-e29b-41d4-a716-446655440000",
                    "type": "event",
                    "method": "runtime.message",
                    "params": { "message": { "type": "ping" } }
                })
                .to_string()
                .into(),
            ))
            .await
            .expect("event");

            // Expect the event reply, then one badge command.
            for _ in 0..2 {
                while let Some(Ok(message)) = ws.next().await {
                    if let Message::Text(text) = message {
                        let value: Value = serde_json::from_str(&text).expect("json");
                        let _ = seen_tx.send(value);
                        break;
                    }
                }
            }
        });

        let (connection, ready) = server.accept().await.expect("accept");
        assert_eq!(ready.session_id, 7);

        connection.set_event_handler(Box::new(|event: Event| {
            Some(EventReply::message(event.id, &Reply::failure("Unknown message type: ping")))
        }));
        go_tx.send(()).expect("client alive");

        let reply = seen_rx.recv().await.expect("reply");
        assert_eq!(reply["replyTo"], "runtime.message");
        assert_eq!(reply["result"]["success"], false);

        connection.update(BadgeUpdate::for_count(TabId::from(5), 2, "#FF6B6B", "#FFFFFF"));
        let command = seen_rx.recv().await.expect("command");
        assert_eq!(command["method"], "action.setBadge");
        assert_eq!(command["params"]["tabId"], 5);
        assert_eq!(command["params"]["text"], "2");

        client.await.expect("client task");
        connection.shutdown();
        connection.closed().await;
        assert!(connection.is_closed());
    }
}
