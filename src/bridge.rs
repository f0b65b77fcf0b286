//! Host bridge: service plus WebSocket connection.
//!
//! # Example
//!
//! ```no_run
//! use hls_sniffer::{PendingBridge, Result, SnifferConfig, TabId};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let pending = PendingBridge::bind(SnifferConfig::new()).await?;
//!     println!("start the host shim with {}", pending.ws_url());
//!
//!     let bridge = pending.accept().await?;
//!     let ui = bridge.channel();
//!     let manifests = ui.get_manifests(TabId::from(1)).await?;
//!     println!("tab 1: {} manifests", manifests.len());
//!
//!     bridge.closed().await;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::info;

use crate::config::SnifferConfig;
use crate::error::Result;
use crate::host::HttpProbe;
use crate::service::SnifferService;
use crate::transport::{self, BridgeServer, ChannelClient, Connection, ReadyData};

// ============================================================================
// PendingBridge
// ============================================================================

/// A bound bridge waiting for the host shim.
#[derive(Debug)]
pub struct PendingBridge {
    config: SnifferConfig,
    probe: HttpProbe,
    server: BridgeServer,
}

impl PendingBridge {
    /// Validates `config` and binds the bridge server.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if `config` is invalid
    /// - [`Error::Io`](crate::Error::Io) if binding fails
    pub async fn bind(config: SnifferConfig) -> Result<Self> {
        config.validate()?;
        let probe = HttpProbe::new(config.probe_timeout)?;
        let server = BridgeServer::bind(&config).await?;

        Ok(Self {
            config,
            probe,
            server,
        })
    }

    /// Returns the WebSocket URL for the host shim.
    #[must_use]
    pub fn ws_url(&self) -> String {
        self.server.ws_url()
    }

    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.server.port()
    }

    /// Waits for the host shim and starts serving its events.
    ///
    /// # Errors
    ///
    /// Connection errors from [`BridgeServer::accept_with`].
    pub async fn accept(self) -> Result<Bridge> {
        let Self {
            config,
            probe,
            server,
        } = self;

        let (connection, ready, service) = server
            .accept_with(|connection| {
                let service = SnifferService::new(
                    config,
                    Arc::new(connection.clone()),
                    Arc::new(probe),
                )
                .map(Arc::new);

                if let Ok(service) = &service {
                    service.attach(connection);
                }
                service
            })
            .await?;

        let service = match service {
            Ok(service) => service,
            Err(e) => {
                connection.shutdown();
                return Err(e);
            }
        };

        info!(session_id = ready.session_id, "Host bridge ready");

        Ok(Bridge {
            service,
            connection,
            ready,
        })
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// A running bridge.
#[derive(Debug)]
pub struct Bridge {
    service: Arc<SnifferService>,
    connection: Connection,
    ready: ReadyData,
}

impl Bridge {
    /// Returns the service.
    #[inline]
    #[must_use]
    pub fn service(&self) -> &Arc<SnifferService> {
        &self.service
    }

    /// Returns the connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the host session id.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> u64 {
        self.ready.session_id
    }

    /// Opens an in-process channel to the service.
    ///
    /// Each call spawns a serve loop that ends with its last client.
    #[must_use]
    pub fn channel(&self) -> ChannelClient {
        let (client, receiver) = transport::channel();
        let service = Arc::clone(&self.service);
        tokio::spawn(async move { service.serve_channel(receiver).await });
        client
    }

    /// Resolves when the host shim disconnects.
    pub async fn closed(&self) {
        self.connection.closed().await;
    }

    /// Detaches the service and closes the connection.
    pub fn shutdown(&self) {
        self.connection.clear_event_handler();
        self.connection.shutdown();
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        // The event handler holds the service, which holds the connection.
        self.shutdown();
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
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    use crate::identifiers::TabId;

    fn event(id: &str, method: &str, params: Value) -> Message {
        Message::Text(
            json!({ "id": id, "type": "event", "method": method, "params": params })
                .to_string()
                .into(),
        )
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_binding() {
        let err = PendingBridge::bind(SnifferConfig::new().with_badge_text_color("#FFF"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let pending = PendingBridge::bind(SnifferConfig::new()).await.expect("bind");
        let url = pending.ws_url();
        assert!(pending.port() > 0);

        let shim = tokio::spawn(async move {
            let (mut ws, _) = connect_async(url).await.expect("connect");
            let ready = json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "type": "success",
                "result": { "sessionId": 11 }
            });
            ws.send(Message::Text(ready.to_string().into())).await.expect("ready");
            ws.send(event(
                "6f1c2a1e-0000-4000-8000-000000000001",
                "webRequest.completed",
                json!({ "tabId": 3, "url": "https://edge.example.com/live/720p.m3u8" }),
            ))
            .await
            .expect("completed");
            ws.send(event(
                "6f1c2a1e-0000-4000-8000-000000000002",
                "runtime.message",
                json!({ "message": { "type": "getManifestsForTab", "tabId": 3 } }),
            ))
            .await
            .expect("message");

            // One badge command and one reply, in either order.
            let mut frames = Vec::new();
            while frames.len() < 2 {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        frames.push(serde_json::from_str::<Value>(&text).expect("json"));
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
            frames
        });

        let bridge = pending.accept().await.expect("accept");
        assert_eq!(bridge.session_id(), 11);

        let frames = shim.await.expect("shim task");
        assert_eq!(frames.len(), 2);

        let badge = frames
            .iter()
            .find(|f| f["method"] == "action.setBadge")
            .expect("badge command");
        assert_eq!(badge["params"]["text"], "1");
        assert_eq!(badge["params"]["tabId"], 3);

        let reply = frames
            .iter()
            .find(|f| f["replyTo"] == "runtime.message")
            .expect("event reply");
        assert_eq!(reply["result"]["count"], 1);
        assert_eq!(
            reply["result"]["urls"][0]["url"],
            "https://edge.example.com/live/720p.m3u8"
        );

        let ui = bridge.channel();
        let records = ui.get_manifests(TabId::from(3)).await.expect("query");
        assert_eq!(records[0].quality(), Some("720p"));

        bridge.closed().await;
        assert!(bridge.connection().is_closed());
    }
}
