//! WebSocket connection and event loop.
//!
//! The connection owns one spawned tokio task that multiplexes:
//!
//! - incoming host messages (READY handshake, acknowledgements, events)
//! - outgoing fire-and-forget commands
//! - outgoing event replies, including ones produced later by spawned tasks
//!
//! Events are dispatched to a single [`EventHandler`] in arrival order.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{from_str, to_string};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::host::{BadgeSink, BadgeUpdate};
use crate::protocol::{Command, Event, EventReply, Request, Response};

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Called for each event received from the host shim. Return
/// `Some(EventReply)` to answer the event immediately.
pub type EventHandler = Box<dyn Fn(Event) -> Option<EventReply> + Send + Sync>;

/// Write half of the WebSocket.
type WsSink = futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>;

// ============================================================================
// ReadyData
// ============================================================================

/// Data received in the READY handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyData {
    /// Host session identifier.
    pub session_id: u64,
}

// ============================================================================
// Outbound
// ============================================================================

/// Internal messages for the event loop.
#[derive(Debug)]
pub(crate) enum Outbound {
    /// Send a command envelope.
    Command(Request),
    /// Send an event reply.
    Reply(EventReply),
    /// Close the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to the host shim.
///
/// Cheap to clone; all clones drive the same event loop. Dropping a clone
/// never closes the connection, only [`Connection::shutdown`] or the remote
/// end does.
#[derive(Clone)]
pub struct Connection {
    /// Channel to the event loop.
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    /// READY handshake receiver, taken by the first `wait_ready`.
    ready_rx: Arc<Mutex<Option<oneshot::Receiver<Response>>>>,
    /// Event handler (shared with event loop).
    event_handler: Arc<Mutex<Option<EventHandler>>>,
    /// Flips to `true` when the event loop exits.
    closed_rx: watch::Receiver<bool>,
}

impl Connection {
    /// Creates a new connection from a WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    pub(crate) fn new(ws_stream: WebSocketStream<TcpStream>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let event_handler: Arc<Mutex<Option<EventHandler>>> = Arc::new(Mutex::new(None));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            outbound_rx,
            ready_tx,
            Arc::clone(&event_handler),
            closed_tx,
        ));

        Self {
            outbound_tx,
            ready_rx: Arc::new(Mutex::new(Some(ready_rx))),
            event_handler,
            closed_rx,
        }
    }

    /// Waits for the READY handshake message.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if READY is not received in time
    /// - [`Error::ChannelClosed`] if the connection closes before READY
    /// - [`Error::ConnectionClosed`] if the handshake was already consumed
    /// - [`Error::Protocol`] if the host reports a failed handshake
    pub async fn wait_ready(&self, ready_timeout: Duration) -> Result<ReadyData> {
        let rx = self.ready_rx.lock().take().ok_or(Error::ConnectionClosed)?;

        let response = timeout(ready_timeout, rx)
            .await
            .map_err(|_| Error::connection_timeout(duration_millis(ready_timeout)))??;

        let session_id = response.get_u64("sessionId");
        response.into_result()?;

        debug!(session_id, "READY handshake completed");

        Ok(ReadyData { session_id })
    }

    /// Sets the event handler callback.
    pub fn set_event_handler(&self, handler: EventHandler) {
        *self.event_handler.lock() = Some(handler);
    }

    /// Clears the event handler.
    pub fn clear_event_handler(&self) {
        *self.event_handler.lock() = None;
    }

    /// Sends a fire-and-forget command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has exited.
    pub fn notify(&self, command: Command) -> Result<()> {
        self.outbound_tx
            .send(Outbound::Command(Request::new(command)))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns a handle for sending event replies from other tasks.
    #[must_use]
    pub fn reply_sender(&self) -> ReplySender {
        ReplySender {
            outbound_tx: self.outbound_tx.clone(),
        }
    }

    /// Returns `true` once the event loop has exited.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }

    /// Resolves when the event loop has exited.
    pub async fn closed(&self) {
        let mut closed_rx = self.closed_rx.clone();
        // A dropped sender means the loop is gone too.
        let _ = closed_rx.wait_for(|closed| *closed).await;
    }

    /// Shuts down the connection gracefully.
    pub fn shutdown(&self) {
        let _ = self.outbound_tx.send(Outbound::Shutdown);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl BadgeSink for Connection {
    fn update(&self, update: BadgeUpdate) {
        let tab_id = update.tab_id;
        if let Err(e) = self.notify(Command::SetBadge(update)) {
            debug!(tab_id = %tab_id, error = %e, "Badge update dropped");
        }
    }
}

// ============================================================================
// Connection - Event Loop
// ============================================================================

impl Connection {
    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WebSocketStream<TcpStream>,
        mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
        ready_tx: oneshot::Sender<Response>,
        event_handler: Arc<Mutex<Option<EventHandler>>>,
        closed_tx: watch::Sender<bool>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut ready_tx = Some(ready_tx);

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            let reply = Self::handle_incoming_message(
                                &text,
                                &mut ready_tx,
                                &event_handler,
                            );

                            if let Some(reply) = reply {
                                Self::write_json(&mut ws_write, &reply).await;
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(Outbound::Command(request)) => {
                            trace!(id = %request.id, "Command sent");
                            Self::write_json(&mut ws_write, &request).await;
                        }

                        Some(Outbound::Reply(reply)) => {
                            Self::write_json(&mut ws_write, &reply).await;
                        }

                        Some(Outbound::Shutdown) => {
                            debug!("Shutdown requested");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Outbound channel closed");
                            break;
                        }
                    }
                }
            }
        }

        let _ = closed_tx.send(true);
        debug!("Event loop terminated");
    }

    /// Handles an incoming text message from the host shim.
    fn handle_incoming_message(
        text: &str,
        ready_tx: &mut Option<oneshot::Sender<Response>>,
        event_handler: &Arc<Mutex<Option<EventHandler>>>,
    ) -> Option<EventReply> {
        if let Ok(response) = from_str::<Response>(text) {
            if response.id.is_ready() {
                match ready_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => warn!("Duplicate READY handshake"),
                }
            } else {
                trace!(id = %response.id, success = response.is_success(), "Command acknowledged");
            }
            return None;
        }

        if let Ok(event) = from_str::<Event>(text) {
            let handler = event_handler.lock();
            if let Some(ref handler) = *handler {
                return handler(event);
            }
            trace!(method = %event.method, "No event handler installed");
            return None;
        }

        warn!(text = %text, "Failed to parse incoming message");
        None
    }

    /// Serializes and writes one message, logging failures.
    async fn write_json<T: serde::Serialize>(ws_write: &mut WsSink, value: &T) {
        let json = match to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize outbound message");
                return;
            }
        };

        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
            warn!(error = %e, "Failed to send outbound message");
        }
    }
}

// ============================================================================
// ReplySender
// ============================================================================

/// Sends event replies through a connection's event loop.
///
/// Used by tasks that answer an event after the handler returned, such as
/// reachability probes.
#[derive(Debug, Clone)]
pub struct ReplySender {
    outbound_tx: mpsc::UnboundedSender<Outbound>,
}

impl ReplySender {
    /// Queues a reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has exited.
    pub fn send(&self, reply: EventReply) -> Result<()> {
        self.outbound_tx
            .send(Outbound::Reply(reply))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Creates a sender not attached to any connection.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        (Self { outbound_tx }, outbound_rx)
    }
}

/// Saturating conversion of a duration to milliseconds.
#[inline]
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_millis() {
        assert_eq!(duration_millis(Duration::from_secs(30)), 30_000);
        assert_eq!(duration_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_ready_data() {
        let data = ReadyData { session_id: 2 };
        assert_eq!(data.session_id, 2);
    }
}
