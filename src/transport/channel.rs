//! In-process message channel.
//!
//! Connects page observers and UI consumers to the sniffer service when
//! they live in the same process. Each envelope carries the sender's tab
//! (if any), the raw JSON message and an optional reply slot.
//!
//! | Call | Reply expected |
//! |------|----------------|
//! | [`ChannelClient::request`] | yes, awaited |
//! | [`ChannelClient::notify`] | no, delivery failures ignored |

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::protocol::{Message, Reply};
use crate::registry::ManifestRecord;

// ============================================================================
// Envelope
// ============================================================================

/// One message in flight.
#[derive(Debug)]
pub struct Envelope {
    /// Sending tab, if the sender is a page.
    sender: Option<TabId>,
    /// Raw message payload.
    message: Value,
    /// Reply slot for request/response calls.
    reply_tx: Option<oneshot::Sender<Reply>>,
}

impl Envelope {
    /// Returns the sending tab.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> Option<TabId> {
        self.sender
    }

    /// Returns the raw message payload.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &Value {
        &self.message
    }

    /// Returns `true` if the sender awaits a reply.
    #[inline]
    #[must_use]
    pub fn expects_reply(&self) -> bool {
        self.reply_tx.is_some()
    }

    /// Splits the envelope into its parts and a responder.
    #[must_use]
    pub fn into_parts(self) -> (Option<TabId>, Value, Responder) {
        (
            self.sender,
            self.message,
            Responder {
                reply_tx: self.reply_tx,
            },
        )
    }
}

// ============================================================================
// Responder
// ============================================================================

/// Answers one envelope; may be moved into another task.
#[derive(Debug)]
pub struct Responder {
    reply_tx: Option<oneshot::Sender<Reply>>,
}

impl Responder {
    /// Sends the reply; a gone or fire-and-forget sender is ignored.
    pub fn respond(self, reply: Reply) {
        if let Some(tx) = self.reply_tx
            && tx.send(reply).is_err()
        {
            trace!("Channel requester went away before the reply");
        }
    }
}

// ============================================================================
// Constructor
// ============================================================================

/// Creates a connected client/receiver pair.
#[must_use]
pub fn channel() -> (ChannelClient, ChannelReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelClient { tx, sender: None }, ChannelReceiver { rx })
}

// ============================================================================
// ChannelClient
// ============================================================================

/// Sending half of the channel.
///
/// Cloneable; [`ChannelClient::for_tab`] derives a client that identifies
/// its messages as coming from a page in that tab.
#[derive(Debug, Clone)]
pub struct ChannelClient {
    tx: mpsc::UnboundedSender<Envelope>,
    sender: Option<TabId>,
}

impl ChannelClient {
    /// Returns a client whose messages carry `tab_id` as sender.
    #[must_use]
    pub fn for_tab(&self, tab_id: TabId) -> Self {
        Self {
            tx: self.tx.clone(),
            sender: Some(tab_id),
        }
    }

    /// Returns the sender tab of this client.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> Option<TabId> {
        self.sender
    }

    /// Sends a typed message and waits for the reply.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the message cannot be serialized
    /// - [`Error::ChannelClosed`] if the service is gone
    pub async fn request(&self, message: &Message) -> Result<Reply> {
        self.request_raw(serde_json::to_value(message)?).await
    }

    /// Sends a raw JSON message and waits for the reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the service is gone.
    pub async fn request_raw(&self, message: Value) -> Result<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();

        // A failed send drops the envelope and its reply sender, which the
        // await below reports as a closed channel.
        let _ = self.tx.send(Envelope {
            sender: self.sender,
            message,
            reply_tx: Some(reply_tx),
        });

        Ok(reply_rx.await?)
    }

    /// Sends a message without waiting for a reply.
    ///
    /// Delivery failures are ignored.
    pub fn notify(&self, message: &Message) {
        let Ok(message) = serde_json::to_value(message) else {
            return;
        };

        if self
            .tx
            .send(Envelope {
                sender: self.sender,
                message,
                reply_tx: None,
            })
            .is_err()
        {
            trace!("Channel closed, notification dropped");
        }
    }

    /// Lists the manifests of a tab, oldest first.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if the service is gone
    /// - [`Error::Protocol`] if the service rejects the request
    pub async fn get_manifests(&self, tab_id: TabId) -> Result<Vec<ManifestRecord>> {
        match self.request(&Message::GetManifestsForTab { tab_id }).await? {
            Reply::Manifests { urls, .. } => Ok(urls),
            other => Err(unexpected(other)),
        }
    }

    /// Drops the manifests of a tab.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if the service is gone
    /// - [`Error::Protocol`] if the service rejects the request
    pub async fn clear_manifests(&self, tab_id: TabId) -> Result<()> {
        match self.request(&Message::ClearManifests { tab_id }).await? {
            Reply::Ack { success: true } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Checks whether a URL answers at all.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if the service is gone
    /// - [`Error::Protocol`] if the service rejects the request
    pub async fn test_url_reachable(&self, url: impl Into<String>) -> Result<bool> {
        let message = Message::TestUrlReachable { url: url.into() };
        match self.request(&message).await? {
            Reply::Reachability { accessible } => Ok(accessible),
            other => Err(unexpected(other)),
        }
    }
}

/// Maps a reply of the wrong shape to a protocol error.
fn unexpected(reply: Reply) -> Error {
    match reply {
        Reply::Failure { error, .. } => Error::protocol(error),
        other => Error::protocol(format!("unexpected reply: {other:?}")),
    }
}

// ============================================================================
// ChannelReceiver
// ============================================================================

/// Receiving half of the channel, owned by the service.
#[derive(Debug)]
pub struct ChannelReceiver {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl ChannelReceiver {
    /// Receives the next envelope; `None` once every client is dropped.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[tokio::test]
    async fn test_request_roundtrip() {
        let (client, mut receiver) = channel();

        let server = tokio::spawn(async move {
            let envelope = receiver.recv().await.expect("envelope");
            assert!(envelope.expects_reply());
            assert_eq!(envelope.sender(), None);
            assert_eq!(envelope.message()["type"], "testUrlReachable");

            let (_, _, responder) = envelope.into_parts();
            responder.respond(Reply::reachability(true));
        });

        let reachable =
            tokio_test::assert_ok!(client.test_url_reachable("https://a.example.com/x.m3u8").await);
        assert!(reachable);
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn test_for_tab_tags_sender() {
        let (client, mut receiver) = channel();
        let page = client.for_tab(TabId::from(9));

        page.notify(&Message::ContentScriptManifestFound {
            url: "https://a.example.com/x.m3u8".into(),
            source: "content_script".into(),
            timestamp: 1,
        });

        let envelope = receiver.recv().await.expect("envelope");
        assert_eq!(envelope.sender(), Some(TabId::from(9)));
        assert!(!envelope.expects_reply());
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let (client, receiver) = channel();
        drop(receiver);

        let result = client.request_raw(json!({ "type": "x" })).await;
        tokio_test::assert_err!(&result);
        assert!(matches!(result, Err(Error::ChannelClosed(_))));

        // Fire-and-forget never fails.
        client.notify(&Message::ClearManifests {
            tab_id: TabId::from(1),
        });
    }

    #[tokio::test]
    async fn test_failure_reply_becomes_protocol_error() {
        let (client, mut receiver) = channel();

        tokio::spawn(async move {
            while let Some(envelope) = receiver.recv().await {
                let (_, _, responder) = envelope.into_parts();
                responder.respond(Reply::failure("nope"));
            }
        });

        let err = client.clear_manifests(TabId::from(1)).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { ref message } if message == "nope"));
    }
}
