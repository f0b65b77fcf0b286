//! Sniffer service.
//!
//! The registry owner. Receives host events from the bridge and messages
//! from the channel, routes them to the observers and the registry, and
//! answers channel messages.
//!
//! | Input | Handler |
//! |-------|---------|
//! | `webRequest.completed` | [`NetworkObserver::on_request_completed`] |
//! | `webRequest.headersReceived` | [`NetworkObserver::on_headers_received`] |
//! | `tabs.updated` | [`LifecycleCoordinator::on_tab_updated`] |
//! | `tabs.removed` | [`LifecycleCoordinator::on_tab_removed`] |
//! | `runtime.message` / channel envelope | [`SnifferService::dispatch`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::config::SnifferConfig;
use crate::error::{Error, Result};
use crate::host::{BadgeSink, HttpProbe, ReachabilityProbe};
use crate::identifiers::TabId;
use crate::observer::{LifecycleCoordinator, NetworkObserver};
use crate::protocol::{Event, EventReply, Message, ParsedEvent, Reply};
use crate::registry::ManifestRegistry;
use crate::transport::{ChannelReceiver, Connection, ReplySender};

// ============================================================================
// Dispatch
// ============================================================================

/// Outcome of dispatching one channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Answered synchronously.
    Done(Reply),
    /// Needs a reachability probe of this URL before answering.
    Probe(String),
}

// ============================================================================
// SnifferService
// ============================================================================

/// Owns the registry and the observers feeding it.
pub struct SnifferService {
    config: SnifferConfig,
    registry: Arc<ManifestRegistry>,
    network: NetworkObserver,
    lifecycle: LifecycleCoordinator,
    probe: Arc<dyn ReachabilityProbe>,
}

impl fmt::Debug for SnifferService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnifferService")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SnifferService - Constructors
// ============================================================================

impl SnifferService {
    /// Creates a service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn new(
        config: SnifferConfig,
        badge: Arc<dyn BadgeSink>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(ManifestRegistry::new(&config, badge));
        let network = NetworkObserver::new(Arc::clone(&registry), &config);
        let lifecycle = LifecycleCoordinator::new(Arc::clone(&registry));

        Ok(Self {
            config,
            registry,
            network,
            lifecycle,
            probe,
        })
    }

    /// Creates a service probing over HTTP with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid or the HTTP client
    /// cannot be built.
    pub fn with_http_probe(config: SnifferConfig, badge: Arc<dyn BadgeSink>) -> Result<Self> {
        let probe = HttpProbe::new(config.probe_timeout)?;
        Self::new(config, badge, Arc::new(probe))
    }
}

// ============================================================================
// SnifferService - Accessors
// ============================================================================

impl SnifferService {
    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SnifferConfig {
        &self.config
    }

    /// Returns the registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<ManifestRegistry> {
        &self.registry
    }

    /// Returns the network observer.
    #[inline]
    #[must_use]
    pub fn network(&self) -> &NetworkObserver {
        &self.network
    }

    /// Returns the lifecycle coordinator.
    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> &LifecycleCoordinator {
        &self.lifecycle
    }
}

// ============================================================================
// SnifferService - Messages
// ============================================================================

impl SnifferService {
    /// Dispatches one channel message from `sender`.
    ///
    /// Every outcome is a reply; unknown or malformed messages yield a
    /// failure reply.
    pub fn dispatch(&self, sender: Option<TabId>, message: Value) -> Dispatch {
        let message = match Message::from_value(message) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "Rejected channel message");
                return Dispatch::Done(Reply::failure(e));
            }
        };

        trace!(kind = message.kind(), sender = ?sender, "Channel message");

        match message {
            Message::GetManifestsForTab { tab_id } => {
                Dispatch::Done(Reply::manifests(self.registry.query(tab_id)))
            }

            Message::ClearManifests { tab_id } => {
                self.registry.clear(tab_id);
                Dispatch::Done(Reply::ok())
            }

            Message::ContentScriptManifestFound { url, source, .. } => match sender {
                Some(tab_id) => {
                    trace!(tab_id = %tab_id, url = %url, source = %source, "Page report");
                    self.registry.record(tab_id, &url);
                    Dispatch::Done(Reply::ok())
                }
                None => Dispatch::Done(Reply::failure(Error::invalid_argument(
                    "contentScriptManifestFound requires a sender tab",
                ))),
            },

            Message::TestUrlReachable { url } => Dispatch::Probe(url),
        }
    }

    /// Dispatches a message and waits for its reply, probing if needed.
    pub async fn handle_message(&self, sender: Option<TabId>, message: Value) -> Reply {
        match self.dispatch(sender, message) {
            Dispatch::Done(reply) => reply,
            Dispatch::Probe(url) => Reply::reachability(self.probe.is_reachable(&url).await),
        }
    }

    /// Answers channel envelopes until every client is gone.
    ///
    /// Probes run on their own tasks so a slow URL never stalls the loop.
    pub async fn serve_channel(&self, mut receiver: ChannelReceiver) {
        debug!("Channel serve loop started");

        while let Some(envelope) = receiver.recv().await {
            let (sender, message, responder) = envelope.into_parts();

            match self.dispatch(sender, message) {
                Dispatch::Done(reply) => responder.respond(reply),
                Dispatch::Probe(url) => {
                    let probe = Arc::clone(&self.probe);
                    tokio::spawn(async move {
                        let accessible = probe.is_reachable(&url).await;
                        responder.respond(Reply::reachability(accessible));
                    });
                }
            }
        }

        debug!("Channel serve loop ended");
    }
}

// ============================================================================
// SnifferService - Host Events
// ============================================================================

impl SnifferService {
    /// Handles one host event.
    ///
    /// Runtime messages are answered through the returned reply, or later
    /// through `replies` when a probe is needed.
    pub fn handle_event(&self, event: &Event, replies: &ReplySender) -> Option<EventReply> {
        match event.parse() {
            ParsedEvent::RequestCompleted {
                tab_id: Some(tab_id),
                url,
            } => {
                self.network.on_request_completed(tab_id, &url);
                None
            }

            ParsedEvent::HeadersReceived {
                tab_id: Some(tab_id),
                url,
                headers,
            } => {
                self.network.on_headers_received(tab_id, &url, &headers);
                None
            }

            ParsedEvent::TabUpdated {
                tab_id: Some(tab_id),
                status,
                url,
            } => {
                self.lifecycle.on_tab_updated(tab_id, &status, url.as_deref());
                None
            }

            ParsedEvent::TabRemoved {
                tab_id: Some(tab_id),
            } => {
                self.lifecycle.on_tab_removed(tab_id);
                None
            }

            ParsedEvent::RuntimeMessage {
                sender_tab_id,
                message,
            } => match self.dispatch(sender_tab_id, message) {
                Dispatch::Done(reply) => Some(EventReply::message(event.id, &reply)),
                Dispatch::Probe(url) => {
                    let probe = Arc::clone(&self.probe);
                    let replies = replies.clone();
                    let id = event.id;
                    tokio::spawn(async move {
                        let accessible = probe.is_reachable(&url).await;
                        let reply = EventReply::message(id, &Reply::reachability(accessible));
                        if let Err(e) = replies.send(reply) {
                            debug!(error = %e, "Probe reply dropped");
                        }
                    });
                    None
                }
            },

            ParsedEvent::Unknown { method, .. } => {
                warn!(method = %method, "Unhandled host event");
                None
            }

            // Requests and tab events outside any tab.
            _ => {
                trace!(method = %event.method, "Event without tab ignored");
                None
            }
        }
    }

    /// Routes the connection's events to this service.
    pub fn attach(self: &Arc<Self>, connection: &Connection) {
        let service = Arc::clone(self);
        let replies = connection.reply_sender();
        connection.set_event_handler(Box::new(move |event: Event| {
            service.handle_event(&event, &replies)
        }));

        info!("Sniffer service attached to host bridge");
    }
}

// ============================================================================
// Tests
// ============================================================================
