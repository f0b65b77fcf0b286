//! Host event message types.
//!
//! Events are notifications sent from the host shim to the sniffer when
//! browser activity occurs. Runtime messages are events too: the service
//! answers them with an [`EventReply`].
//!
//! # Event Types
//!
//! | Module | Events |
//! |--------|--------|
//! | `webRequest` | `completed`, `headersReceived` |
//! | `tabs` | `updated`, `removed` |
//! | `runtime` | `message` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{RequestId, TabId};

use super::Reply;

// ============================================================================
// Event
// ============================================================================

/// An event notification from the host shim.
///
/// # Format
///
/// ```json
/// {
///   "id": "event-uuid",
///   "type": "event",
///   "method": "module.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Unique identifier for EventReply correlation.
    pub id: RequestId,

    /// Event type marker (always "event").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Returns the module name from the method.
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            "webRequest.completed" => ParsedEvent::RequestCompleted {
                tab_id: self.get_tab_id("tabId"),
                url: self.get_string("url"),
            },

            "webRequest.headersReceived" => ParsedEvent::HeadersReceived {
                tab_id: self.get_tab_id("tabId"),
                url: self.get_string("url"),
                headers: self.get_headers("responseHeaders"),
            },

            "tabs.updated" => ParsedEvent::TabUpdated {
                tab_id: self.get_tab_id("tabId"),
                status: self.get_string("status"),
                url: self.get_optional_string("url"),
            },

            "tabs.removed" => ParsedEvent::TabRemoved {
                tab_id: self.get_tab_id("tabId"),
            },

            "runtime.message" => ParsedEvent::RuntimeMessage {
                sender_tab_id: self.get_tab_id("senderTabId"),
                message: self.params.get("message").cloned().unwrap_or(Value::Null),
            },

            _ => ParsedEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }
}

// ============================================================================
// ResponseHeader
// ============================================================================

/// One HTTP response header as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Header name, in whatever case the host reports it.
    pub name: String,

    /// Header value.
    #[serde(default)]
    pub value: String,
}

impl ResponseHeader {
    /// Creates a header.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed host events for type-safe handling.
///
/// Tab ids are `None` when the host reports a request outside any tab.
#[derive(Debug, Clone)]
pub enum ParsedEvent {
    /// A network request completed.
    RequestCompleted {
        /// Originating tab.
        tab_id: Option<TabId>,
        /// Request URL.
        url: String,
    },

    /// Response headers arrived.
    HeadersReceived {
        /// Originating tab.
        tab_id: Option<TabId>,
        /// Request URL.
        url: String,
        /// Response headers.
        headers: Vec<ResponseHeader>,
    },

    /// Tab state changed.
    TabUpdated {
        /// Tab ID.
        tab_id: Option<TabId>,
        /// Load status (`loading`, `complete`).
        status: String,
        /// New top-level URL, present when the tab navigates.
        url: Option<String>,
    },

    /// Tab closed.
    TabRemoved {
        /// Tab ID.
        tab_id: Option<TabId>,
    },

    /// Message from a page observer or UI consumer.
    RuntimeMessage {
        /// Sending tab, if the sender is a page.
        sender_tab_id: Option<TabId>,
        /// Raw message payload.
        message: Value,
    },

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Event Parsing Helpers
// ============================================================================

impl Event {
    /// Gets a string from params.
    #[inline]
    fn get_string(&self, key: &str) -> String {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Gets an optional string from params.
    #[inline]
    fn get_optional_string(&self, key: &str) -> Option<String> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Gets a tab id from params; negative or missing ids are `None`.
    #[inline]
    fn get_tab_id(&self, key: &str) -> Option<TabId> {
        self.params
            .get(key)
            .and_then(|v| v.as_i64())
            .and_then(TabId::new)
    }

    /// Gets a header list from params, skipping malformed entries.
    fn get_headers(&self, key: &str) -> Vec<ResponseHeader> {
        self.params
            .get(key)
            .and_then(|v| v.as_array())
            .map(|headers| {
                headers
                    .iter()
                    .filter_map(|h| serde_json::from_value(h.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// EventReply
// ============================================================================

/// A reply from the sniffer to the host for events requiring an answer.
///
/// # Format
///
/// ```json
/// {
///   "id": "event-uuid",
///   "replyTo": "runtime.message",
///   "result": { "success": true }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct EventReply {
    /// Matches the event's ID.
    pub id: RequestId,

    /// Event method being replied to.
    #[serde(rename = "replyTo")]
    pub reply_to: String,

    /// Reply payload.
    pub result: Value,
}

impl EventReply {
    /// Creates a new event reply.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, reply_to: impl Into<String>, result: Value) -> Self {
        Self {
            id,
            reply_to: reply_to.into(),
            result,
        }
    }

    /// Creates a reply carrying a channel [`Reply`] for a runtime message.
    #[inline]
    #[must_use]
    pub fn message(id: RequestId, reply: &Reply) -> Self {
        Self::new(id, "runtime.message", reply.to_value())
    }
}

// ============================================================================
// Tests
// ============================================================================
