//! Cross-context channel messages.
//!
//! Page observers and UI consumers talk to the sniffer service with these
//! request/response payloads. The request side is a closed tagged union on
//! `type`; anything else is answered with a failure reply.
//!
//! | type | payload in | reply |
//! |------|------------|-------|
//! | `getManifestsForTab` | `{tabId}` | `{urls, count, success}` |
//! | `clearManifests` | `{tabId}` | `{success}` |
//! | `contentScriptManifestFound` | `{url, source, timestamp}` | `{success}` |
//! | `testUrlReachable` | `{url}` | `{accessible}` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::registry::ManifestRecord;

// ============================================================================
// Constants
// ============================================================================

/// Source tag used by page observers when reporting a manifest.
pub const CONTENT_SCRIPT_SOURCE: &str = "content_script";

/// Every `type` tag the service understands.
const KNOWN_KINDS: [&str; 4] = [
    "getManifestsForTab",
    "clearManifests",
    "contentScriptManifestFound",
    "testUrlReachable",
];

// ============================================================================
// Message
// ============================================================================

/// A request on the cross-context channel.
///
/// # Format
///
/// ```json
/// { "type": "getManifestsForTab", "tabId": 12 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    /// List the manifests of a tab.
    GetManifestsForTab {
        /// Tab to query.
        tab_id: TabId,
    },

    /// Drop the manifests of a tab.
    ClearManifests {
        /// Tab to clear.
        tab_id: TabId,
    },

    /// A page observer found a candidate; the tab is the sender's.
    ContentScriptManifestFound {
        /// Candidate URL (wrapper or manifest) to record.
        url: String,
        /// Discovery source tag.
        #[serde(default)]
        source: String,
        /// Discovery time, milliseconds since the Unix epoch.
        #[serde(default)]
        timestamp: u64,
    },

    /// Check whether a URL answers at all.
    TestUrlReachable {
        /// URL to probe.
        url: String,
    },
}

impl Message {
    /// Parses a JSON-like payload into a message.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownMessage`] if `type` is missing or unrecognized
    /// - [`Error::InvalidArgument`] if a known type has a malformed payload
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if !KNOWN_KINDS.contains(&kind.as_str()) {
            return Err(Error::unknown_message(kind));
        }

        serde_json::from_value(value)
            .map_err(|e| Error::invalid_argument(format!("malformed {kind} payload: {e}")))
    }

    /// Returns the `type` tag of this message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GetManifestsForTab { .. } => KNOWN_KINDS[0],
            Self::ClearManifests { .. } => KNOWN_KINDS[1],
            Self::ContentScriptManifestFound { .. } => KNOWN_KINDS[2],
            Self::TestUrlReachable { .. } => KNOWN_KINDS[3],
        }
    }
}

// ============================================================================
// Reply
// ============================================================================

/// A reply on the cross-context channel.
///
/// Variant order matters for untagged deserialization: the most specific
/// shapes come first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    /// Manifests of a tab.
    Manifests {
        /// Records, oldest first.
        urls: Vec<ManifestRecord>,
        /// Number of records.
        count: usize,
        /// Always `true`.
        success: bool,
    },

    /// Reachability probe result.
    Reachability {
        /// Whether the URL answered.
        accessible: bool,
    },

    /// Request failed.
    Failure {
        /// Always `false`.
        success: bool,
        /// Failure description.
        error: String,
    },

    /// Plain acknowledgement.
    Ack {
        /// Always `true`.
        success: bool,
    },
}

impl Reply {
    /// Creates a manifests reply.
    #[must_use]
    pub fn manifests(urls: Vec<ManifestRecord>) -> Self {
        Self::Manifests {
            count: urls.len(),
            urls,
            success: true,
        }
    }

    /// Creates an acknowledgement.
    #[inline]
    #[must_use]
    pub fn ok() -> Self {
        Self::Ack { success: true }
    }

    /// Creates a failure reply.
    #[inline]
    #[must_use]
    pub fn failure(error: impl Display) -> Self {
        Self::Failure {
            success: false,
            error: error.to_string(),
        }
    }

    /// Creates a reachability reply.
    #[inline]
    #[must_use]
    pub fn reachability(accessible: bool) -> Self {
        Self::Reachability { accessible }
    }

    /// Returns `true` unless this is a failure reply.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }

    /// Serializes the reply into a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Tests
// ============================================================================
