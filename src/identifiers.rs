//! Type-safe identifiers for sniffer entities.
//!
//! Newtype wrappers keep host tab ids and bridge correlation ids from being
//! mixed up at compile time.
//!
//! | Type | Wraps | Source |
//! |------|-------|--------|
//! | [`TabId`] | `u32` | Host browser tab id |
//! | [`RequestId`] | `Uuid` | Bridge event/command correlation |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// TabId
// ============================================================================

/// Identifier of a browsing context (one browser tab).
///
/// Hosts report `-1` for requests that do not belong to any tab, so
/// construction from a raw host value is fallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    /// Creates a tab id from a raw host value.
    ///
    /// Returns `None` for negative values or values outside `u32`.
    #[inline]
    #[must_use]
    pub fn new(raw: i64) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for TabId {
    #[inline]
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Correlation id for bridge events, replies and commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the nil id reserved for the READY handshake.
    #[inline]
    #[must_use]
    pub const fn ready() -> Self {
        Self(Uuid::nil())
    }

    /// Returns `true` if this is the READY handshake id.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.0.is_nil()
    }

    /// Returns the inner UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_id_rejects_negative() {
        assert!(TabId::new(-1).is_none());
        assert!(TabId::new(i64::from(u32::MAX) + 1).is_none());
        assert_eq!(TabId::new(42).map(|t| t.as_u32()), Some(42));
    }

    #[test]
    fn test_tab_id_serializes_as_number() {
        let json = serde_json::to_string(&TabId::from(7)).expect("serialize");
        assert_eq!(json, "7");
    }

    #[test]
    fn test_request_id_ready() {
        assert!(RequestId::ready().is_ready());
        assert!(!RequestId::generate().is_ready());
    }

    #[test]
    fn test_request_id_roundtrip() {
        let id = RequestId::generate();
        let json = serde_json::to_string(&id).expect("serialize");
        let parsed: RequestId = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed, id);
    }
}
