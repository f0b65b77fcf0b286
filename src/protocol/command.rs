//! Commands sent from the sniffer to the host shim.
//!
//! Commands follow `module.methodName` format and are fire-and-forget: the
//! host may acknowledge them, but nothing waits for it.
//!
//! | Module | Commands |
//! |--------|----------|
//! | `action` | `setBadge` |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::host::BadgeUpdate;

// ============================================================================
// Command
// ============================================================================

/// Host-side effects requested by the sniffer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum Command {
    /// Set a tab's toolbar badge text and colors.
    #[serde(rename = "action.setBadge")]
    SetBadge(BadgeUpdate),
}

// ============================================================================
// Tests
// ============================================================================
