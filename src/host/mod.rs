//! Host capabilities.
//!
//! The engine never talks to browser APIs directly. Anything with an
//! outward effect goes through one of these seams:
//!
//! | Capability | Trait | Used by |
//! |------------|-------|---------|
//! | Toolbar badge | [`BadgeSink`] | Registry mutations |
//! | Reachability | [`ReachabilityProbe`] | `testUrlReachable` messages |

// ============================================================================
// Submodules
// ============================================================================

/// Toolbar badge updates.
pub mod badge;

/// URL reachability probing.
pub mod probe;

// ============================================================================
// Re-exports
// ============================================================================

pub use badge::{BadgeSink, BadgeUpdate, NoopBadge};
pub use probe::{HttpProbe, ReachabilityProbe};
