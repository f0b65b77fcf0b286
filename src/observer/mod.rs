//! Background observers.
//!
//! Both observers translate host events into registry operations and never
//! influence the traffic or navigation they watch.
//!
//! | Observer | Host events | Registry operation |
//! |----------|-------------|--------------------|
//! | [`NetworkObserver`] | request completed, headers received | `record` |
//! | [`LifecycleCoordinator`] | navigation start, tab removed | `clear` / `remove` |

// ============================================================================
// Submodules
// ============================================================================

/// Navigation and tab-close cleanup.
pub mod lifecycle;

/// Passive network observation.
pub mod network;

// ============================================================================
// Re-exports
// ============================================================================

pub use lifecycle::LifecycleCoordinator;
pub use network::NetworkObserver;
