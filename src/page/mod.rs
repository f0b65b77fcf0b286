//! Active page observation.
//!
//! Runs once per loaded page, isolated from the service: findings travel
//! over the message channel as `contentScriptManifestFound` reports.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dom` | Element tree, page snapshot, mutation batches |
//! | `intercept` | Transparent wrapping of fetch/XHR primitives |
//! | `observer` | Per-page lifecycle and reporting |
//! | `scan` | Scanning rules |

// ============================================================================
// Submodules
// ============================================================================

/// Element tree, page snapshot, mutation batches.
pub mod dom;

/// Transparent wrapping of request primitives.
pub mod intercept;

/// Per-page lifecycle and reporting.
pub mod observer;

/// Scanning rules.
pub mod scan;

// ============================================================================
// Re-exports
// ============================================================================

pub use dom::{DomNode, MutationBatch, PageSnapshot};
pub use intercept::{
    Intercepted, PageRequest, PageResponse, PrimitiveKind, RequestPrimitive, ResponseObserver,
};
pub use observer::{ManifestReporter, ObserverExit, PageObserver};
