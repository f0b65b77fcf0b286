//! Per-tab manifest registry.
//!
//! The registry is the single owner of every discovered manifest. Observers
//! and the message handler only reach it through its operations, so the
//! dedup and retention invariants live in one place.
//!
//! | Operation | Effect | Badge |
//! |-----------|--------|-------|
//! | [`ManifestRegistry::record`] | append if new, evict oldest over cap | count |
//! | [`ManifestRegistry::query`] | read-only snapshot | - |
//! | [`ManifestRegistry::clear`] | drop the tab's set | reset |
//! | [`ManifestRegistry::remove`] | drop the tab's set (tab gone) | - |

// ============================================================================
// Submodules
// ============================================================================

/// Manifest record type.
pub mod record;

/// Registry storage and operations.
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use record::ManifestRecord;
pub use store::ManifestRegistry;

pub(crate) use record::now_millis;
