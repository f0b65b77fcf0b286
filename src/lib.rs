//! HLS sniffer - manifest detection and per-tab tracking engine.
//!
//! Discovers HLS (`.m3u8`) manifest URLs while a user browses and keeps a
//! bounded, deduplicated list per browser tab for a picker UI to play, copy
//! or open.
//!
//! # Architecture
//!
//! ```text
//!  host shim ──WebSocket──► Connection ──► SnifferService ──► ManifestRegistry
//!  (network, tab,                           │    ▲                  │
//!   runtime events)                         │    │                  ▼
//!                                           │    │             BadgeSink
//!  PageObserver ──channel──► serve_channel ─┘    │
//!  UI consumer  ──channel────────────────────────┘
//! ```
//!
//! - Candidate URLs from the network and from pages all pass through the
//!   [`matcher`] before reaching the registry
//! - The registry is the only owner of manifest state; navigation clears a
//!   tab, closing it drops the tab
//! - Outward effects (badge, HTTP probes) go through [`host`] capabilities
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use hls_sniffer::host::{HttpProbe, NoopBadge};
//! use hls_sniffer::{SnifferConfig, SnifferService, TabId};
//!
//! # fn main() -> hls_sniffer::Result<()> {
//! let config = SnifferConfig::new().with_retention_cap(20);
//! let probe = HttpProbe::new(config.probe_timeout)?;
//! let service = SnifferService::new(config, Arc::new(NoopBadge), Arc::new(probe))?;
//!
//! let tab = TabId::from(7);
//! service
//!     .network()
//!     .on_request_completed(tab, "https://cdn.example.com/play?src=https%3A%2F%2Fedge.example.com%2Fa.m3u8");
//!
//! let records = service.registry().query(tab);
//! assert_eq!(records[0].url, "https://edge.example.com/a.m3u8");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`matcher`] | URL and text heuristics |
//! | [`registry`] | Per-tab manifest storage |
//! | [`observer`] | Network observation and tab lifecycle |
//! | [`page`] | Per-page scanning and request interception |
//! | [`service`] | Event and message dispatch |
//! | [`player`] | Player templates and preferences |
//! | [`transport`] | WebSocket bridge and in-process channel |
//! | [`protocol`] | Wire message types |

// ============================================================================
// Modules
// ============================================================================

/// Host bridge facade.
pub mod bridge;

/// Sniffer configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Host capabilities: badge and reachability probe.
pub mod host;

/// Type-safe identifiers.
pub mod identifiers;

/// URL heuristic matcher.
pub mod matcher;

/// Background observers.
pub mod observer;

/// Active page observation.
pub mod page;

/// Player resolution and preferences.
pub mod player;

/// Wire message types.
pub mod protocol;

/// Per-tab manifest registry.
pub mod registry;

/// Sniffer service.
pub mod service;

/// Transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{Bridge, PendingBridge};

// Configuration
pub use config::SnifferConfig;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{RequestId, TabId};

// Core types
pub use registry::{ManifestRecord, ManifestRegistry};
pub use service::{Dispatch, SnifferService};

// Player types
pub use player::{Player, PlayerPreferences};
