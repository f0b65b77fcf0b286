//! Transport layer.
//!
//! Two ways to reach the sniffer service:
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Sniffer (Rust) │         WebSocket            │  Host shim      │
//! │                 │◄────────────────────────────►│  (browser)      │
//! │  BridgeServer   │      localhost:PORT          │                 │
//! │  → Connection   │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//!
//! ┌─────────────────┐      in-process channel      ┌─────────────────┐
//! │  SnifferService │◄─────────────────────────────│  ChannelClient  │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | In-process request/response channel |
//! | `connection` | WebSocket connection and event loop |
//! | `server` | WebSocket server binding and acceptance |

// ============================================================================
// Submodules
// ============================================================================

/// In-process request/response channel.
pub mod channel;

/// WebSocket connection and event loop.
pub mod connection;

/// WebSocket server the host shim connects to.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{ChannelClient, ChannelReceiver, Envelope, Responder, channel};
pub use connection::{Connection, EventHandler, ReadyData, ReplySender};
pub use server::BridgeServer;
