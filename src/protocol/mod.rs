//! Wire message types.
//!
//! Two surfaces share these types:
//!
//! | Surface | Types |
//! |---------|-------|
//! | Cross-context channel | [`Message`] / [`Reply`] |
//! | Host bridge (WebSocket) | [`Event`] / [`EventReply`] in, [`Request`] out, [`Response`] acks |
//!
//! # Bridge Message Types
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Response` (nil id) | Host → Sniffer | READY handshake |
//! | `Event` | Host → Sniffer | Network, tab and runtime notifications |
//! | `EventReply` | Sniffer → Host | Answer to a runtime message |
//! | `Request` | Sniffer → Host | Badge command |

// ============================================================================
// Submodules
// ============================================================================

/// Host-side commands.
pub mod command;

/// Host event types.
pub mod event;

/// Cross-context channel messages.
pub mod message;

/// Command envelopes and host responses.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::Command;
pub use event::{Event, EventReply, ParsedEvent, ResponseHeader};
pub use message::{CONTENT_SCRIPT_SOURCE, Message, Reply};
pub use request::{Request, Response, ResponseType};
